//! Validation event logging
//!
//! The validation context reports its progress to an injected
//! [`ValidationLogger`] instead of a process-wide logger. The default
//! [`TracingLogger`] forwards everything to `tracing`; [`RecordingLogger`]
//! keeps the events for inspection.

use crate::validators::{ComponentId, Diagnostic, SchemaKind, Severity};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Node-local checks and qualified name computation
    Prevalidate,
    /// Cross-reference resolution
    Validate,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Prevalidate => f.write_str("prevalidate"),
            Pass::Validate => f.write_str("validate"),
        }
    }
}

/// Something that happened during a validation run
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationEvent {
    /// A schema document was parsed and attached to the context
    SchemaLoaded {
        /// Canonical id given by the resolver
        id: String,
        /// Root `schema` component
        component: ComponentId,
    },
    /// A pass begins
    PassStarted(Pass),
    /// A component is being checked
    ComponentVisited {
        /// Current pass
        pass: Pass,
        /// Visited component
        component: ComponentId,
        /// Its kind
        kind: SchemaKind,
    },
    /// A pass ended
    PassFinished {
        /// Finished pass
        pass: Pass,
        /// Number of components visited
        visited: usize,
    },
    /// A diagnostic was recorded
    Diagnostic(Diagnostic),
}

/// Receiver of validation events
pub trait ValidationLogger {
    /// Handle one event
    fn event(&self, event: &ValidationEvent);
}

/// Logger forwarding events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ValidationLogger for TracingLogger {
    fn event(&self, event: &ValidationEvent) {
        match event {
            ValidationEvent::SchemaLoaded { id, component } => {
                tracing::info!(schema = %id, component = component.index(), "Loaded schema");
            }
            ValidationEvent::PassStarted(pass) => tracing::debug!(%pass, "Pass started"),
            ValidationEvent::ComponentVisited {
                pass,
                component,
                kind,
            } => {
                tracing::trace!(%pass, component = component.index(), %kind, "Visiting component");
            }
            ValidationEvent::PassFinished { pass, visited } => {
                tracing::debug!(%pass, visited, "Pass finished");
            }
            ValidationEvent::Diagnostic(diagnostic) => match diagnostic.severity {
                Severity::Warning => tracing::warn!("{}", diagnostic),
                Severity::Error | Severity::Fatal => tracing::error!("{}", diagnostic),
            },
        }
    }
}

/// Logger that keeps every event in memory
///
/// Clones share the same event list, so a clone can be handed to the
/// context while the original is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<ValidationEvent>>>,
}

impl RecordingLogger {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<ValidationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drop the recorded events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl ValidationLogger for RecordingLogger {
    fn event(&self, event: &ValidationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger_shares_events() {
        let recorder = RecordingLogger::new();
        let handle = recorder.clone();
        handle.event(&ValidationEvent::PassStarted(Pass::Prevalidate));
        handle.event(&ValidationEvent::PassFinished {
            pass: Pass::Prevalidate,
            visited: 3,
        });
        assert_eq!(recorder.events().len(), 2);
        recorder.clear();
        assert!(handle.events().is_empty());
    }

    #[test]
    fn test_tracing_logger_accepts_all_events() {
        let logger = TracingLogger;
        logger.event(&ValidationEvent::PassStarted(Pass::Validate));
        logger.event(&ValidationEvent::Diagnostic(Diagnostic::new(
            Severity::Warning,
            "pattern uses unsupported syntax",
        )));
    }
}
