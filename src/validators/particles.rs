//! Particle occurrence bounds
//!
//! `minOccurs` / `maxOccurs` decoding shared by `element`, `group`, `any`
//! and the compositors.

use super::helpers::parse_non_negative_integer;
use std::fmt;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u64,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u64>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if this particle can be empty (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if this particle is empty (maxOccurs == 0)
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Check if particle has maxOccurs == 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if particle can have multiple occurrences
    pub fn is_multiple(&self) -> bool {
        !self.is_empty() && !self.is_single()
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..unbounded", self.min),
        }
    }
}

/// Parse minOccurs/maxOccurs from XML attribute values
///
/// On error the message describes the first problem found.
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs, String> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        match parse_non_negative_integer(min_str) {
            Some(min) => occurs.min = min,
            None => {
                return Err(format!(
                    "minOccurs value '{}' is not a valid non-negative integer",
                    min_str
                ))
            }
        }
    }

    if let Some(max_str) = max_occurs {
        if max_str.trim() == "unbounded" {
            occurs.max = None;
        } else {
            match parse_non_negative_integer(max_str) {
                Some(max) => {
                    if occurs.min > max {
                        return Err(
                            "maxOccurs must be 'unbounded' or greater than minOccurs".to_string()
                        );
                    }
                    occurs.max = Some(max);
                }
                None => {
                    return Err(format!(
                        "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                        max_str
                    ))
                }
            }
        }
    } else if occurs.min > 1 {
        return Err("minOccurs must be lesser or equal than maxOccurs".to_string());
    }

    Ok(occurs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_defaults() {
        let occurs = Occurs::default();
        assert_eq!(occurs, Occurs::once());
        assert!(occurs.is_single());
        assert!(!occurs.is_emptiable());
        assert!(Occurs::zero_or_more().is_multiple());
        assert_eq!(Occurs::zero_or_more().to_string(), "0..unbounded");
    }

    #[test]
    fn test_parse_occurs() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(parse_occurs(Some("0"), Some("unbounded")).unwrap(), Occurs::zero_or_more());
        assert_eq!(parse_occurs(Some("2"), Some("5")).unwrap(), Occurs::new(2, Some(5)));
        assert_eq!(parse_occurs(None, Some("0")).unwrap_err(), "maxOccurs must be 'unbounded' or greater than minOccurs");
        assert!(parse_occurs(Some("-1"), None).is_err());
        assert!(parse_occurs(Some("2"), None).is_err());
        assert!(parse_occurs(None, Some("many")).is_err());
    }
}
