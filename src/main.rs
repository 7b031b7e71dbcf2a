//! Command-line interface for xmlschema-om

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use xmlschema_om::validators::{
    ComponentId, Segment, Severity, ValidationContext, ValidationOptions,
};
#[cfg(feature = "cli")]
use xmlschema_om::xpath::SchemaPath;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdcheck")]
#[command(author, version, about = "XML Schema structural checker", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check one or more XSD schemas and report diagnostics
    Validate {
        /// Paths to the XSD schema files
        #[arg(value_name = "SCHEMA", required = true)]
        schemas: Vec<PathBuf>,

        /// Report foreign attributes on facets and anyAttribute
        #[arg(long)]
        strict_foreign: bool,

        /// Allow fetching imported schemas over HTTP
        #[arg(long)]
        allow_remote: bool,

        /// Output diagnostics as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the global definitions of a schema
    Inspect {
        /// Path to the XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Only show components matching a path, e.g. "complexType[@name='T']/sequence/element"
        #[arg(short, long)]
        path: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            schemas,
            strict_foreign,
            allow_remote,
            json,
        } => {
            let options = ValidationOptions::new()
                .with_strict_foreign_attributes(strict_foreign)
                .with_allow_remote(allow_remote);
            cmd_validate(schemas, options, json)
        }
        Commands::Inspect { schema, path, json } => cmd_inspect(schema, path, json),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn load(
    paths: &[PathBuf],
    options: ValidationOptions,
) -> Result<ValidationContext, Box<dyn std::error::Error>> {
    let mut ctx = ValidationContext::from_options(options);
    for path in paths {
        ctx.load_schema(&path.to_string_lossy(), None)?;
    }
    ctx.validate();
    Ok(ctx)
}

/// Returns whether no error was reported
#[cfg(feature = "cli")]
fn cmd_validate(
    paths: Vec<PathBuf>,
    options: ValidationOptions,
    json_output: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let ctx = load(&paths, options)?;
    let diagnostics = ctx.diagnostics();

    if json_output {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
    } else {
        for diagnostic in diagnostics.iter() {
            println!("{}", diagnostic);
        }
        println!(
            "{} schema(s), {} error(s), {} warning(s)",
            ctx.schemas().count(),
            diagnostics.count(Severity::Error) + diagnostics.count(Severity::Fatal),
            diagnostics.count(Severity::Warning),
        );
    }
    Ok(ctx.is_valid())
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    schema_path: PathBuf,
    path: Option<String>,
    json_output: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let ctx = load(&[schema_path], ValidationOptions::new())?;
    let tree = ctx.tree();
    let matcher = path.as_deref().map(SchemaPath::parse).transpose()?;

    let mut rows: Vec<(String, ComponentId)> = Vec::new();
    for (id, root) in ctx.schemas() {
        let components = match &matcher {
            Some(matcher) => matcher.find(tree, root),
            None => tree.segment_ids(root, Segment::Definitions),
        };
        rows.extend(components.into_iter().map(|c| (id.to_string(), c)));
    }

    if json_output {
        let items: Vec<serde_json::Value> = rows
            .iter()
            .map(|(schema, id)| {
                let node = tree.node(*id);
                serde_json::json!({
                    "schema": schema,
                    "kind": node.kind.name(),
                    "name": node.name(),
                    "line": node.line,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        println!("xmlschema-om v{}", xmlschema_om::VERSION);
        for (schema, id) in &rows {
            let node = tree.node(*id);
            let line = node.line.map(|l| l.to_string()).unwrap_or_default();
            println!(
                "  {:<16} {:<32} {}:{}",
                node.kind.name(),
                node.name().unwrap_or("-"),
                schema,
                line
            );
        }
    }
    Ok(ctx.is_valid())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
