//! # Meridian Pricing CLI
//!
//! Prices a quote snapshot and prints the submission payload.
//!
//! ## Usage
//! ```bash
//! # Price a snapshot and print the payload
//! meridian quote.json
//!
//! # Read the snapshot from stdin, pretty-print
//! cat quote.json | meridian - --pretty
//!
//! # Use a settings file and block on missing prices
//! meridian quote.json --settings ./pricing.toml --strict
//!
//! # Print the full recomputation instead of the payload
//! meridian quote.json --recompute-only
//! ```
//!
//! Logs go to stderr; `RUST_LOG` controls the level.

mod error;
mod settings;

use std::io::{Read, Write};
use std::path::PathBuf;

use meridian_core::{assemble, recompute, QuoteSnapshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, CliResult};

/// Parsed command line.
#[derive(Debug, Default)]
struct Args {
    snapshot: Option<String>,
    settings: Option<PathBuf>,
    pretty: bool,
    strict: bool,
    recompute_only: bool,
    help: bool,
}

fn parse_args(args: &[String]) -> Args {
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" | "-s" => {
                if i + 1 < args.len() {
                    parsed.settings = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--pretty" | "-p" => parsed.pretty = true,
            "--strict" => parsed.strict = true,
            "--recompute-only" => parsed.recompute_only = true,
            "--help" | "-h" => parsed.help = true,
            other => {
                if parsed.snapshot.is_none() {
                    parsed.snapshot = Some(other.to_string());
                } else {
                    warn!(argument = other, "Ignoring extra argument");
                }
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!("Meridian Pricing CLI");
    println!();
    println!("Usage: meridian <SNAPSHOT> [OPTIONS]");
    println!();
    println!("Arguments:");
    println!("  <SNAPSHOT>             Quote snapshot JSON file, or - for stdin");
    println!();
    println!("Options:");
    println!("  -s, --settings <PATH>  Pricing settings TOML (default: $MERIDIAN_SETTINGS)");
    println!("  -p, --pretty           Pretty-print the JSON output");
    println!("      --strict           Fail when any product has no usable price");
    println!("      --recompute-only   Print the recomputation instead of the payload");
    println!("  -h, --help             Show this help message");
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=meridian_core=trace` - Trace the core only
/// - Default: `info,meridian=debug`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,meridian=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_snapshot(source: &str) -> CliResult<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::Read {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        return Ok(text);
    }

    std::fs::read_to_string(source).map_err(|err| CliError::Read {
        path: PathBuf::from(source),
        source: err,
    })
}

fn run(args: Args) -> CliResult<serde_json::Value> {
    let source = args.snapshot.ok_or(CliError::MissingSnapshot)?;
    let mut snapshot = QuoteSnapshot::from_json_str(&read_snapshot(&source)?)?;

    let settings_path = settings::settings_path(args.settings);
    snapshot.settings = settings::load(settings_path.as_deref(), snapshot.settings.clone())?;
    info!(
        lines = snapshot.lines.len(),
        precision = snapshot.settings.precision,
        "Snapshot loaded"
    );

    let result = recompute(&snapshot);
    if args.strict {
        result.pricing_report.ensure_orderable()?;
    }
    if args.recompute_only {
        return Ok(serde_json::to_value(&result)?);
    }

    let form = result.form_values(&snapshot.form, &snapshot);
    let payload = assemble(&form, &snapshot.overview, snapshot.previous.as_ref())?;
    Ok(serde_json::to_value(&payload)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().collect();
    let args = parse_args(&argv);
    if args.help {
        print_help();
        return Ok(());
    }

    init_tracing();

    let pretty = args.pretty;
    let output = run(args)?;

    let text = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
