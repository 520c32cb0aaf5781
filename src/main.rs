//! polybridge - Interop Capability Bridge
//!
//! CLI entry point for inspecting and calling symbols exported through a
//! `polybridge.toml` embedding.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use polybridge::config::BridgeConfig;
use polybridge::{build_bridge, Bridge, Capability, ForeignValue};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polybridge")]
#[command(version)]
#[command(about = "Import, probe and invoke foreign values", long_about = None)]
struct Cli {
    /// Config file (default: nearest polybridge.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute an exported symbol
    Call {
        /// Symbol name
        name: String,

        /// Arguments: null, true/false, integers, floats; anything else is a string
        args: Vec<String>,
    },

    /// List exported symbols with their capabilities
    List,

    /// Answer a capability question about a symbol
    Probe {
        /// Symbol name
        name: String,

        /// Capability to check (prints all capabilities if omitted)
        #[arg(short = 'C', long)]
        capability: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            BridgeConfig::find_and_load(&cwd).context("Failed to load polybridge.toml")?
        }
    };

    let bridge = build_bridge(&config).context("Failed to embed symbols")?;

    match cli.command {
        Commands::Call { name, args } => cmd_call(&bridge, &name, &args),
        Commands::List => cmd_list(&bridge),
        Commands::Probe { name, capability } => cmd_probe(&bridge, &name, capability.as_deref()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn cmd_call(bridge: &Bridge, name: &str, args: &[String]) -> Result<()> {
    let handle = bridge
        .import(name)
        .with_context(|| format!("Cannot import '{}'", name))?;

    if !bridge.is_executable(&handle) {
        bail!("'{}' is not executable ({})", name, handle.tag());
    }

    let args: Vec<ForeignValue> = args.iter().map(|a| parse_literal(a)).collect();
    let result = bridge
        .execute(&handle, &args)
        .with_context(|| format!("Call to '{}' failed", name))?;

    println!("{}", result.value());
    Ok(())
}

fn cmd_list(bridge: &Bridge) -> Result<()> {
    let registry = bridge.registry();
    if registry.is_empty() {
        println!("No symbols exported.");
        return Ok(());
    }

    println!("{:<24} {:<12} CAPABILITIES", "NAME", "TAG");
    for name in registry.names() {
        let handle = bridge.import(name)?;
        println!(
            "{:<24} {:<12} {}",
            name,
            handle.tag().as_str(),
            handle.capabilities()
        );
    }
    Ok(())
}

fn cmd_probe(bridge: &Bridge, name: &str, capability: Option<&str>) -> Result<()> {
    let handle = bridge
        .import(name)
        .with_context(|| format!("Cannot import '{}'", name))?;

    match capability {
        Some(cap) => {
            if Capability::from_str(cap).is_none() {
                log::warn!("unknown capability '{}'", cap);
            }
            println!("{}", bridge.probe_named(&handle, cap));
        }
        None => {
            for cap in Capability::ALL {
                println!("{:<12} {}", cap.to_string(), bridge.probe(&handle, cap));
            }
        }
    }
    Ok(())
}

/// Parse a command-line literal into a foreign value
fn parse_literal(arg: &str) -> ForeignValue {
    match arg {
        "null" => ForeignValue::Null,
        "true" => ForeignValue::from(true),
        "false" => ForeignValue::from(false),
        _ => {
            if let Ok(i) = arg.parse::<i64>() {
                ForeignValue::from(i)
            } else if let Ok(f) = arg.parse::<f64>() {
                ForeignValue::from(f)
            } else {
                ForeignValue::from(arg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert!(matches!(parse_literal("null"), ForeignValue::Null));
        assert_eq!(parse_literal("42").as_int(), Some(42));
        assert_eq!(parse_literal("-7").as_int(), Some(-7));
        assert_eq!(parse_literal("hello").as_str(), Some("hello"));
        assert!(matches!(
            parse_literal("2.5").as_primitive(),
            Some(polybridge::Primitive::Float(f)) if (*f - 2.5).abs() < f64::EPSILON
        ));
    }
}
