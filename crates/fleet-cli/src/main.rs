//! fleetctl - command line client for fleet state stores

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod exit_codes;

use config::FleetConfig;
use error::Result;

#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(author = "Fleet Contributors")]
#[command(version)]
#[command(about = "Command line client for fleet state stores", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/fleet/config.yaml)
    #[arg(long, global = true, env = "FLEET_CONFIG")]
    config: Option<PathBuf>,

    /// State snapshot file
    #[arg(long, global = true, env = "FLEET_STATE")]
    state: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Tear down and destroy resources, waiting for finalizers
    Delete(commands::delete::DeleteArgs),
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        let env = std::env::var("FLEET_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string());
        tracing_subscriber::EnvFilter::from_str(&env)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = FleetConfig::load(cli.config.as_deref())?;
    let state_path = config.state_path(cli.state.as_deref());

    match cli.command {
        Commands::Delete(args) => commands::delete::run(args, &config, &state_path).await,
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
