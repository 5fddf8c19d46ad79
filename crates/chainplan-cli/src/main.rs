mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chainplan",
    about = "Resumable contract deployments: validate a plan, deploy it in dependency order, wire it up",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .chainplan/ or .git/)
    #[arg(long, global = true, env = "CHAINPLAN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .chainplan/config.yaml with a simulated development network
    Init,

    /// Check a plan for unknown references, cycles and bad method signatures
    Validate {
        /// Plan file (default: the `plan` entry in config.yaml)
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Validate, then deploy and wire everything the record does not have yet
    Run {
        /// Network name from config.yaml
        #[arg(long)]
        network: String,

        /// Plan file (default: the `plan` entry in config.yaml)
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Re-attempt units and steps recorded as failed
        #[arg(long)]
        retry_failed: bool,
    },

    /// Show how far the record for a network has got through the plan
    Status {
        /// Network name from config.yaml
        #[arg(long)]
        network: String,

        /// Plan file (default: the `plan` entry in config.yaml)
        #[arg(long)]
        plan: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Validate { plan } => cmd::validate::run(&root, plan.as_deref(), cli.json),
        Commands::Run {
            network,
            plan,
            retry_failed,
        } => cmd::run::run(&root, &network, plan.as_deref(), retry_failed, cli.json),
        Commands::Status { network, plan } => {
            cmd::status::run(&root, &network, plan.as_deref(), cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
