//! `agora`: command-line client for collaborative decision events.

mod bootstrap;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use bootstrap::{Credentials, WatchArgs};

// no `Debug`: it would print the password
#[derive(Parser)]
#[command(
    author,
    version,
    about = "agora: follow and vote on decision events",
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Account email, used when no session can be restored.
    #[arg(long, global = true, env = "AGORA_EMAIL")]
    email: Option<String>,

    #[arg(long, global = true, env = "AGORA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "List events you take part in",
        after_help = "EXAMPLES:\n    agora events --email me@example.com"
    )]
    Events,

    #[command(
        about = "Follow one event until interrupted",
        long_about = "Open an event, poll it on the configured interval and log every change.",
        after_help = "EXAMPLES:\n    agora watch ev-42\n\n    AGORA_PASSWORD=... agora watch ev-42 --email me@example.com"
    )]
    Watch {
        /// Event identifier.
        event: String,
    },
}

#[tokio::main]
async fn main() {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(err) = bootstrap::tracing::init_tracing_subscriber() {
        eprintln!("Failed to initialize tracing: {err}");
    }

    if let Err(err) = run(cli).await {
        error!(error = %format!("{err:#}"), "agora failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config_path = bootstrap::resolve_config_path(cli.config, &cwd);
    let config = bootstrap::load_app_config(config_path.as_deref())?;
    let runtime = bootstrap::wire_dependencies(&config)?;

    let credentials = Credentials {
        email: cli.email,
        password: cli.password,
    };
    match cli.command {
        Commands::Events => bootstrap::run_events(runtime, credentials).await,
        Commands::Watch { event } => {
            let args = WatchArgs {
                event_id: event,
                credentials,
            };
            bootstrap::run_watch(runtime, args).await
        }
    }
}
