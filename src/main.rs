//! K-HIGH Client - Command line entry point
//!
//! Manages the stored credential and talks to the backend through the
//! authenticated request pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use khigh_client::{commands, config::AppConfig, logging, AppState};

#[derive(Parser)]
#[command(name = "khigh", version, about = "K-HIGH tracking client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show whether tokens are stored
    Status,
    /// Store a token pair issued by the backend
    Login {
        #[arg(long, env = "KHIGH_ACCESS_TOKEN", hide_env_values = true)]
        access: String,
        #[arg(long, env = "KHIGH_REFRESH_TOKEN", hide_env_values = true)]
        refresh: Option<String>,
    },
    /// Clear stored tokens
    Logout,
    /// GET a backend path and print the JSON response
    Get { path: String },
    /// Show the signed-in user's profile
    Profile {
        /// Bypass the local cache
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading configuration")?;

    logging::init(&config.log_dir(), config.log_console);
    info!("K-HIGH client starting...");

    let state = AppState::open(config).await.context("opening client state")?;

    match cli.command {
        Command::Status => print(&commands::status(&state).await?)?,
        Command::Login { access, refresh } => {
            commands::login(&state, access, refresh).await?;
            println!("Credential stored");
        }
        Command::Logout => {
            commands::logout(&state).await?;
            println!("Logged out");
        }
        Command::Get { path } => print(&commands::get(&state, &path).await?)?,
        Command::Profile { refresh } => print(&commands::profile(&state, refresh).await?)?,
    }

    Ok(())
}

fn print<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
