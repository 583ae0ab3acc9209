//! esimsync CLI
//!
//! Command-line tools for driving and debugging the esimsync engine.
//!
//! # Commands
//!
//! - `inspect` - Display the local store's records and session
//! - `sync` - Run a sync cycle against the candidate endpoints
//! - `register` - Create an account (optimistic; works offline)
//! - `login` - Authenticate against the store, then the remote

mod commands;

use clap::{Parser, Subcommand};
use esimsync_engine::SyncConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// esimsync command-line tools.
#[derive(Parser)]
#[command(name = "esimsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local store file
    #[arg(global = true, short, long, default_value = "esimsync.json")]
    store: PathBuf,

    /// Endpoint candidate, tried in order (repeat for fallbacks)
    #[arg(global = true, short, long = "endpoint")]
    endpoints: Vec<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the local store's records and session
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run one sync cycle, or keep syncing with --watch
    Sync {
        /// Keep syncing at the configured interval until Ctrl-C
        #[arg(short, long)]
        watch: bool,

        /// Seconds between cycles in watch mode
        #[arg(short, long, default_value = "90")]
        interval: u64,
    },

    /// Register an account
    Register {
        /// Email address (natural key)
        #[arg(long)]
        email: String,

        /// Credential
        #[arg(long)]
        password: String,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Log in
    Login {
        /// Email address
        #[arg(long)]
        email: String,

        /// Credential
        #[arg(long)]
        password: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let endpoints = if cli.endpoints.is_empty() {
        SyncConfig::default_endpoints()
    } else {
        cli.endpoints.clone()
    };

    match cli.command {
        Commands::Inspect { format } => {
            commands::inspect::run(&cli.store, &format)?;
        }
        Commands::Sync { watch, interval } => {
            commands::sync::run(&cli.store, endpoints, watch, interval).await?;
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            commands::register::run(&cli.store, endpoints, &email, &password, &first_name, &last_name)
                .await?;
        }
        Commands::Login { email, password } => {
            commands::login::run(&cli.store, endpoints, &email, &password).await?;
        }
        Commands::Version => {
            println!("esimsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
