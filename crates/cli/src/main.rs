//! Boutique CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! boutique-cli migrate
//!
//! # Load the demo catalog and customers
//! boutique-cli seed
//! ```
//!
//! Both commands read `STOREFRONT_DATABASE_URL` (falling back to
//! `DATABASE_URL`) from the environment or a `.env` file.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "boutique-cli")]
#[command(author, version, about = "Boutique storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Load the demo catalog and customers
    Seed,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await,
        Commands::Seed => commands::seed::demo().await,
    }
}
