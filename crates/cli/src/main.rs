//! Bundle Relay CLI - migrations and one-off job runs.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! relay-cli migrate
//!
//! # Run one replication tick
//! relay-cli replicate
//!
//! # Run one vendor product sync tick
//! relay-cli sync-products
//!
//! # Preview the variants a bundle would be listed with
//! relay-cli variants --bundle 5f0c9a2e-8a4b-4c1e-9d55-0b7c3f1e2a10
//! ```
//!
//! All commands read the same environment as the worker (`RELAY_DATABASE_URL`,
//! `SHOPIFY_API_VERSION`, ...). Ticks take durable claims, so they are safe
//! to run next to a live worker.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bundle_relay_core::BundleId;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(author, version, about = "Bundle Relay CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Replicate every eligible bundle once
    Replicate,
    /// Pull the catalog of every unsynced vendor store once
    SyncProducts,
    /// Print the variant matrix of a bundle without calling Shopify
    Variants {
        /// Bundle id
        #[arg(short, long)]
        bundle: BundleId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Replicate => commands::tick::replicate().await?,
        Commands::SyncProducts => commands::tick::sync_products().await?,
        Commands::Variants { bundle } => commands::variants::preview(bundle).await?,
    }
    Ok(())
}
