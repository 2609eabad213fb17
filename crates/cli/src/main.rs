//! Bazaar CLI - catalog and order tools for operators.
//!
//! # Usage
//!
//! ```bash
//! # Upload products from a YAML manifest to the document store
//! bazaar seed products.yaml
//!
//! # Check a manifest without uploading anything
//! bazaar seed products.yaml --dry-run
//!
//! # Price a cart offline with the configured shipping and tax policy
//! bazaar quote cart.yaml
//!
//! # List a user's orders, newest first
//! bazaar orders --user 8f14e45f
//! ```
//!
//! # Commands
//!
//! - `seed` - Create or replace catalog products
//! - `quote` - Compute cart totals without touching the store
//! - `orders` - List a user's orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the catalog from a YAML manifest
    Seed {
        /// Path to the product manifest
        file: String,

        /// Validate the manifest without uploading
        #[arg(long)]
        dry_run: bool,
    },
    /// Price a cart file with the configured policy
    Quote {
        /// Path to the cart file
        file: String,
    },
    /// List a user's orders
    Orders {
        /// User ID
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed { file, dry_run } => commands::seed::products(&file, dry_run).await?,
        Commands::Quote { file } => commands::quote::run(&file).await?,
        Commands::Orders { user } => commands::orders::list(&user).await?,
    }
    Ok(())
}
