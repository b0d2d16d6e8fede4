//! Faucet wallet - guarded sends through zingo-cli
//!
//! # WARNING
//! - `send` and `shield` move real funds on whatever network the wallet is on.
//! - The wallet must be synced before sending; this tool refuses otherwise.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use faucet_wallet::cli::commands;
use faucet_wallet::config::Config;
use faucet_wallet::wallet::{AddressKind, WalletClient, WalletClientConfig, ZingoCliBackend};

/// Faucet wallet - zingo-cli wrapper with a guarded send protocol
#[derive(Parser)]
#[command(name = "faucet-wallet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "faucet.toml", env = "FAUCET_CONFIG")]
    config: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show wallet balance by pool
    Balance,

    /// Show the faucet's receiving address
    Address {
        /// Address kind: unified, transparent, sapling
        #[arg(long, default_value = "unified")]
        kind: AddressKind,
    },

    /// Send ZEC (sync, balance check, send, record, resync)
    Send {
        /// Destination address
        address: String,

        /// Amount in ZEC, up to 8 decimal places
        amount: String,

        /// Memo attached to the transaction
        #[arg(long)]
        memo: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,

        /// Validate only, don't send
        #[arg(long)]
        dry_run: bool,
    },

    /// View transaction history
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show balance, address and recent activity
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sync the wallet with the chain
    Sync {
        /// Attempts before giving up
        #[arg(long, default_value = "3")]
        attempts: u32,
    },

    /// Shield transparent funds into Orchard
    Shield {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration (credentials masked)
    Config,

    /// Wait for the backend and keep the wallet synced until Ctrl-C
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.log_json);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // One client for the whole process
    let backend = Arc::new(ZingoCliBackend::from_config(&config));
    let client = Arc::new(WalletClient::new(WalletClientConfig::from(&config), backend));

    // Execute command
    let result = match cli.command {
        Commands::Balance => commands::balance(&client).await,
        Commands::Address { kind } => commands::address(&client, kind).await,
        Commands::Send {
            address,
            amount,
            memo,
            force,
            dry_run,
        } => commands::send(&client, &address, &amount, memo, force, dry_run).await,
        Commands::History { limit } => commands::history(&client, limit).await,
        Commands::Stats { json } => commands::stats(&client, json).await,
        Commands::Sync { attempts } => commands::sync(&client, attempts).await,
        Commands::Shield { force } => commands::shield(&client, force).await,
        Commands::Config => commands::show_config(&config),
        Commands::Run => commands::run(client.clone(), &config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "faucet_wallet=info"
            .parse()
            .expect("static directive is valid"),
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
