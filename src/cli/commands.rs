//! CLI command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Confirm;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::wallet::address::{self, AddressKind};
use crate::wallet::{
    spawn_periodic_sync, BackgroundSyncConfig, ShieldOutcome, TransactionRecord, WalletClient,
    Zatoshis,
};

/// Show balance by pool
pub async fn balance(client: &WalletClient) -> Result<()> {
    let balance = client
        .get_balance_breakdown()
        .await
        .context("Failed to query wallet balance")?;

    println!("\n=== WALLET BALANCE ===\n");
    println!("Total:       {} ZEC", balance.total);
    println!("Transparent: {} ZEC", balance.transparent);
    println!("Sapling:     {} ZEC", balance.sapling);
    println!("Orchard:     {} ZEC", balance.orchard);
    println!();

    Ok(())
}

/// Show the faucet's receiving address
pub async fn address(client: &WalletClient, kind: AddressKind) -> Result<()> {
    match client.get_address(kind).await {
        Some(address) => println!("{}", address),
        None => anyhow::bail!("No {} address available from wallet or cache", kind),
    }
    Ok(())
}

/// Send funds through the guarded protocol
pub async fn send(
    client: &WalletClient,
    to_address: &str,
    amount: &str,
    memo: Option<String>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let amount: Zatoshis = amount.parse()?;
    let to_address = address::validate_destination(to_address)?;

    if dry_run {
        println!("\n=== DRY RUN ===");
        println!("Would send {} ZEC ({} zatoshis)", amount, amount.into_u64());
        println!("To: {}", to_address);
        if let Some(memo) = &memo {
            println!("Memo: {}", memo);
        }
        return Ok(());
    }

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Send {} ZEC to {}? This cannot be undone.",
                amount,
                address::short(to_address)
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Send cancelled by user");
            return Ok(());
        }
    }

    match client
        .send_to_address(to_address, amount, memo.as_deref())
        .await
    {
        Ok(txid) => {
            let new_balance = client.get_balance().await;
            println!("\n=== SEND SUCCESSFUL ===");
            println!("Amount: {} ZEC", amount);
            println!("To: {}", to_address);
            println!("TXID: {}", txid);
            println!("New balance: {} ZEC", new_balance);
        }
        Err(e) => {
            if e.is_safety_violation() {
                warn!("Send refused, no funds moved: {}", e);
            } else if e.is_retryable() {
                warn!("Wallet backend unavailable during send: {}", e);
            } else {
                error!("Send failed: {}", e);
            }
            anyhow::bail!("Send failed: {}", e);
        }
    }

    Ok(())
}

/// View transaction history
pub async fn history(client: &WalletClient, limit: usize) -> Result<()> {
    println!("\n=== TRANSACTION HISTORY ===\n");

    let records = client.get_transaction_history(limit).await;
    if records.is_empty() {
        println!("No transaction history found.");
    } else {
        print_records(&records);
    }

    println!();
    Ok(())
}

/// Show wallet stats
pub async fn stats(client: &WalletClient, json: bool) -> Result<()> {
    let stats = client.get_stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n=== FAUCET STATS ===\n");
    println!("Balance: {} ZEC", stats.balance);
    println!(
        "Address: {}",
        stats.address.as_deref().unwrap_or("(unavailable)")
    );
    println!("Transactions: {}", stats.transactions_count);

    if !stats.recent_transactions.is_empty() {
        println!("\nRecent:");
        print_records(&stats.recent_transactions);
    }

    println!();
    Ok(())
}

/// Sync the wallet now
pub async fn sync(client: &WalletClient, attempts: u32) -> Result<()> {
    if client.sync_wallet(attempts.max(1)).await {
        println!("Wallet synced with blockchain");
        Ok(())
    } else {
        anyhow::bail!("Wallet sync failed after {} attempt(s)", attempts.max(1))
    }
}

/// Shield transparent funds into Orchard
pub async fn shield(client: &WalletClient, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Shield all transparent funds to Orchard?")
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Shield cancelled by user");
            return Ok(());
        }
    }

    match client.shield_funds().await? {
        ShieldOutcome::NoFunds => println!("No transparent funds to shield"),
        ShieldOutcome::Shielded {
            txid,
            transparent,
            shielded,
            fee,
        } => {
            println!("\n=== SHIELD SUCCESSFUL ===");
            println!("Transparent: {} ZEC", transparent);
            println!("Shielded:    {} ZEC", shielded);
            println!("Fee:         {} ZEC", fee);
            println!("TXID: {}", txid);
        }
    }

    Ok(())
}

/// Show current configuration (credentials masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Wait for the backend, sync, then keep syncing until Ctrl-C
pub async fn run(client: Arc<WalletClient>, config: &Config) -> Result<()> {
    let height = client
        .wait_until_ready(config.backend.readiness_attempts)
        .await
        .context("Wallet backend never became ready")?;
    info!("Connected to wallet backend at block {}", height);

    match client.get_address(AddressKind::Unified).await {
        Some(address) => info!("Faucet address: {}", address),
        None => warn!("Faucet address unavailable"),
    }

    info!("Performing initial wallet sync...");
    if !client.sync_wallet(1).await {
        warn!("Initial sync failed (continuing anyway)");
    }

    match client.get_balance_breakdown().await {
        Ok(balance) => {
            info!("Initial balance: {} ZEC", balance.total);
            if !balance.transparent.is_zero() {
                info!("  Transparent: {} ZEC", balance.transparent);
            }
            if !balance.sapling.is_zero() {
                info!("  Sapling: {} ZEC", balance.sapling);
            }
            if !balance.orchard.is_zero() {
                info!("  Orchard: {} ZEC", balance.orchard);
            }
        }
        Err(e) => warn!("Could not read balance: {}", e),
    }

    let handle = spawn_periodic_sync(client, BackgroundSyncConfig::from(&config.sync));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down background sync");
    handle.abort();
    Ok(())
}

fn print_records(records: &[TransactionRecord]) {
    println!(
        "{:<20} {:<14} {:<18} {:<18}",
        "DATE", "AMOUNT (ZEC)", "TO", "TXID"
    );
    println!("{}", "-".repeat(72));

    for record in records {
        println!(
            "{:<20} {:<14} {:<18} {:<18}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.amount,
            address::short(&record.to_address),
            address::short(&record.txid),
        );
        if let Some(memo) = &record.memo {
            println!("  memo: {}", memo);
        }
    }
}
