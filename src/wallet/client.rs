//! Wallet client - guarded send and lenient reads over zingo-cli
//!
//! Two error policies live side by side:
//! - reads (balance, address, history, stats) never fail; they log and fall
//!   back to zero / `None` / empty so polling callers keep running;
//! - sends and shields fail loudly at the first gate that does not pass.
//!
//! Every operation that moves funds holds the client's operation lock for its
//! whole sync → check → transmit → record sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

use super::address::{self, AddressKind};
use super::backend::{command_word, SyncMode, WalletBackend};
use super::history::TransactionHistory;
use super::response::{parse_output, BackendResponse};
use super::types::{Balance, ShieldOutcome, TransactionRecord, WalletStats, Zatoshis};

/// Cached address file inside the wallet data directory
pub const ADDRESS_CACHE_FILE: &str = "faucet-address.txt";

/// Fee zingo-cli charges for a shielding transaction (0.0001 ZEC)
pub const SHIELD_FEE: Zatoshis = Zatoshis::from_u64(10_000);

/// Records returned by `get_stats`
const STATS_RECENT: usize = 5;

/// Wallet client configuration
#[derive(Debug, Clone)]
pub struct WalletClientConfig {
    /// zingo-cli data directory
    pub data_dir: PathBuf,

    /// Timeout for plain queries
    pub command_timeout: Duration,

    /// Timeout for send/shield broadcasts
    pub send_timeout: Duration,

    /// Timeout for one sync attempt
    pub sync_timeout: Duration,

    /// Sync attempts before a send is refused
    pub send_sync_attempts: u32,

    /// Pause after a successful sync
    pub settle_delay: Duration,

    /// Pause after a failed sync attempt
    pub retry_delay: Duration,

    /// Pause between readiness probes
    pub readiness_interval: Duration,
}

impl Default for WalletClientConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for WalletClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            data_dir: config.wallet.data_dir.clone(),
            command_timeout: Duration::from_secs(config.backend.command_timeout_secs),
            send_timeout: Duration::from_secs(config.backend.send_timeout_secs),
            sync_timeout: Duration::from_secs(config.backend.sync_timeout_secs),
            send_sync_attempts: config.sync.send_attempts,
            settle_delay: Duration::from_millis(config.sync.settle_delay_ms),
            retry_delay: Duration::from_millis(config.sync.retry_delay_ms),
            readiness_interval: Duration::from_secs(config.backend.readiness_interval_secs),
        }
    }
}

/// Faucet wallet client
///
/// Construct one per process and share it behind an `Arc`.
pub struct WalletClient {
    backend: Arc<dyn WalletBackend>,
    config: WalletClientConfig,
    history: TransactionHistory,
    /// Serializes fund-moving operations (and background syncs)
    op_lock: Mutex<()>,
}

impl WalletClient {
    /// Create a new wallet client
    pub fn new(config: WalletClientConfig, backend: Arc<dyn WalletBackend>) -> Self {
        let history = TransactionHistory::in_data_dir(&config.data_dir);

        info!(
            "Wallet client using {} backend (data dir {})",
            backend.name(),
            config.data_dir.display()
        );

        Self {
            backend,
            config,
            history,
            op_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &WalletClientConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn history(&self) -> &TransactionHistory {
        &self.history
    }

    /// Take the operation lock, waiting at most `timeout`
    ///
    /// Returns `None` when a send or shield is still in progress.
    pub async fn lock_for(&self, timeout: Duration) -> Option<MutexGuard<'_, ()>> {
        tokio::time::timeout(timeout, self.op_lock.lock()).await.ok()
    }

    /// Run one command with `--nosync` and parse its output
    pub async fn execute_command(&self, command: &str, timeout: Duration) -> Result<BackendResponse> {
        let stdout = self.backend.run(command, SyncMode::Skip, timeout).await?;
        Ok(parse_output(&stdout))
    }

    /// Sync the wallet with the chain
    ///
    /// Never fails; callers on the send path must treat `false` as a hard stop.
    pub async fn sync_wallet(&self, max_attempts: u32) -> bool {
        for attempt in 1..=max_attempts {
            info!("Syncing wallet (attempt {}/{})...", attempt, max_attempts);

            match self
                .backend
                .run("sync", SyncMode::Allow, self.config.sync_timeout)
                .await
            {
                Ok(_) => {
                    info!("Wallet sync completed (attempt {})", attempt);
                    sleep(self.config.settle_delay).await;
                    return true;
                }
                Err(e) => {
                    warn!("Sync attempt {} failed: {}", attempt, e);
                    if attempt < max_attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        error!("Sync failed after {} attempts", max_attempts);
        false
    }

    /// Balance by pool, failing if the backend cannot be queried
    pub async fn get_balance_breakdown(&self) -> Result<Balance> {
        let response = self
            .execute_command("balance", self.config.command_timeout)
            .await?;

        match response.json() {
            Some(value) => Ok(Balance::from_response(value)),
            None => {
                debug!("balance returned no JSON, treating as zero");
                Ok(Balance::default())
            }
        }
    }

    /// Total balance in zatoshis; zero on any failure
    pub async fn balance_zatoshis(&self) -> Zatoshis {
        match self.get_balance_breakdown().await {
            Ok(balance) => balance.total,
            Err(e) => {
                warn!("Error getting balance: {}", e);
                Zatoshis::ZERO
            }
        }
    }

    /// Total balance in ZEC; 0.0 on any failure
    pub async fn get_balance(&self) -> f64 {
        self.balance_zatoshis().await.to_zec()
    }

    /// First wallet address of the preferred kind
    ///
    /// Falls back to the cached address file, then `None`. Never fails.
    pub async fn get_address(&self, preferred: AddressKind) -> Option<String> {
        match self
            .execute_command("addresses", self.config.command_timeout)
            .await
        {
            Ok(response) => {
                if let Some(address) = pick_address(&response, preferred) {
                    return Some(address);
                }
                debug!("No {} address in wallet response", preferred);
            }
            Err(e) => warn!("Error getting address: {}", e),
        }

        self.cached_address().await
    }

    async fn cached_address(&self) -> Option<String> {
        let path = self.config.data_dir.join(ADDRESS_CACHE_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let address = content.trim();
                if address.is_empty() {
                    None
                } else {
                    debug!("Using cached address from {}", path.display());
                    Some(address.to_string())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Send funds through the guarded protocol
    ///
    /// 1. sync (hard gate)
    /// 2. balance must be non-zero and cover `amount`
    /// 3. broadcast the send and extract the txid
    /// 4. record in history and resync (both best effort)
    pub async fn send_to_address(
        &self,
        to_address: &str,
        amount: Zatoshis,
        memo: Option<&str>,
    ) -> Result<String> {
        let to_address = address::validate_destination(to_address)?;
        if amount.is_zero() {
            return Err(Error::InvalidAmount("cannot send 0 ZEC".to_string()));
        }
        let memo = memo.filter(|m| !m.is_empty());

        let _guard = self.op_lock.lock().await;

        info!(
            "Preparing to send {} ZEC to {}",
            amount,
            address::short(to_address)
        );

        info!("STEP 1/4: Syncing wallet...");
        let attempts = self.config.send_sync_attempts;
        if !self.sync_wallet(attempts).await {
            return Err(Error::SyncFailed { attempts });
        }

        info!("STEP 2/4: Checking balance...");
        let balance = self.balance_zatoshis().await;
        info!("  Current balance: {} ZEC", balance);
        check_funds(balance, amount)?;

        info!("STEP 3/4: Sending transaction...");
        let command = send_command(to_address, amount, memo);
        let response = self
            .execute_command(&command, self.config.send_timeout)
            .await?;
        let txid = response
            .txid()
            .ok_or_else(|| Error::NoTxid(command_word(&command).to_string()))?;
        info!("Transaction successful: {}", txid);

        info!("STEP 4/4: Recording transaction...");
        let record = TransactionRecord::new(to_address, amount, &txid, memo);
        if let Err(e) = self.history.append(&record).await {
            warn!("Failed to record transaction {}: {}", txid, e);
        }

        if !self.sync_wallet(1).await {
            warn!("Post-send sync failed; balance will catch up on the next sync");
        }

        Ok(txid)
    }

    /// Shield transparent funds into the Orchard pool
    pub async fn shield_funds(&self) -> Result<ShieldOutcome> {
        let _guard = self.op_lock.lock().await;

        let attempts = self.config.send_sync_attempts;
        if !self.sync_wallet(attempts).await {
            return Err(Error::SyncFailed { attempts });
        }

        let balance = self.get_balance_breakdown().await?;
        if balance.transparent.is_zero() {
            info!("No transparent funds to shield");
            return Ok(ShieldOutcome::NoFunds);
        }

        let shielded = match balance.transparent.checked_sub(SHIELD_FEE) {
            Some(amount) if !amount.is_zero() => amount,
            _ => {
                return Err(Error::InsufficientFunds {
                    available: balance.transparent_zec(),
                    required: SHIELD_FEE.to_zec(),
                })
            }
        };

        info!(
            "Shielding {} ZEC transparent -> orchard (fee {} ZEC)",
            balance.transparent, SHIELD_FEE
        );
        let response = self
            .execute_command("shield", self.config.send_timeout)
            .await?;
        let txid = response
            .txid()
            .ok_or_else(|| Error::NoTxid("shield".to_string()))?;
        info!("Shield transaction: {}", txid);

        if !self.sync_wallet(1).await {
            warn!("Post-shield sync failed");
        }

        Ok(ShieldOutcome::Shielded {
            txid,
            transparent: balance.transparent,
            shielded,
            fee: SHIELD_FEE,
        })
    }

    /// Most recent `limit` records, oldest first; empty on any failure
    pub async fn get_transaction_history(&self, limit: usize) -> Vec<TransactionRecord> {
        match self.history.recent(limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Error reading history: {}", e);
                Vec::new()
            }
        }
    }

    /// Balance, address and recent activity in one snapshot
    pub async fn get_stats(&self) -> WalletStats {
        let balance = self.get_balance().await;
        let address = self.get_address(AddressKind::Unified).await;

        let transactions_count = match self.history.count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Error counting history for stats: {}", e);
                0
            }
        };
        let recent_transactions = self.get_transaction_history(STATS_RECENT).await;

        WalletStats {
            balance,
            address,
            transactions_count,
            recent_transactions,
        }
    }

    /// Wait until the backend answers a `height` query
    ///
    /// Returns the reported chain height.
    pub async fn wait_until_ready(&self, max_attempts: u32) -> Result<u64> {
        let interval = self.config.readiness_interval;
        info!("Waiting for wallet backend to be ready...");

        for attempt in 1..=max_attempts {
            match self
                .execute_command("height", self.config.command_timeout)
                .await
            {
                Ok(response) => match response.u64_field("height") {
                    Some(height) => {
                        info!("Wallet backend ready at block height {}", height);
                        return Ok(height);
                    }
                    None => debug!("Backend not ready (attempt {}): no height yet", attempt),
                },
                Err(e) => debug!("Backend not ready (attempt {}): {}", attempt, e),
            }

            // Every sixth attempt only, to keep startup quiet
            if attempt % 6 == 0 {
                info!(
                    "Still waiting for wallet backend... (attempt {}/{})",
                    attempt, max_attempts
                );
            }

            if attempt < max_attempts {
                sleep(interval).await;
            }
        }

        Err(Error::BackendUnavailable(format!(
            "wallet backend not ready after {} attempts",
            max_attempts
        )))
    }
}

/// Zero balance is reported before the amount is considered
fn check_funds(balance: Zatoshis, amount: Zatoshis) -> Result<()> {
    if balance.is_zero() {
        return Err(Error::ZeroBalance);
    }
    if balance < amount {
        return Err(Error::InsufficientFunds {
            available: balance.to_zec(),
            required: amount.to_zec(),
        });
    }
    Ok(())
}

/// `send <address> <zatoshis> ["memo"]`
fn send_command(to_address: &str, amount: Zatoshis, memo: Option<&str>) -> String {
    match memo {
        Some(memo) => format!(
            "send {} {} \"{}\"",
            to_address,
            amount.into_u64(),
            memo.replace('\\', "\\\\").replace('"', "\\\"")
        ),
        None => format!("send {} {}", to_address, amount.into_u64()),
    }
}

/// Pick the first address of the preferred kind from an `addresses` result
fn pick_address(response: &BackendResponse, preferred: AddressKind) -> Option<String> {
    response
        .json()?
        .as_array()?
        .iter()
        .filter_map(|entry| {
            entry
                .as_str()
                .or_else(|| entry.get("address").and_then(|a| a.as_str()))
        })
        .find(|addr| preferred.matches(addr))
        .map(str::to_string)
}
