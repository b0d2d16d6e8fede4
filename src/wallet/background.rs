//! Periodic background sync
//!
//! Keeps the wallet close to the chain tip between sends. A tick that finds
//! a send or shield in progress is skipped instead of queueing behind it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;

use super::client::WalletClient;

/// Background sync timing
#[derive(Debug, Clone)]
pub struct BackgroundSyncConfig {
    pub interval: Duration,
    pub initial_delay: Duration,
    /// How long a tick waits for a busy wallet
    pub lock_timeout: Duration,
}

impl From<&SyncConfig> for BackgroundSyncConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.background_interval_secs),
            initial_delay: Duration::from_secs(config.background_initial_delay_secs),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }
}

/// Spawn the periodic sync task
///
/// Runs until the returned handle is aborted.
pub fn spawn_periodic_sync(
    client: Arc<WalletClient>,
    config: BackgroundSyncConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Avoid colliding with the startup sync
        sleep(config.initial_delay).await;

        info!(
            "Starting background wallet sync (every {}s)",
            config.interval.as_secs()
        );

        let mut ticker = interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut sync_count = 0u64;

        loop {
            ticker.tick().await;
            sync_count += 1;

            debug!("Background sync attempt #{}", sync_count);

            let guard = match client.lock_for(config.lock_timeout).await {
                Some(guard) => guard,
                None => {
                    debug!("Sync #{} skipped - wallet busy", sync_count);
                    continue;
                }
            };

            let synced = client.sync_wallet(1).await;
            drop(guard);

            if synced {
                let balance = client.get_balance().await;
                info!("Sync #{} complete - Balance: {} ZEC", sync_count, balance);
            } else {
                warn!(
                    "Sync #{} failed (will retry in {}s)",
                    sync_count,
                    config.interval.as_secs()
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::wallet::backend::{SyncMode, WalletBackend};
    use crate::wallet::client::WalletClientConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts syncs, answers every other command with an empty balance
    #[derive(Default)]
    struct CountingBackend {
        syncs: AtomicUsize,
    }

    #[async_trait]
    impl WalletBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self, command: &str, _mode: SyncMode, _timeout: Duration) -> Result<String> {
            if command == "sync" {
                self.syncs.fetch_add(1, Ordering::SeqCst);
            }
            Ok("{}".to_string())
        }
    }

    fn client(backend: Arc<CountingBackend>) -> (Arc<WalletClient>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = WalletClientConfig {
            data_dir: dir.path().to_path_buf(),
            settle_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            ..WalletClientConfig::default()
        };
        (Arc::new(WalletClient::new(config, backend)), dir)
    }

    fn fast() -> BackgroundSyncConfig {
        BackgroundSyncConfig {
            interval: Duration::from_millis(20),
            initial_delay: Duration::ZERO,
            lock_timeout: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_periodic_sync_runs() {
        let backend = Arc::new(CountingBackend::default());
        let (client, _dir) = client(backend.clone());

        let handle = spawn_periodic_sync(client, fast());
        sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert!(backend.syncs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_busy_wallet_skips_ticks() {
        let backend = Arc::new(CountingBackend::default());
        let (client, _dir) = client(backend.clone());

        let guard = client.lock_for(Duration::from_millis(10)).await.unwrap();
        let handle = spawn_periodic_sync(client.clone(), fast());
        sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.syncs.load(Ordering::SeqCst), 0);

        drop(guard);
        sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(backend.syncs.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_from_sync_config() {
        let config = BackgroundSyncConfig::from(&SyncConfig::default());
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.initial_delay, Duration::from_secs(10));
        assert_eq!(config.lock_timeout, Duration::from_millis(2000));
    }
}
