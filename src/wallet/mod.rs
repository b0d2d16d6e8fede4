//! Faucet wallet module
//!
//! Wraps zingo-cli with:
//! - Command execution and output parsing
//! - The guarded send protocol (sync, balance check, send, record, resync)
//! - An append-only transaction history log
//! - Background sync
//!
//! # Architecture
//!
//! ```text
//! WalletBackend (zingo-cli process) → parse_output → WalletClient → TransactionHistory
//!                                                        ↑
//!                                              spawn_periodic_sync
//! ```
//!
//! # Safety
//!
//! Funds only move after a successful sync and a balance check inside the
//! same call, with the client's operation lock held throughout.

pub mod address;
pub mod background;
pub mod backend;
pub mod client;
pub mod history;
pub mod response;
pub mod types;

pub use address::AddressKind;
pub use background::{spawn_periodic_sync, BackgroundSyncConfig};
pub use backend::{SyncMode, WalletBackend, ZingoCliBackend};
pub use client::{WalletClient, WalletClientConfig};
pub use history::TransactionHistory;
pub use response::{parse_output, BackendResponse};
pub use types::{Balance, ShieldOutcome, TransactionRecord, WalletStats, Zatoshis};
