//! Faucet Wallet Library
//!
//! Drives a zingo-cli wallet for a Zcash faucet: guarded sends, lenient
//! balance/address/history reads and a local transaction log.

pub mod cli;
pub mod config;
pub mod error;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use wallet::WalletClient;
