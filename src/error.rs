//! Error types for the faucet wallet

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the faucet wallet
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Backend process errors
    #[error("Wallet backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Wallet command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    // Guarded send errors
    #[error("Wallet sync failed after {attempts} attempt(s) - refusing to send funds")]
    SyncFailed { attempts: u32 },

    #[error("Wallet has zero balance. Wait for mining rewards.")]
    ZeroBalance,

    #[error("Insufficient balance: have {available} ZEC, need {required} ZEC")]
    InsufficientFunds { available: f64, required: f64 },

    #[error("No TXID returned from {0} command")]
    NoTxid(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // Audit log errors
    #[error("History log error: {0}")]
    History(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BackendUnavailable(_) | Error::Timeout { .. })
    }

    /// Check if this error is a send gate refusing to move funds
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            Error::SyncFailed { .. }
                | Error::ZeroBalance
                | Error::InsufficientFunds { .. }
                | Error::InvalidAddress(_)
                | Error::InvalidAmount(_)
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::BackendUnavailable("exit 1".into()).is_retryable());
        assert!(Error::Timeout {
            command: "balance".into(),
            secs: 30
        }
        .is_retryable());
        assert!(!Error::ZeroBalance.is_retryable());

        assert!(Error::ZeroBalance.is_safety_violation());
        assert!(Error::SyncFailed { attempts: 3 }.is_safety_violation());
        assert!(!Error::NoTxid("send".into()).is_safety_violation());
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = Error::InsufficientFunds {
            available: 0.5,
            required: 2.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: have 0.5 ZEC, need 2 ZEC"
        );
    }
}
