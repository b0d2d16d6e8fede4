//! Core types for the faucet wallet
//!
//! Defines amounts, balances, transaction records and stats snapshots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Zatoshis per ZEC
pub const ZATOSHIS_PER_ZEC: u64 = 100_000_000;

/// Decimal places of one zatoshi
const ZEC_DECIMALS: usize = 8;

/// Amount in the smallest indivisible unit (1 ZEC = 10^8 zatoshis)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Zatoshis(u64);

impl Zatoshis {
    pub const ZERO: Zatoshis = Zatoshis(0);

    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub const fn into_u64(self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert a decimal ZEC amount, flooring anything below one zatoshi
    ///
    /// Goes through the shortest decimal rendering of the float, so 0.29
    /// (stored as 0.28999999999999998) converts to 29_000_000 while
    /// 0.99999999999 still floors to 99_999_999.
    pub fn from_zec(zec: f64) -> Result<Self> {
        if !zec.is_finite() || zec < 0.0 {
            return Err(Error::InvalidAmount(format!(
                "{} is not a non-negative finite amount",
                zec
            )));
        }
        format!("{}", zec).parse()
    }

    /// Amount in ZEC for display
    pub fn to_zec(self) -> f64 {
        self.0 as f64 / ZATOSHIS_PER_ZEC as f64
    }

    pub fn checked_add(self, other: Zatoshis) -> Option<Zatoshis> {
        self.0.checked_add(other.0).map(Zatoshis)
    }

    pub fn checked_sub(self, other: Zatoshis) -> Option<Zatoshis> {
        self.0.checked_sub(other.0).map(Zatoshis)
    }
}

impl FromStr for Zatoshis {
    type Err = Error;

    /// Parse a decimal ZEC string. Digits past the eighth decimal are truncated.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidAmount(format!("'{}' is not a decimal ZEC amount", s));

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };

        let mut frac_digits: String = frac.chars().take(ZEC_DECIMALS).collect();
        while frac_digits.len() < ZEC_DECIMALS {
            frac_digits.push('0');
        }
        let frac: u64 = frac_digits.parse().map_err(|_| invalid())?;

        whole
            .checked_mul(ZATOSHIS_PER_ZEC)
            .and_then(|z| z.checked_add(frac))
            .map(Zatoshis)
            .ok_or_else(|| Error::InvalidAmount(format!("{} ZEC overflows", s)))
    }
}

impl fmt::Display for Zatoshis {
    /// Decimal ZEC without trailing zeros: 150000000 -> "1.5"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ZATOSHIS_PER_ZEC;
        let frac = self.0 % ZATOSHIS_PER_ZEC;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:08}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

/// Wallet balance split by pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub transparent: Zatoshis,
    pub sapling: Zatoshis,
    pub orchard: Zatoshis,
    /// Sum of the pools, or the generic `balance` field when the pools sum to zero
    pub total: Zatoshis,
}

impl Balance {
    /// Read a `balance` command result
    ///
    /// Anything that is not a JSON object yields an all-zero balance.
    pub fn from_response(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }

        let transparent = zatoshi_field(value, "transparent_balance");
        let sapling = zatoshi_field(value, "sapling_balance");
        let orchard = zatoshi_field(value, "orchard_balance");

        let mut total = transparent
            .checked_add(sapling)
            .and_then(|t| t.checked_add(orchard))
            .unwrap_or(Zatoshis(u64::MAX));

        if total.is_zero() && value.get("balance").is_some() {
            total = zatoshi_field(value, "balance");
        }

        Self {
            transparent,
            sapling,
            orchard,
            total,
        }
    }

    pub fn transparent_zec(&self) -> f64 {
        self.transparent.to_zec()
    }
}

/// Integer zatoshi field, tolerating floats and treating negatives as zero
fn zatoshi_field(value: &Value, key: &str) -> Zatoshis {
    let field = match value.get(key) {
        Some(field) => field,
        None => return Zatoshis::ZERO,
    };

    field
        .as_u64()
        .or_else(|| field.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
        .map(Zatoshis)
        .unwrap_or(Zatoshis::ZERO)
}

/// Sent transaction, appended to the history log after a confirmed send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// When the send completed (UTC)
    pub timestamp: DateTime<Utc>,

    /// Destination address
    pub to_address: String,

    /// Amount in ZEC
    pub amount: f64,

    /// Transaction id returned by the backend
    pub txid: String,

    /// Optional memo attached to the send
    #[serde(default)]
    pub memo: Option<String>,
}

impl TransactionRecord {
    /// Record a send that just completed
    pub fn new(to_address: &str, amount: Zatoshis, txid: &str, memo: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now(),
            to_address: to_address.to_string(),
            amount: amount.to_zec(),
            txid: txid.to_string(),
            memo: memo.filter(|m| !m.is_empty()).map(str::to_string),
        }
    }
}

/// Snapshot for dashboards and the `stats` command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalletStats {
    /// Balance in ZEC
    pub balance: f64,
    pub address: Option<String>,
    pub transactions_count: usize,
    pub recent_transactions: Vec<TransactionRecord>,
}

/// Result of shielding transparent funds into Orchard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShieldOutcome {
    /// Transparent pool was empty
    NoFunds,

    Shielded {
        txid: String,
        transparent: Zatoshis,
        shielded: Zatoshis,
        fee: Zatoshis,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_exact_eight_decimals() {
        let z: Zatoshis = "1.23456789".parse().unwrap();
        assert_eq!(z.into_u64(), 123_456_789);

        let z: Zatoshis = "0.5".parse().unwrap();
        assert_eq!(z.into_u64(), 50_000_000);

        let z: Zatoshis = "42".parse().unwrap();
        assert_eq!(z.into_u64(), 4_200_000_000);
    }

    #[test]
    fn test_parse_truncates_below_one_zatoshi() {
        let z: Zatoshis = "0.123456789".parse().unwrap();
        assert_eq!(z.into_u64(), 12_345_678);

        let z: Zatoshis = "0.000000019999".parse().unwrap();
        assert_eq!(z.into_u64(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Zatoshis>().is_err());
        assert!(".".parse::<Zatoshis>().is_err());
        assert!("-1".parse::<Zatoshis>().is_err());
        assert!("1.2.3".parse::<Zatoshis>().is_err());
        assert!("1e5".parse::<Zatoshis>().is_err());
        assert!("999999999999999999".parse::<Zatoshis>().is_err());
    }

    #[test]
    fn test_from_zec_float() {
        assert_eq!(Zatoshis::from_zec(1.0).unwrap().into_u64(), 100_000_000);
        assert_eq!(Zatoshis::from_zec(0.29).unwrap().into_u64(), 29_000_000);
        assert_eq!(
            Zatoshis::from_zec(1.23456789).unwrap().into_u64(),
            123_456_789
        );
        assert_eq!(Zatoshis::from_zec(0.123456789).unwrap().into_u64(), 12_345_678);
        assert!(Zatoshis::from_zec(-0.1).is_err());
        assert_eq!(Zatoshis::from_zec(1e-9).unwrap(), Zatoshis::ZERO);
        assert!(Zatoshis::from_zec(f64::NAN).is_err());
        assert!(Zatoshis::from_zec(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Zatoshis::from_u64(150_000_000).to_string(), "1.5");
        assert_eq!(Zatoshis::from_u64(100_000_000).to_string(), "1");
        assert_eq!(Zatoshis::from_u64(1).to_string(), "0.00000001");
        assert_eq!(Zatoshis::ZERO.to_string(), "0");
    }

    #[test]
    fn test_from_zec_floors_just_below_boundary() {
        assert_eq!(Zatoshis::from_zec(0.99999999999).unwrap().into_u64(), 99_999_999);
        assert_eq!(Zatoshis::from_zec(1.999999999).unwrap().into_u64(), 199_999_999);
    }

    #[test]
    fn test_balance_sums_pools() {
        let balance = Balance::from_response(&json!({
            "transparent_balance": 100_000_000u64,
            "sapling_balance": 0,
            "orchard_balance": 0
        }));
        assert_eq!(balance.total, Zatoshis::from_u64(100_000_000));

        let balance = Balance::from_response(&json!({
            "transparent_balance": 25_000_000u64,
            "sapling_balance": 25_000_000u64,
            "orchard_balance": 50_000_000u64
        }));
        assert_eq!(balance.total, Zatoshis::from_u64(100_000_000));
        assert_eq!(balance.orchard.to_zec(), 0.5);
    }

    #[test]
    fn test_balance_generic_field_fallback() {
        let balance = Balance::from_response(&json!({ "balance": 300_000_000u64 }));
        assert_eq!(balance.total, Zatoshis::from_u64(300_000_000));

        // Pool sum wins when non-zero
        let balance = Balance::from_response(&json!({
            "orchard_balance": 10u64,
            "balance": 999u64
        }));
        assert_eq!(balance.total.into_u64(), 10);
    }

    #[test]
    fn test_balance_from_non_object() {
        assert_eq!(Balance::from_response(&json!([1, 2])), Balance::default());
        assert_eq!(
            Balance::from_response(&json!({ "transparent_balance": -5 })).total,
            Zatoshis::ZERO
        );
    }

    #[test]
    fn test_record_drops_empty_memo() {
        let record = TransactionRecord::new("u1abc", Zatoshis::from_u64(50_000_000), "ff", Some(""));
        assert_eq!(record.memo, None);
        assert_eq!(record.amount, 0.5);
    }

    #[test]
    fn test_record_reads_legacy_json() {
        let legacy = r#"{
            "timestamp": "2025-01-01T12:00:00.123456Z",
            "to_address": "u1abc",
            "amount": 0.5,
            "txid": "abc123",
            "memo": ""
        }"#;
        let record: TransactionRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(record.txid, "abc123");
        assert_eq!(record.memo.as_deref(), Some(""));
    }

    #[test]
    fn test_shield_outcome_serialization() {
        let json = serde_json::to_string(&ShieldOutcome::NoFunds).unwrap();
        assert_eq!(json, r#"{"status":"no_funds"}"#);
    }
}
