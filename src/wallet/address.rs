//! Address kinds and destination checks
//!
//! Addresses stay opaque strings; only the human-readable prefix is inspected.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static ADDRESS_CHARS: OnceLock<Regex> = OnceLock::new();

fn address_chars() -> &'static Regex {
    ADDRESS_CHARS.get_or_init(|| {
        // bech32m (unified, sapling) and base58 (transparent) alphabets
        Regex::new(r"^[0-9A-Za-z]{20,512}$").expect("Invalid address regex")
    })
}

/// Receiver format of an address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Unified address (one or more receivers)
    #[default]
    Unified,

    /// Transparent P2PKH/P2SH address
    Transparent,

    /// Sapling shielded address
    Sapling,
}

impl AddressKind {
    /// Human-readable prefixes across mainnet, testnet and regtest
    pub fn prefixes(&self) -> &'static [&'static str] {
        match self {
            AddressKind::Unified => &["u1", "utest1", "uregtest1"],
            AddressKind::Transparent => &["t1", "t3", "tm", "t2"],
            AddressKind::Sapling => &["zs1", "ztestsapling1", "zregtestsapling1"],
        }
    }

    /// Check whether an address has one of this kind's prefixes
    pub fn matches(&self, address: &str) -> bool {
        self.prefixes().iter().any(|p| address.starts_with(p))
    }

    /// Classify an address by prefix
    pub fn detect(address: &str) -> Option<AddressKind> {
        [
            AddressKind::Unified,
            AddressKind::Transparent,
            AddressKind::Sapling,
        ]
        .into_iter()
        .find(|kind| kind.matches(address))
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Unified => write!(f, "unified"),
            AddressKind::Transparent => write!(f, "transparent"),
            AddressKind::Sapling => write!(f, "sapling"),
        }
    }
}

impl FromStr for AddressKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unified" | "u" => Ok(AddressKind::Unified),
            "transparent" | "t" => Ok(AddressKind::Transparent),
            "sapling" | "z" => Ok(AddressKind::Sapling),
            other => Err(Error::Config(format!("Unknown address kind: {}", other))),
        }
    }
}

/// Check a destination before any funds are touched
///
/// Returns the trimmed address.
pub fn validate_destination(address: &str) -> Result<&str> {
    let address = address.trim();

    if address.is_empty() {
        return Err(Error::InvalidAddress("address is empty".to_string()));
    }

    if !address_chars().is_match(address) {
        return Err(Error::InvalidAddress(format!(
            "{} contains invalid characters or has an invalid length",
            short(address)
        )));
    }

    if AddressKind::detect(address).is_none() {
        return Err(Error::InvalidAddress(format!(
            "{} has no recognised Zcash prefix",
            short(address)
        )));
    }

    Ok(address)
}

/// Shorten an address for log lines
pub fn short(address: &str) -> String {
    if address.chars().count() > 16 {
        let head: String = address.chars().take(12).collect();
        format!("{}...", head)
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFIED: &str = "uregtest1zkuzfv5m3yhv2j4fmvq5rjurkxenxyq8r7h4daun2zkznrjaa8ra8asgdm8wwgwjvlwwrxx7347r8w0ee6dqyw4rufw4wg9djwcr6frzkezmdw6dud3wsm99eany5r8wgsctlxquu009nzd6hsme2tcsk0v3sgjvxa70er7h27z5epr67p5q767s2z5gt88paru56mxpm6pwz0cu35m";

    #[test]
    fn test_detect_kinds() {
        assert_eq!(AddressKind::detect(UNIFIED), Some(AddressKind::Unified));
        assert_eq!(
            AddressKind::detect("tmBsTi2xWTjUdEXnuTceL7fecEQKeWaPDJd"),
            Some(AddressKind::Transparent)
        );
        assert_eq!(
            AddressKind::detect("zregtestsapling1qqqqqqqqqqqqqqqqqqqqqq"),
            Some(AddressKind::Sapling)
        );
        assert_eq!(AddressKind::detect("bc1qxyz"), None);
    }

    #[test]
    fn test_unified_matches_mainnet_prefix() {
        assert!(AddressKind::Unified.matches("u1abcdef"));
        assert!(!AddressKind::Unified.matches("tm123"));
    }

    #[test]
    fn test_validate_destination() {
        assert_eq!(validate_destination(&format!("  {}  ", UNIFIED)).unwrap(), UNIFIED);
        assert!(validate_destination("tmBsTi2xWTjUdEXnuTceL7fecEQKeWaPDJd").is_ok());

        assert!(matches!(
            validate_destination(""),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            validate_destination("u1abc"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            validate_destination("u1abcdefghijklmnopqrstuv\" && rm -rf /"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            validate_destination("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("unified".parse::<AddressKind>().unwrap(), AddressKind::Unified);
        assert_eq!("T".parse::<AddressKind>().unwrap(), AddressKind::Transparent);
        assert!("orchard".parse::<AddressKind>().is_err());
    }

    #[test]
    fn test_short() {
        assert_eq!(short(UNIFIED), "uregtest1zku...");
        assert_eq!(short("u1abc"), "u1abc");
    }
}
