//! TRON address type and the role an address plays in a resource lease.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypeError;

/// A validated TRON mainnet address in its base58check form (`T...`).
///
/// The string decodes to 21 bytes: the `0x41` network byte followed by the
/// 20-byte account id, protected by a 4-byte double-SHA-256 checksum.
/// Construction always validates, so holding a `TronAddress` means the value
/// is well-formed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TronAddress(String);

impl TronAddress {
    /// Length of every base58check-encoded mainnet address.
    pub const LEN: usize = 34;

    /// Network byte prepended to the account id on mainnet.
    pub const NETWORK_BYTE: u8 = 0x41;

    /// Parse and validate an address string.
    ///
    /// Surrounding whitespace is ignored; everything else must be exact.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let s = raw.trim();
        if s.len() != Self::LEN || !s.starts_with('T') {
            return Err(TypeError::InvalidAddress(s.to_string()));
        }
        let payload = bs58::decode(s)
            .with_check(Some(Self::NETWORK_BYTE))
            .into_vec()
            .map_err(|e| TypeError::InvalidAddress(format!("{s}: {e}")))?;
        if payload.len() != 21 {
            return Err(TypeError::InvalidAddress(format!(
                "{s}: decoded to {} bytes",
                payload.len()
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Build the address for a raw 20-byte account id.
    pub fn from_account_id(account_id: [u8; 20]) -> Self {
        let mut payload = [0u8; 21];
        payload[0] = Self::NETWORK_BYTE;
        payload[1..].copy_from_slice(&account_id);
        Self(bs58::encode(payload).with_check().into_string())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address bytes used in storage keys. Always [`Self::LEN`] long.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TronAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TronAddress {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TronAddress> for String {
    fn from(addr: TronAddress) -> Self {
        addr.0
    }
}

/// The side of a lease an address was observed on.
///
/// The same literal address can be a provider in one pair and a payment
/// receiver in another; reputation entries are always scoped to one role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Grants leased energy/bandwidth to another address.
    Provider,
    /// Receives the small payment that precedes a resource grant.
    Payment,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Provider, Role::Payment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Provider => "provider",
            Role::Payment => "payment",
        }
    }

    /// Single-byte tag used as the first byte of role-scoped storage keys.
    pub fn as_byte(&self) -> u8 {
        match self {
            Role::Provider => 0x01,
            Role::Payment => 0x02,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Role::Provider),
            0x02 => Some(Role::Payment),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "provider" => Ok(Role::Provider),
            "payment" => Ok(Role::Payment),
            other => Err(TypeError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // USDT-TRC20 contract, a well-known mainnet address.
    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn accepts_known_mainnet_address() {
        let addr = TronAddress::parse(USDT).expect("valid address");
        assert_eq!(addr.as_str(), USDT);
        assert_eq!(addr.as_bytes().len(), TronAddress::LEN);
    }

    #[test]
    fn trims_whitespace() {
        let addr = TronAddress::parse(&format!("  {USDT}\n")).unwrap();
        assert_eq!(addr.as_str(), USDT);
    }

    #[test]
    fn rejects_bad_checksum() {
        // Last character changed.
        let bad = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u";
        assert!(matches!(
            TronAddress::parse(bad),
            Err(TypeError::InvalidAddress(_))
        ));
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(TronAddress::parse("").is_err());
        assert!(TronAddress::parse("T123").is_err());
        assert!(TronAddress::parse("XR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").is_err());
        // '0' is not in the base58 alphabet.
        assert!(TronAddress::parse("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj60").is_err());
    }

    #[test]
    fn from_account_id_produces_valid_address() {
        let addr = TronAddress::from_account_id([7u8; 20]);
        assert!(addr.as_str().starts_with('T'));
        assert_eq!(TronAddress::parse(addr.as_str()).unwrap(), addr);
    }

    #[test]
    fn serde_rejects_invalid_address() {
        let ok: Result<TronAddress, _> = serde_json::from_str(&format!("\"{USDT}\""));
        assert!(ok.is_ok());
        let bad: Result<TronAddress, _> = serde_json::from_str("\"not-an-address\"");
        assert!(bad.is_err());
    }

    #[test]
    fn role_parsing() {
        assert_eq!("provider".parse::<Role>().unwrap(), Role::Provider);
        assert_eq!("PAYMENT".parse::<Role>().unwrap(), Role::Payment);
        assert!(matches!("receiver".parse::<Role>(), Err(TypeError::InvalidRole(_))));
    }

    #[test]
    fn role_byte_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::from_byte(role.as_byte()), Some(role));
        }
        assert_eq!(Role::from_byte(0), None);
    }
}
