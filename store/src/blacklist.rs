//! Blacklist records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tronguard_types::{ActorId, Reason, Role, Timestamp, TronAddress};

use crate::Expiring;

/// How a blacklist entry came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistSource {
    /// Added by an admin command.
    Manual,
    /// Fanned out from a manually blacklisted provider.
    AutoAssociated,
    /// Created by user feedback.
    Temporary,
}

impl BlacklistSource {
    pub const ALL: [BlacklistSource; 3] = [
        BlacklistSource::Manual,
        BlacklistSource::AutoAssociated,
        BlacklistSource::Temporary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlacklistSource::Manual => "manual",
            BlacklistSource::AutoAssociated => "auto_associated",
            BlacklistSource::Temporary => "temporary",
        }
    }
}

impl fmt::Display for BlacklistSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlacklistSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(BlacklistSource::Manual),
            "auto" | "auto_associated" => Ok(BlacklistSource::AutoAssociated),
            "temporary" | "temp" => Ok(BlacklistSource::Temporary),
            other => Err(format!("unknown blacklist source: {other}")),
        }
    }
}

/// A blacklist entry, unique per `(address, role)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub address: TronAddress,
    pub role: Role,
    pub reason: Reason,
    pub source: BlacklistSource,
    /// Distinct voters backing a temporary entry; 0 for admin/propagated ones.
    pub vote_count: u32,
    /// The voters counted in `vote_count`.
    #[serde(default)]
    pub voters: BTreeSet<ActorId>,
    pub added_by: Option<ActorId>,
    pub created_at: Timestamp,
    /// Set while a temporary entry awaits corroboration.
    pub expires_at: Option<Timestamp>,
}

impl Expiring for BlacklistEntry {
    fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }
}
