//! Whitelist records: single-address entries and provider/payment combos.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tronguard_types::{ActorId, Reason, Role, Timestamp, TronAddress};

use crate::Expiring;

/// Confidence level of a whitelist entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Backed by user votes below the promotion threshold.
    Temporary,
    /// Added by an admin or promoted by enough votes.
    Permanent,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryStatus::Temporary => "temporary",
            EntryStatus::Permanent => "permanent",
        })
    }
}

/// Endorsement of a single address in one role, unique per `(address, role)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub address: TronAddress,
    pub role: Role,
    pub reason: Reason,
    pub status: EntryStatus,
    pub vote_count: u32,
    #[serde(default)]
    pub voters: BTreeSet<ActorId>,
    pub added_by: Option<ActorId>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl Expiring for WhitelistEntry {
    fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }
}

/// Endorsement of one exact provider/payment pair, unique per pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboEntry {
    pub provider: TronAddress,
    pub payment: TronAddress,
    pub reason: Reason,
    pub status: EntryStatus,
    pub vote_count: u32,
    #[serde(default)]
    pub voters: BTreeSet<ActorId>,
    pub added_by: Option<ActorId>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl Expiring for ComboEntry {
    fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }
}
