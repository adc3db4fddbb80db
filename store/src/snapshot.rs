//! Serializable snapshot of the whole store, used by backup and restore.

use serde::{Deserialize, Serialize};
use tronguard_types::Timestamp;

use crate::{AssociationRecord, BlacklistEntry, ComboEntry, PolicyConfig, VoteRecord, WhitelistEntry};

/// Full copy of every table at one instant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub created_at: Timestamp,
    pub associations: Vec<AssociationRecord>,
    pub blacklist: Vec<BlacklistEntry>,
    pub whitelist: Vec<WhitelistEntry>,
    pub combos: Vec<ComboEntry>,
    pub votes: Vec<VoteRecord>,
    pub policy: Option<PolicyConfig>,
}

impl Snapshot {
    pub const FORMAT_VERSION: u32 = 1;

    /// Total number of records across all tables (policy excluded).
    pub fn record_count(&self) -> usize {
        self.associations.len()
            + self.blacklist.len()
            + self.whitelist.len()
            + self.combos.len()
            + self.votes.len()
    }
}
