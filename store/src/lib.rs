//! Abstract storage traits for TronGuard.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`ReputationStore`]. The engine depends only on these traits.
//!
//! All access happens inside a transaction scope: [`ReputationStore::read`]
//! hands the closure a consistent [`StoreRead`] view, and
//! [`ReputationStore::write`] hands it a [`StoreWrite`] whose changes commit
//! only if the closure returns `Ok`. Returning `Err` discards every change
//! made inside the closure.

pub mod association;
pub mod blacklist;
pub mod error;
pub mod policy;
pub mod snapshot;
pub mod vote;
pub mod whitelist;

pub use association::{AssociationRecord, AssociationSource};
pub use blacklist::{BlacklistEntry, BlacklistSource};
pub use error::StoreError;
pub use policy::PolicyConfig;
pub use snapshot::Snapshot;
pub use vote::{ListKind, VoteKind, VoteRecord};
pub use whitelist::{ComboEntry, EntryStatus, WhitelistEntry};

use tronguard_types::{ActorId, Role, Timestamp, TronAddress};

/// Records that may carry an expiry.
pub trait Expiring {
    fn expires_at(&self) -> Option<Timestamp>;

    /// Active unless an expiry is set and has been reached.
    fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at().map_or(true, |at| now < at)
    }
}

/// Read access within one transaction.
pub trait StoreRead {
    fn get_blacklist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<BlacklistEntry>, StoreError>;

    fn iter_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError>;

    fn get_whitelist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<WhitelistEntry>, StoreError>;

    fn iter_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError>;

    fn get_combo(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<ComboEntry>, StoreError>;

    fn iter_combos(&self) -> Result<Vec<ComboEntry>, StoreError>;

    fn get_association(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<AssociationRecord>, StoreError>;

    /// All associations recorded for one provider.
    fn associations_for(&self, provider: &TronAddress)
        -> Result<Vec<AssociationRecord>, StoreError>;

    fn iter_associations(&self) -> Result<Vec<AssociationRecord>, StoreError>;

    fn association_count(&self) -> Result<u64, StoreError>;

    fn get_vote(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<Option<VoteRecord>, StoreError>;

    /// Every vote cast on one provider/payment pair.
    fn votes_for_pair(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Vec<VoteRecord>, StoreError>;

    fn iter_votes(&self) -> Result<Vec<VoteRecord>, StoreError>;

    /// The persisted policy record, `None` if it was never written.
    fn get_policy(&self) -> Result<Option<PolicyConfig>, StoreError>;
}

/// Write access within one transaction.
///
/// `put_*` overwrite; `insert_*` enforce the uniqueness of each table's key
/// and fail with [`StoreError::Duplicate`] when the key is occupied.
pub trait StoreWrite: StoreRead {
    fn put_blacklist(&mut self, entry: &BlacklistEntry) -> Result<(), StoreError>;

    /// Returns whether an entry was removed.
    fn delete_blacklist(&mut self, address: &TronAddress, role: Role) -> Result<bool, StoreError>;

    fn put_whitelist(&mut self, entry: &WhitelistEntry) -> Result<(), StoreError>;

    fn delete_whitelist(&mut self, address: &TronAddress, role: Role) -> Result<bool, StoreError>;

    fn put_combo(&mut self, entry: &ComboEntry) -> Result<(), StoreError>;

    fn delete_combo(
        &mut self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<bool, StoreError>;

    fn put_association(&mut self, record: &AssociationRecord) -> Result<(), StoreError>;

    /// Delete every association. Returns how many were removed.
    fn clear_associations(&mut self) -> Result<u64, StoreError>;

    fn put_vote(&mut self, vote: &VoteRecord) -> Result<(), StoreError>;

    fn delete_vote(
        &mut self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<bool, StoreError>;

    fn put_policy(&mut self, policy: &PolicyConfig) -> Result<(), StoreError>;

    fn insert_blacklist(&mut self, entry: &BlacklistEntry) -> Result<(), StoreError> {
        if self.get_blacklist(&entry.address, entry.role)?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "blacklist {} ({})",
                entry.address, entry.role
            )));
        }
        self.put_blacklist(entry)
    }

    fn insert_whitelist(&mut self, entry: &WhitelistEntry) -> Result<(), StoreError> {
        if self.get_whitelist(&entry.address, entry.role)?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "whitelist {} ({})",
                entry.address, entry.role
            )));
        }
        self.put_whitelist(entry)
    }

    fn insert_combo(&mut self, entry: &ComboEntry) -> Result<(), StoreError> {
        if self.get_combo(&entry.provider, &entry.payment)?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "combo {} -> {}",
                entry.provider, entry.payment
            )));
        }
        self.put_combo(entry)
    }

    fn insert_association(&mut self, record: &AssociationRecord) -> Result<(), StoreError> {
        if self
            .get_association(&record.provider, &record.payment)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "association {} -> {}",
                record.provider, record.payment
            )));
        }
        self.put_association(record)
    }
}

/// A transactional reputation store.
///
/// Implementations must give `write` closures exclusive, serialised access
/// (at most one write transaction in flight) so that a read-check followed
/// by an insert inside one closure cannot race another writer.
pub trait ReputationStore: Send + Sync {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn StoreRead) -> Result<R, E>,
        E: From<StoreError>;

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn StoreWrite) -> Result<R, E>,
        E: From<StoreError>;
}

impl<T: ReputationStore> ReputationStore for std::sync::Arc<T> {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn StoreRead) -> Result<R, E>,
        E: From<StoreError>,
    {
        (**self).read(f)
    }

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn StoreWrite) -> Result<R, E>,
        E: From<StoreError>,
    {
        (**self).write(f)
    }
}
