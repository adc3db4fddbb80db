//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use tronguard_store::{
    AssociationRecord, BlacklistEntry, ComboEntry, PolicyConfig, ReputationStore, StoreError,
    StoreRead, StoreWrite, VoteKind, VoteRecord, WhitelistEntry,
};
use tronguard_types::{ActorId, Role, TronAddress};

type PairKey = (TronAddress, TronAddress);
type VoteKey = (TronAddress, TronAddress, ActorId, u8);

#[derive(Clone, Default)]
struct Tables {
    associations: BTreeMap<PairKey, AssociationRecord>,
    blacklist: BTreeMap<(Role, TronAddress), BlacklistEntry>,
    whitelist: BTreeMap<(Role, TronAddress), WhitelistEntry>,
    combos: BTreeMap<PairKey, ComboEntry>,
    votes: BTreeMap<VoteKey, VoteRecord>,
    policy: Option<PolicyConfig>,
}

fn pair(provider: &TronAddress, payment: &TronAddress) -> PairKey {
    (provider.clone(), payment.clone())
}

impl StoreRead for Tables {
    fn get_blacklist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<BlacklistEntry>, StoreError> {
        Ok(self.blacklist.get(&(role, address.clone())).cloned())
    }

    fn iter_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(self.blacklist.values().cloned().collect())
    }

    fn get_whitelist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<WhitelistEntry>, StoreError> {
        Ok(self.whitelist.get(&(role, address.clone())).cloned())
    }

    fn iter_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError> {
        Ok(self.whitelist.values().cloned().collect())
    }

    fn get_combo(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<ComboEntry>, StoreError> {
        Ok(self.combos.get(&pair(provider, payment)).cloned())
    }

    fn iter_combos(&self) -> Result<Vec<ComboEntry>, StoreError> {
        Ok(self.combos.values().cloned().collect())
    }

    fn get_association(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<AssociationRecord>, StoreError> {
        Ok(self.associations.get(&pair(provider, payment)).cloned())
    }

    fn associations_for(
        &self,
        provider: &TronAddress,
    ) -> Result<Vec<AssociationRecord>, StoreError> {
        Ok(self
            .associations
            .values()
            .filter(|a| &a.provider == provider)
            .cloned()
            .collect())
    }

    fn iter_associations(&self) -> Result<Vec<AssociationRecord>, StoreError> {
        Ok(self.associations.values().cloned().collect())
    }

    fn association_count(&self) -> Result<u64, StoreError> {
        Ok(self.associations.len() as u64)
    }

    fn get_vote(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let key = (provider.clone(), payment.clone(), voter, kind.tag());
        Ok(self.votes.get(&key).cloned())
    }

    fn votes_for_pair(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .votes
            .values()
            .filter(|v| &v.provider == provider && &v.payment == payment)
            .cloned()
            .collect())
    }

    fn iter_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self.votes.values().cloned().collect())
    }

    fn get_policy(&self) -> Result<Option<PolicyConfig>, StoreError> {
        Ok(self.policy.clone())
    }
}

impl StoreWrite for Tables {
    fn put_blacklist(&mut self, entry: &BlacklistEntry) -> Result<(), StoreError> {
        self.blacklist
            .insert((entry.role, entry.address.clone()), entry.clone());
        Ok(())
    }

    fn delete_blacklist(&mut self, address: &TronAddress, role: Role) -> Result<bool, StoreError> {
        Ok(self.blacklist.remove(&(role, address.clone())).is_some())
    }

    fn put_whitelist(&mut self, entry: &WhitelistEntry) -> Result<(), StoreError> {
        self.whitelist
            .insert((entry.role, entry.address.clone()), entry.clone());
        Ok(())
    }

    fn delete_whitelist(&mut self, address: &TronAddress, role: Role) -> Result<bool, StoreError> {
        Ok(self.whitelist.remove(&(role, address.clone())).is_some())
    }

    fn put_combo(&mut self, entry: &ComboEntry) -> Result<(), StoreError> {
        self.combos
            .insert(pair(&entry.provider, &entry.payment), entry.clone());
        Ok(())
    }

    fn delete_combo(
        &mut self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<bool, StoreError> {
        Ok(self.combos.remove(&pair(provider, payment)).is_some())
    }

    fn put_association(&mut self, record: &AssociationRecord) -> Result<(), StoreError> {
        self.associations
            .insert(pair(&record.provider, &record.payment), record.clone());
        Ok(())
    }

    fn clear_associations(&mut self) -> Result<u64, StoreError> {
        let count = self.associations.len() as u64;
        self.associations.clear();
        Ok(count)
    }

    fn put_vote(&mut self, vote: &VoteRecord) -> Result<(), StoreError> {
        let key = (
            vote.provider.clone(),
            vote.payment.clone(),
            vote.voter,
            vote.kind.tag(),
        );
        self.votes.insert(key, vote.clone());
        Ok(())
    }

    fn delete_vote(
        &mut self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<bool, StoreError> {
        let key = (provider.clone(), payment.clone(), voter, kind.tag());
        Ok(self.votes.remove(&key).is_some())
    }

    fn put_policy(&mut self, policy: &PolicyConfig) -> Result<(), StoreError> {
        self.policy = Some(policy.clone());
        Ok(())
    }
}

/// An in-memory reputation store for testing.
///
/// A write closure works on a copy of the tables which replaces the
/// original only when the closure returns `Ok`. The mutex serialises
/// writers the way LMDB's single write transaction does.
#[derive(Default)]
pub struct NullStore {
    tables: Mutex<Tables>,
    failing_ops: AtomicU32,
    write_attempts: AtomicU32,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` transactions (read or write) fail with
    /// [`StoreError::Unavailable`] before touching any data.
    pub fn fail_next(&self, count: u32) {
        self.failing_ops.store(count, Ordering::SeqCst);
    }

    /// Number of write transactions started so far, including failed ones.
    pub fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn injected_failure(&self) -> Option<StoreError> {
        self.failing_ops
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| StoreError::Unavailable("injected failure".to_string()))
    }
}

impl ReputationStore for NullStore {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn StoreRead) -> Result<R, E>,
        E: From<StoreError>,
    {
        if let Some(err) = self.injected_failure() {
            return Err(err.into());
        }
        let tables = self.lock();
        f(&*tables)
    }

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn StoreWrite) -> Result<R, E>,
        E: From<StoreError>,
    {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.injected_failure() {
            return Err(err.into());
        }
        let mut tables = self.lock();
        let mut working = tables.clone();
        let value = f(&mut working)?;
        *tables = working;
        Ok(value)
    }
}
