//! Transaction-scoped views implementing the store traits.
//!
//! [`LmdbReader`] wraps a read transaction, [`LmdbWriter`] a write
//! transaction. Reads through a writer see its own uncommitted changes.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use tronguard_store::{
    AssociationRecord, BlacklistEntry, ComboEntry, PolicyConfig, StoreError, StoreRead,
    StoreWrite, VoteKind, VoteRecord, WhitelistEntry,
};
use tronguard_types::{ActorId, Role, TronAddress};

use crate::environment::{
    Databases, ASSOCIATIONS_DB, BLACKLIST_DB, COMBOS_DB, META_DB, VOTES_DB, WHITELIST_DB,
};
use crate::keys::{increment_prefix, pair_key, role_key, vote_key};
use crate::LmdbError;

pub(crate) const POLICY_KEY: &[u8] = b"policy";

pub(crate) fn decode<T: DeserializeOwned>(db: &'static str, bytes: &[u8]) -> Result<T, LmdbError> {
    bincode::deserialize(bytes).map_err(|e| LmdbError::Corruption {
        db,
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

fn get_decoded<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    name: &'static str,
    txn: &RoTxn,
    key: &[u8],
) -> Result<Option<T>, LmdbError> {
    match db.get(txn, key)? {
        Some(bytes) => Ok(Some(decode(name, bytes)?)),
        None => Ok(None),
    }
}

fn scan_all<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    name: &'static str,
    txn: &RoTxn,
) -> Result<Vec<T>, LmdbError> {
    let mut results = Vec::new();
    for result in db.iter(txn)? {
        let (_key, val) = result?;
        results.push(decode(name, val)?);
    }
    Ok(results)
}

/// Prefix range-scan: decode every value whose key starts with `prefix`.
fn scan_prefix<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    name: &'static str,
    txn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<T>, LmdbError> {
    let mut upper = prefix.to_vec();
    increment_prefix(&mut upper);
    let upper_bound = if upper.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(upper.as_slice())
    };
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(prefix), upper_bound);
    let mut results = Vec::new();
    for result in db.range(txn, &bounds)? {
        let (_key, val) = result?;
        results.push(decode(name, val)?);
    }
    Ok(results)
}

/// Read view over a read-only transaction.
pub(crate) struct LmdbReader<'t, 'e> {
    pub(crate) txn: &'t RoTxn<'e>,
    pub(crate) dbs: &'t Databases,
}

impl StoreRead for LmdbReader<'_, '_> {
    fn get_blacklist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<BlacklistEntry>, StoreError> {
        let key = role_key(address, role);
        Ok(get_decoded(&self.dbs.blacklist, BLACKLIST_DB, self.txn, &key)?)
    }

    fn iter_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(scan_all(&self.dbs.blacklist, BLACKLIST_DB, self.txn)?)
    }

    fn get_whitelist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<WhitelistEntry>, StoreError> {
        let key = role_key(address, role);
        Ok(get_decoded(&self.dbs.whitelist, WHITELIST_DB, self.txn, &key)?)
    }

    fn iter_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError> {
        Ok(scan_all(&self.dbs.whitelist, WHITELIST_DB, self.txn)?)
    }

    fn get_combo(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<ComboEntry>, StoreError> {
        let key = pair_key(provider, payment);
        Ok(get_decoded(&self.dbs.combos, COMBOS_DB, self.txn, &key)?)
    }

    fn iter_combos(&self) -> Result<Vec<ComboEntry>, StoreError> {
        Ok(scan_all(&self.dbs.combos, COMBOS_DB, self.txn)?)
    }

    fn get_association(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<AssociationRecord>, StoreError> {
        let key = pair_key(provider, payment);
        Ok(get_decoded(&self.dbs.associations, ASSOCIATIONS_DB, self.txn, &key)?)
    }

    fn associations_for(
        &self,
        provider: &TronAddress,
    ) -> Result<Vec<AssociationRecord>, StoreError> {
        Ok(scan_prefix(
            &self.dbs.associations,
            ASSOCIATIONS_DB,
            self.txn,
            provider.as_bytes(),
        )?)
    }

    fn iter_associations(&self) -> Result<Vec<AssociationRecord>, StoreError> {
        Ok(scan_all(&self.dbs.associations, ASSOCIATIONS_DB, self.txn)?)
    }

    fn association_count(&self) -> Result<u64, StoreError> {
        let count = self
            .dbs
            .associations
            .len(self.txn)
            .map_err(LmdbError::from)?;
        Ok(count)
    }

    fn get_vote(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let key = vote_key(provider, payment, voter, kind);
        Ok(get_decoded(&self.dbs.votes, VOTES_DB, self.txn, &key)?)
    }

    fn votes_for_pair(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Vec<VoteRecord>, StoreError> {
        let prefix = pair_key(provider, payment);
        Ok(scan_prefix(&self.dbs.votes, VOTES_DB, self.txn, &prefix)?)
    }

    fn iter_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(scan_all(&self.dbs.votes, VOTES_DB, self.txn)?)
    }

    fn get_policy(&self) -> Result<Option<PolicyConfig>, StoreError> {
        Ok(get_decoded(&self.dbs.meta, META_DB, self.txn, POLICY_KEY)?)
    }
}

/// Read/write view over a write transaction.
pub(crate) struct LmdbWriter<'t, 'e> {
    pub(crate) txn: &'t mut RwTxn<'e>,
    pub(crate) dbs: &'t Databases,
}

impl<'e> LmdbWriter<'_, 'e> {
    fn reader(&self) -> LmdbReader<'_, 'e> {
        LmdbReader {
            txn: &**self.txn,
            dbs: self.dbs,
        }
    }
}

impl StoreRead for LmdbWriter<'_, '_> {
    fn get_blacklist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<BlacklistEntry>, StoreError> {
        self.reader().get_blacklist(address, role)
    }

    fn iter_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        self.reader().iter_blacklist()
    }

    fn get_whitelist(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<WhitelistEntry>, StoreError> {
        self.reader().get_whitelist(address, role)
    }

    fn iter_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError> {
        self.reader().iter_whitelist()
    }

    fn get_combo(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<ComboEntry>, StoreError> {
        self.reader().get_combo(provider, payment)
    }

    fn iter_combos(&self) -> Result<Vec<ComboEntry>, StoreError> {
        self.reader().iter_combos()
    }

    fn get_association(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<AssociationRecord>, StoreError> {
        self.reader().get_association(provider, payment)
    }

    fn associations_for(
        &self,
        provider: &TronAddress,
    ) -> Result<Vec<AssociationRecord>, StoreError> {
        self.reader().associations_for(provider)
    }

    fn iter_associations(&self) -> Result<Vec<AssociationRecord>, StoreError> {
        self.reader().iter_associations()
    }

    fn association_count(&self) -> Result<u64, StoreError> {
        self.reader().association_count()
    }

    fn get_vote(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<Option<VoteRecord>, StoreError> {
        self.reader().get_vote(provider, payment, voter, kind)
    }

    fn votes_for_pair(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Vec<VoteRecord>, StoreError> {
        self.reader().votes_for_pair(provider, payment)
    }

    fn iter_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        self.reader().iter_votes()
    }

    fn get_policy(&self) -> Result<Option<PolicyConfig>, StoreError> {
        self.reader().get_policy()
    }
}

impl StoreWrite for LmdbWriter<'_, '_> {
    fn put_blacklist(&mut self, entry: &BlacklistEntry) -> Result<(), StoreError> {
        let key = role_key(&entry.address, entry.role);
        let bytes = encode(entry)?;
        self.dbs
            .blacklist
            .put(self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_blacklist(&mut self, address: &TronAddress, role: Role) -> Result<bool, StoreError> {
        let key = role_key(address, role);
        let removed = self
            .dbs
            .blacklist
            .delete(self.txn, &key)
            .map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn put_whitelist(&mut self, entry: &WhitelistEntry) -> Result<(), StoreError> {
        let key = role_key(&entry.address, entry.role);
        let bytes = encode(entry)?;
        self.dbs
            .whitelist
            .put(self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_whitelist(&mut self, address: &TronAddress, role: Role) -> Result<bool, StoreError> {
        let key = role_key(address, role);
        let removed = self
            .dbs
            .whitelist
            .delete(self.txn, &key)
            .map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn put_combo(&mut self, entry: &ComboEntry) -> Result<(), StoreError> {
        let key = pair_key(&entry.provider, &entry.payment);
        let bytes = encode(entry)?;
        self.dbs
            .combos
            .put(self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_combo(
        &mut self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<bool, StoreError> {
        let key = pair_key(provider, payment);
        let removed = self
            .dbs
            .combos
            .delete(self.txn, &key)
            .map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn put_association(&mut self, record: &AssociationRecord) -> Result<(), StoreError> {
        let key = pair_key(&record.provider, &record.payment);
        let bytes = encode(record)?;
        self.dbs
            .associations
            .put(self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn clear_associations(&mut self) -> Result<u64, StoreError> {
        let count = self
            .dbs
            .associations
            .len(&**self.txn)
            .map_err(LmdbError::from)?;
        self.dbs
            .associations
            .clear(self.txn)
            .map_err(LmdbError::from)?;
        Ok(count)
    }

    fn put_vote(&mut self, vote: &VoteRecord) -> Result<(), StoreError> {
        let key = vote_key(&vote.provider, &vote.payment, vote.voter, vote.kind);
        let bytes = encode(vote)?;
        self.dbs
            .votes
            .put(self.txn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_vote(
        &mut self,
        provider: &TronAddress,
        payment: &TronAddress,
        voter: ActorId,
        kind: VoteKind,
    ) -> Result<bool, StoreError> {
        let key = vote_key(provider, payment, voter, kind);
        let removed = self
            .dbs
            .votes
            .delete(self.txn, &key)
            .map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn put_policy(&mut self, policy: &PolicyConfig) -> Result<(), StoreError> {
        let bytes = encode(policy)?;
        self.dbs
            .meta
            .put(self.txn, POLICY_KEY, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }
}
