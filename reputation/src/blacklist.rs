//! Blacklist manager: CRUD over role-scoped blacklist entries.

use serde::Serialize;
use tracing::{debug, info};

use tronguard_store::{BlacklistEntry, BlacklistSource, Expiring, StoreRead, StoreWrite};
use tronguard_types::{ActorId, Reason, Role, Timestamp, TronAddress};

use crate::lifecycle::{active, TemporaryPolicy};
use crate::propagation;
use crate::ReputationError;

/// Active blacklist entries partitioned by source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlacklistStats {
    pub manual: u64,
    pub auto_associated: u64,
    pub temporary: u64,
    pub total: u64,
}

/// Outcome of a successful add.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlacklistAdded {
    pub entry: BlacklistEntry,
    /// Payment addresses blacklisted by the fan-out in the same transaction.
    pub propagated: Vec<TronAddress>,
}

pub struct BlacklistManager {
    policy: TemporaryPolicy,
}

impl BlacklistManager {
    pub fn new(policy: TemporaryPolicy) -> Self {
        Self { policy }
    }

    /// Add an entry for `(address, role)`.
    ///
    /// Fails with `AlreadyExists` while an active entry is present. A manual
    /// provider entry runs the propagation fan-out before returning.
    #[allow(clippy::too_many_arguments)]
    pub fn add<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        address: &TronAddress,
        role: Role,
        reason: Reason,
        source: BlacklistSource,
        actor: Option<ActorId>,
        now: Timestamp,
    ) -> Result<BlacklistAdded, ReputationError> {
        if let Some(existing) = w.get_blacklist(address, role)? {
            if existing.is_active(now) {
                return Err(ReputationError::AlreadyExists(format!(
                    "blacklist {address} ({role}, {})",
                    existing.source
                )));
            }
            debug!(address = %address, role = %role, "replacing expired blacklist entry");
            w.delete_blacklist(address, role)?;
        }

        let expires_at = match source {
            BlacklistSource::Temporary => Some(self.policy.expiry(now)),
            BlacklistSource::Manual | BlacklistSource::AutoAssociated => None,
        };
        let entry = BlacklistEntry {
            address: address.clone(),
            role,
            reason,
            source,
            vote_count: 0,
            voters: Default::default(),
            added_by: actor,
            created_at: now,
            expires_at,
        };
        w.insert_blacklist(&entry)?;
        info!(address = %address, role = %role, source = %source, "blacklist entry added");

        let propagated = if source == BlacklistSource::Manual && role == Role::Provider {
            propagation::on_provider_blacklisted(w, address, &entry.reason, actor, now)?
        } else {
            Vec::new()
        };

        Ok(BlacklistAdded { entry, propagated })
    }

    /// Remove the entry for `(address, role)` and return it.
    ///
    /// Never touches entries propagated from it. An expired entry counts as
    /// absent.
    pub fn remove<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        address: &TronAddress,
        role: Role,
        now: Timestamp,
    ) -> Result<BlacklistEntry, ReputationError> {
        let not_found = || ReputationError::NotFound(format!("blacklist {address} ({role})"));
        let existing = active(w.get_blacklist(address, role)?, now).ok_or_else(not_found)?;
        w.delete_blacklist(address, role)?;
        info!(address = %address, role = %role, source = %existing.source, "blacklist entry removed");
        Ok(existing)
    }

    pub fn check<V: StoreRead + ?Sized>(
        &self,
        r: &V,
        address: &TronAddress,
        role: Role,
        now: Timestamp,
    ) -> Result<Option<BlacklistEntry>, ReputationError> {
        Ok(active(r.get_blacklist(address, role)?, now))
    }

    pub fn stats<V: StoreRead + ?Sized>(
        &self,
        r: &V,
        now: Timestamp,
    ) -> Result<BlacklistStats, ReputationError> {
        let mut stats = BlacklistStats::default();
        for entry in r.iter_blacklist()? {
            if !entry.is_active(now) {
                continue;
            }
            match entry.source {
                BlacklistSource::Manual => stats.manual += 1,
                BlacklistSource::AutoAssociated => stats.auto_associated += 1,
                BlacklistSource::Temporary => stats.temporary += 1,
            }
            stats.total += 1;
        }
        Ok(stats)
    }

    /// Active entries, newest first, optionally restricted to one source.
    pub fn list<V: StoreRead + ?Sized>(
        &self,
        r: &V,
        source: Option<BlacklistSource>,
        now: Timestamp,
    ) -> Result<Vec<BlacklistEntry>, ReputationError> {
        let mut entries: Vec<BlacklistEntry> = r
            .iter_blacklist()?
            .into_iter()
            .filter(|e| e.is_active(now))
            .filter(|e| source.map_or(true, |s| e.source == s))
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}
