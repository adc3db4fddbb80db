//! Whitelist manager: single-address entries and provider/payment combos.
//!
//! Whitelisting is never propagated across associations.

use serde::Serialize;
use tracing::{debug, info};

use tronguard_store::{
    ComboEntry, EntryStatus, Expiring, StoreRead, StoreWrite, WhitelistEntry,
};
use tronguard_types::{ActorId, Reason, Role, Timestamp, TronAddress};

use crate::lifecycle::active;
use crate::ReputationError;

/// Active whitelist entries: singles split by role, plus combos.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WhitelistStats {
    pub provider: u64,
    pub payment: u64,
    pub single_total: u64,
    pub combos: u64,
}

#[derive(Default)]
pub struct WhitelistManager;

impl WhitelistManager {
    pub fn new() -> Self {
        Self
    }

    /// Admin endorsement of one address in one role. Always permanent.
    pub fn add_single<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        address: &TronAddress,
        role: Role,
        reason: Reason,
        actor: Option<ActorId>,
        now: Timestamp,
    ) -> Result<WhitelistEntry, ReputationError> {
        if let Some(existing) = w.get_whitelist(address, role)? {
            if existing.is_active(now) {
                return Err(ReputationError::AlreadyExists(format!(
                    "whitelist {address} ({role})"
                )));
            }
            debug!(address = %address, role = %role, "replacing expired whitelist entry");
            w.delete_whitelist(address, role)?;
        }
        let entry = WhitelistEntry {
            address: address.clone(),
            role,
            reason,
            status: EntryStatus::Permanent,
            vote_count: 0,
            voters: Default::default(),
            added_by: actor,
            created_at: now,
            expires_at: None,
        };
        w.insert_whitelist(&entry)?;
        info!(address = %address, role = %role, "whitelist entry added");
        Ok(entry)
    }

    /// Admin endorsement of one exact pair. Always permanent.
    pub fn add_combo<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        provider: &TronAddress,
        payment: &TronAddress,
        reason: Reason,
        actor: Option<ActorId>,
        now: Timestamp,
    ) -> Result<ComboEntry, ReputationError> {
        if let Some(existing) = w.get_combo(provider, payment)? {
            if existing.is_active(now) {
                return Err(ReputationError::AlreadyExists(format!(
                    "combo {provider} -> {payment}"
                )));
            }
            debug!(provider = %provider, payment = %payment, "replacing expired combo entry");
            w.delete_combo(provider, payment)?;
        }
        let entry = ComboEntry {
            provider: provider.clone(),
            payment: payment.clone(),
            reason,
            status: EntryStatus::Permanent,
            vote_count: 0,
            voters: Default::default(),
            added_by: actor,
            created_at: now,
            expires_at: None,
        };
        w.insert_combo(&entry)?;
        info!(provider = %provider, payment = %payment, "combo whitelist entry added");
        Ok(entry)
    }

    pub fn remove_single<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        address: &TronAddress,
        role: Role,
        now: Timestamp,
    ) -> Result<WhitelistEntry, ReputationError> {
        let not_found = || ReputationError::NotFound(format!("whitelist {address} ({role})"));
        let existing = active(w.get_whitelist(address, role)?, now).ok_or_else(not_found)?;
        w.delete_whitelist(address, role)?;
        info!(address = %address, role = %role, "whitelist entry removed");
        Ok(existing)
    }

    pub fn remove_combo<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        provider: &TronAddress,
        payment: &TronAddress,
        now: Timestamp,
    ) -> Result<ComboEntry, ReputationError> {
        let not_found = || ReputationError::NotFound(format!("combo {provider} -> {payment}"));
        let existing = active(w.get_combo(provider, payment)?, now).ok_or_else(not_found)?;
        w.delete_combo(provider, payment)?;
        info!(provider = %provider, payment = %payment, "combo whitelist entry removed");
        Ok(existing)
    }

    pub fn check_single<V: StoreRead + ?Sized>(
        &self,
        r: &V,
        address: &TronAddress,
        role: Role,
        now: Timestamp,
    ) -> Result<Option<WhitelistEntry>, ReputationError> {
        Ok(active(r.get_whitelist(address, role)?, now))
    }

    pub fn check_combo<V: StoreRead + ?Sized>(
        &self,
        r: &V,
        provider: &TronAddress,
        payment: &TronAddress,
        now: Timestamp,
    ) -> Result<Option<ComboEntry>, ReputationError> {
        Ok(active(r.get_combo(provider, payment)?, now))
    }

    pub fn stats<V: StoreRead + ?Sized>(
        &self,
        r: &V,
        now: Timestamp,
    ) -> Result<WhitelistStats, ReputationError> {
        let mut stats = WhitelistStats::default();
        for entry in r.iter_whitelist()? {
            if !entry.is_active(now) {
                continue;
            }
            match entry.role {
                Role::Provider => stats.provider += 1,
                Role::Payment => stats.payment += 1,
            }
            stats.single_total += 1;
        }
        stats.combos = r
            .iter_combos()?
            .iter()
            .filter(|c| c.is_active(now))
            .count() as u64;
        Ok(stats)
    }
}
