//! The reputation engine: transactional facade over every operation.
//!
//! Each public method runs in exactly one store transaction. Mutations go
//! through [`ReputationStore::write`], so an error anywhere inside leaves
//! the store untouched. A transaction that fails with
//! [`ReputationError::StorageUnavailable`] is retried as a whole.

use tracing::warn;

use tronguard_store::{
    AssociationRecord, BlacklistEntry, BlacklistSource, ComboEntry, ReputationStore, Snapshot,
    WhitelistEntry,
};
use tronguard_types::{ActorId, Clock, Reason, Role, SystemClock, Timestamp, TronAddress};

use crate::association::{self, RecordOutcome};
use crate::backup::{self, RestoreMode, RestoreReport};
use crate::blacklist::{BlacklistAdded, BlacklistManager, BlacklistStats};
use crate::config::EngineConfig;
use crate::lifecycle::TemporaryPolicy;
use crate::maintenance::{self, ClearMode, ClearReport, PurgeReport, VerificationReport};
use crate::propagation;
use crate::resolver::{self, Verdict};
use crate::voting::{Feedback, FeedbackOutcome, FeedbackProcessor};
use crate::whitelist::{WhitelistManager, WhitelistStats};
use crate::ReputationError;

/// Who is calling, as established by the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caller {
    Admin(ActorId),
    Regular(ActorId),
}

impl Caller {
    pub fn actor(&self) -> ActorId {
        match *self {
            Caller::Admin(id) | Caller::Regular(id) => id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin(_))
    }
}

pub struct ReputationEngine<S, C = SystemClock> {
    store: S,
    clock: C,
    policy: TemporaryPolicy,
    retry_attempts: u32,
    blacklist: BlacklistManager,
    whitelist: WhitelistManager,
    feedback: FeedbackProcessor,
}

impl<S: ReputationStore> ReputationEngine<S> {
    /// Engine on wall-clock time.
    pub fn new(store: S, config: &EngineConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: ReputationStore, C: Clock> ReputationEngine<S, C> {
    pub fn with_clock(store: S, clock: C, config: &EngineConfig) -> Self {
        let policy = config.temporary_policy();
        Self {
            store,
            clock,
            policy,
            retry_attempts: config.storage_retry_attempts,
            blacklist: BlacklistManager::new(policy),
            whitelist: WhitelistManager::new(),
            feedback: FeedbackProcessor::new(policy),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn require_admin(caller: Caller, op: &'static str) -> Result<(), ReputationError> {
        if caller.is_admin() {
            return Ok(());
        }
        warn!(op, actor = %caller.actor(), "admin-only operation refused");
        Err(ReputationError::Unauthorized)
    }

    /// Run `f` until it succeeds, fails permanently, or the retry budget
    /// for transient storage failures is spent.
    fn with_retry<R>(
        &self,
        op: &'static str,
        mut f: impl FnMut() -> Result<R, ReputationError>,
    ) -> Result<R, ReputationError> {
        let mut retries = 0;
        loop {
            match f() {
                Err(e) if e.is_transient() && retries < self.retry_attempts => {
                    retries += 1;
                    warn!(op, retry = retries, error = %e, "storage unavailable, retrying transaction");
                }
                result => return result,
            }
        }
    }

    // ── Associations & propagation ─────────────────────────────────────

    pub fn record_association(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<RecordOutcome, ReputationError> {
        let now = self.now();
        self.with_retry("record_association", || {
            self.store
                .write(|w| association::record_association(w, provider, payment, now))
        })
    }

    /// Re-run the fan-out for a provider. Idempotent.
    pub fn on_provider_blacklisted(
        &self,
        caller: Caller,
        provider: &TronAddress,
        reason: &str,
    ) -> Result<Vec<TronAddress>, ReputationError> {
        Self::require_admin(caller, "on_provider_blacklisted")?;
        let reason = Reason::new(reason)?;
        let now = self.now();
        self.with_retry("on_provider_blacklisted", || {
            self.store.write(|w| {
                propagation::on_provider_blacklisted(
                    w,
                    provider,
                    &reason,
                    Some(caller.actor()),
                    now,
                )
            })
        })
    }

    pub fn set_propagation(&self, caller: Caller, enabled: bool) -> Result<(), ReputationError> {
        Self::require_admin(caller, "set_propagation")?;
        let now = self.now();
        self.with_retry("set_propagation", || {
            self.store.write(|w| {
                association::set_propagation(w, enabled, Some(caller.actor()), now).map(|_| ())
            })
        })
    }

    pub fn propagation_enabled(&self) -> Result<bool, ReputationError> {
        self.with_retry("propagation_enabled", || {
            self.store.read(|r| association::propagation_enabled(r))
        })
    }

    pub fn associations_for(
        &self,
        provider: &TronAddress,
    ) -> Result<Vec<AssociationRecord>, ReputationError> {
        self.with_retry("associations_for", || {
            self.store.read(|r| association::associations_for(r, provider))
        })
    }

    // ── Blacklist ──────────────────────────────────────────────────────

    pub fn blacklist_add(
        &self,
        caller: Caller,
        address: &TronAddress,
        role: Role,
        reason: &str,
        source: BlacklistSource,
    ) -> Result<BlacklistAdded, ReputationError> {
        Self::require_admin(caller, "blacklist_add")?;
        let reason = Reason::new(reason)?;
        let now = self.now();
        self.with_retry("blacklist_add", || {
            self.store.write(|w| {
                self.blacklist.add(
                    w,
                    address,
                    role,
                    reason.clone(),
                    source,
                    Some(caller.actor()),
                    now,
                )
            })
        })
    }

    pub fn blacklist_remove(
        &self,
        caller: Caller,
        address: &TronAddress,
        role: Role,
    ) -> Result<BlacklistEntry, ReputationError> {
        Self::require_admin(caller, "blacklist_remove")?;
        let now = self.now();
        self.with_retry("blacklist_remove", || {
            self.store
                .write(|w| self.blacklist.remove(w, address, role, now))
        })
    }

    pub fn blacklist_check(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<BlacklistEntry>, ReputationError> {
        let now = self.now();
        self.with_retry("blacklist_check", || {
            self.store
                .read(|r| self.blacklist.check(r, address, role, now))
        })
    }

    pub fn blacklist_stats(&self) -> Result<BlacklistStats, ReputationError> {
        let now = self.now();
        self.with_retry("blacklist_stats", || {
            self.store.read(|r| self.blacklist.stats(r, now))
        })
    }

    pub fn blacklist_list(
        &self,
        source: Option<BlacklistSource>,
    ) -> Result<Vec<BlacklistEntry>, ReputationError> {
        let now = self.now();
        self.with_retry("blacklist_list", || {
            self.store.read(|r| self.blacklist.list(r, source, now))
        })
    }

    // ── Whitelist ──────────────────────────────────────────────────────

    pub fn whitelist_add_single(
        &self,
        caller: Caller,
        address: &TronAddress,
        role: Role,
        reason: &str,
    ) -> Result<WhitelistEntry, ReputationError> {
        Self::require_admin(caller, "whitelist_add_single")?;
        let reason = Reason::new(reason)?;
        let now = self.now();
        self.with_retry("whitelist_add_single", || {
            self.store.write(|w| {
                self.whitelist
                    .add_single(w, address, role, reason.clone(), Some(caller.actor()), now)
            })
        })
    }

    pub fn whitelist_add_combo(
        &self,
        caller: Caller,
        provider: &TronAddress,
        payment: &TronAddress,
        reason: &str,
    ) -> Result<ComboEntry, ReputationError> {
        Self::require_admin(caller, "whitelist_add_combo")?;
        let reason = Reason::new(reason)?;
        let now = self.now();
        self.with_retry("whitelist_add_combo", || {
            self.store.write(|w| {
                self.whitelist.add_combo(
                    w,
                    provider,
                    payment,
                    reason.clone(),
                    Some(caller.actor()),
                    now,
                )
            })
        })
    }

    pub fn whitelist_remove_single(
        &self,
        caller: Caller,
        address: &TronAddress,
        role: Role,
    ) -> Result<WhitelistEntry, ReputationError> {
        Self::require_admin(caller, "whitelist_remove_single")?;
        let now = self.now();
        self.with_retry("whitelist_remove_single", || {
            self.store
                .write(|w| self.whitelist.remove_single(w, address, role, now))
        })
    }

    pub fn whitelist_remove_combo(
        &self,
        caller: Caller,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<ComboEntry, ReputationError> {
        Self::require_admin(caller, "whitelist_remove_combo")?;
        let now = self.now();
        self.with_retry("whitelist_remove_combo", || {
            self.store
                .write(|w| self.whitelist.remove_combo(w, provider, payment, now))
        })
    }

    pub fn whitelist_check_single(
        &self,
        address: &TronAddress,
        role: Role,
    ) -> Result<Option<WhitelistEntry>, ReputationError> {
        let now = self.now();
        self.with_retry("whitelist_check_single", || {
            self.store
                .read(|r| self.whitelist.check_single(r, address, role, now))
        })
    }

    pub fn whitelist_check_combo(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Option<ComboEntry>, ReputationError> {
        let now = self.now();
        self.with_retry("whitelist_check_combo", || {
            self.store
                .read(|r| self.whitelist.check_combo(r, provider, payment, now))
        })
    }

    pub fn whitelist_stats(&self) -> Result<WhitelistStats, ReputationError> {
        let now = self.now();
        self.with_retry("whitelist_stats", || {
            self.store.read(|r| self.whitelist.stats(r, now))
        })
    }

    // ── Resolution & feedback ──────────────────────────────────────────

    pub fn resolve(
        &self,
        provider: &TronAddress,
        payment: &TronAddress,
    ) -> Result<Verdict, ReputationError> {
        let now = self.now();
        self.with_retry("resolve", || {
            self.store
                .read(|r| resolver::resolve(r, provider, payment, now))
        })
    }

    /// Record feedback from the caller, who is the voter.
    pub fn cast(
        &self,
        caller: Caller,
        provider: &TronAddress,
        payment: &TronAddress,
        feedback: Feedback,
    ) -> Result<FeedbackOutcome, ReputationError> {
        let now = self.now();
        self.with_retry("cast", || {
            self.store.write(|w| {
                self.feedback
                    .cast(w, caller.actor(), provider, payment, feedback, now)
            })
        })
    }

    // ── Maintenance ────────────────────────────────────────────────────

    pub fn purge_expired(&self, caller: Caller) -> Result<PurgeReport, ReputationError> {
        Self::require_admin(caller, "purge_expired")?;
        let now = self.now();
        self.with_retry("purge_expired", || {
            self.store
                .write(|w| maintenance::purge_expired(w, &self.policy, now))
        })
    }

    /// Bulk clear. A dry run only counts; otherwise the propagation toggle
    /// is switched back on when `reset_propagation` is set.
    pub fn clear(
        &self,
        caller: Caller,
        mode: ClearMode,
        dry_run: bool,
        reset_propagation: bool,
    ) -> Result<ClearReport, ReputationError> {
        Self::require_admin(caller, "clear")?;
        if dry_run {
            return self.with_retry("clear", || {
                self.store.read(|r| maintenance::plan_clear(r, mode))
            });
        }
        let now = self.now();
        self.with_retry("clear", || {
            self.store
                .write(|w| maintenance::clear(w, mode, reset_propagation, now))
        })
    }

    pub fn backup(&self) -> Result<Snapshot, ReputationError> {
        let now = self.now();
        self.with_retry("backup", || self.store.read(|r| backup::backup(r, now)))
    }

    pub fn restore(
        &self,
        caller: Caller,
        snapshot: &Snapshot,
        mode: RestoreMode,
        dry_run: bool,
    ) -> Result<RestoreReport, ReputationError> {
        Self::require_admin(caller, "restore")?;
        if dry_run {
            return self.with_retry("restore", || {
                self.store
                    .read(|r| backup::plan_restore(r, snapshot, mode))
            });
        }
        self.with_retry("restore", || {
            self.store.write(|w| backup::restore(w, snapshot, mode))
        })
    }

    /// Summary report; `recent_limit = 0` skips the recent-record lists.
    pub fn verify(&self, recent_limit: usize) -> Result<VerificationReport, ReputationError> {
        let now = self.now();
        self.with_retry("verify", || {
            self.store
                .read(|r| maintenance::verify(r, &self.policy, now, recent_limit))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_roles() {
        let admin = Caller::Admin(ActorId::new(1));
        let user = Caller::Regular(ActorId::new(2));
        assert!(admin.is_admin());
        assert!(!user.is_admin());
        assert_eq!(user.actor(), ActorId::new(2));
    }

    #[test]
    fn non_admin_is_refused() {
        let engine = ReputationEngine::with_clock(
            tronguard_nullables::NullStore::new(),
            tronguard_nullables::NullClock::new(1_000),
            &EngineConfig::default(),
        );
        let result = engine.set_propagation(Caller::Regular(ActorId::new(9)), true);
        assert!(matches!(result, Err(ReputationError::Unauthorized)));
        assert!(!engine.propagation_enabled().unwrap());
    }
}
