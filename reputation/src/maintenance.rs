//! Offline maintenance: bulk clear, purge of expired temporary entries and
//! the verification report.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use tronguard_store::{
    AssociationRecord, BlacklistEntry, BlacklistSource, Expiring, StoreRead, StoreWrite,
};
use tronguard_types::Timestamp;

use crate::association::propagation_enabled;
use crate::blacklist::{BlacklistManager, BlacklistStats};
use crate::lifecycle::TemporaryPolicy;
use crate::voting::vote_backs_any;
use crate::whitelist::{WhitelistManager, WhitelistStats};
use crate::ReputationError;

/// What a bulk clear removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearMode {
    /// Every association and every auto-associated blacklist entry.
    All,
    /// Associations only; propagated blacklist entries stay.
    AssociationsOnly,
}

impl fmt::Display for ClearMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClearMode::All => "all",
            ClearMode::AssociationsOnly => "associations-only",
        })
    }
}

impl FromStr for ClearMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ClearMode::All),
            "associations-only" | "associations_only" | "associations" => {
                Ok(ClearMode::AssociationsOnly)
            }
            other => Err(format!("unknown clear mode: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub mode: ClearMode,
    pub associations: u64,
    pub auto_blacklist: u64,
    pub propagation_reset: bool,
    pub dry_run: bool,
}

fn auto_entries<V: StoreRead + ?Sized>(r: &V) -> Result<Vec<BlacklistEntry>, ReputationError> {
    Ok(r.iter_blacklist()?
        .into_iter()
        .filter(|e| e.source == BlacklistSource::AutoAssociated)
        .collect())
}

/// Count what [`clear`] would remove without changing anything.
pub fn plan_clear<V: StoreRead + ?Sized>(
    r: &V,
    mode: ClearMode,
) -> Result<ClearReport, ReputationError> {
    let auto_blacklist = match mode {
        ClearMode::All => auto_entries(r)?.len() as u64,
        ClearMode::AssociationsOnly => 0,
    };
    Ok(ClearReport {
        mode,
        associations: r.association_count()?,
        auto_blacklist,
        propagation_reset: false,
        dry_run: true,
    })
}

/// Bulk-remove associations (and, in [`ClearMode::All`], propagated
/// blacklist entries). The propagation toggle is switched back on when
/// `reset_propagation` is set.
pub fn clear<W: StoreWrite + ?Sized>(
    w: &mut W,
    mode: ClearMode,
    reset_propagation: bool,
    now: Timestamp,
) -> Result<ClearReport, ReputationError> {
    let mut auto_blacklist = 0;
    if mode == ClearMode::All {
        for entry in auto_entries(&*w)? {
            if w.delete_blacklist(&entry.address, entry.role)? {
                auto_blacklist += 1;
            }
        }
    }
    let associations = w.clear_associations()?;
    if reset_propagation {
        crate::association::set_propagation(w, true, None, now)?;
    }
    info!(
        mode = %mode,
        associations,
        auto_blacklist,
        reset_propagation,
        "bulk clear committed"
    );
    Ok(ClearReport {
        mode,
        associations,
        auto_blacklist,
        propagation_reset: reset_propagation,
        dry_run: false,
    })
}

/// Rows removed by [`purge_expired`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub blacklist: u64,
    pub whitelist: u64,
    pub combos: u64,
    pub votes: u64,
}

impl PurgeReport {
    pub fn total(&self) -> u64 {
        self.blacklist + self.whitelist + self.combos + self.votes
    }
}

/// Delete every expired temporary entry, then every vote that no longer
/// backs anything and can no longer be cancelled.
pub fn purge_expired<W: StoreWrite + ?Sized>(
    w: &mut W,
    policy: &TemporaryPolicy,
    now: Timestamp,
) -> Result<PurgeReport, ReputationError> {
    let mut report = PurgeReport::default();

    for entry in w.iter_blacklist()? {
        if !entry.is_active(now) && w.delete_blacklist(&entry.address, entry.role)? {
            report.blacklist += 1;
        }
    }
    for entry in w.iter_whitelist()? {
        if !entry.is_active(now) && w.delete_whitelist(&entry.address, entry.role)? {
            report.whitelist += 1;
        }
    }
    for entry in w.iter_combos()? {
        if !entry.is_active(now) && w.delete_combo(&entry.provider, &entry.payment)? {
            report.combos += 1;
        }
    }
    for vote in w.iter_votes()? {
        if policy.can_revoke(vote.cast_at, now) || vote_backs_any(&*w, &vote, now)? {
            continue;
        }
        if w.delete_vote(&vote.provider, &vote.payment, vote.voter, vote.kind)? {
            report.votes += 1;
        }
    }

    info!(
        blacklist = report.blacklist,
        whitelist = report.whitelist,
        combos = report.combos,
        votes = report.votes,
        "expired temporary entries purged"
    );
    Ok(report)
}

/// State summary used by the `verify` maintenance command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub blacklist: BlacklistStats,
    /// Active temporary blacklist entries still waiting for promotion.
    pub temporary_unpromoted: u64,
    pub associations: u64,
    pub whitelist: WhitelistStats,
    /// `None` when no toggle record was ever written.
    pub propagation_enabled: Option<bool>,
    pub votes: u64,
    pub recent_associations: Vec<AssociationRecord>,
    pub recent_auto_blacklist: Vec<BlacklistEntry>,
}

/// Build the report. With `recent_limit > 0` the newest associations and
/// auto-associated entries are listed as well.
pub fn verify<V: StoreRead + ?Sized>(
    r: &V,
    policy: &TemporaryPolicy,
    now: Timestamp,
    recent_limit: usize,
) -> Result<VerificationReport, ReputationError> {
    let blacklist_manager = BlacklistManager::new(*policy);
    let blacklist = blacklist_manager.stats(r, now)?;
    let temporary_unpromoted = r
        .iter_blacklist()?
        .iter()
        .filter(|e| e.source == BlacklistSource::Temporary && e.expires_at.is_some())
        .filter(|e| e.is_active(now))
        .count() as u64;

    let propagation = match r.get_policy()? {
        Some(_) => Some(propagation_enabled(r)?),
        None => None,
    };

    let mut recent_associations = Vec::new();
    let mut recent_auto_blacklist = Vec::new();
    if recent_limit > 0 {
        recent_associations = r.iter_associations()?;
        recent_associations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_associations.truncate(recent_limit);

        recent_auto_blacklist =
            blacklist_manager.list(r, Some(BlacklistSource::AutoAssociated), now)?;
        recent_auto_blacklist.truncate(recent_limit);
    }

    Ok(VerificationReport {
        blacklist,
        temporary_unpromoted,
        associations: r.association_count()?,
        whitelist: WhitelistManager::new().stats(r, now)?,
        propagation_enabled: propagation,
        votes: r.iter_votes()?.len() as u64,
        recent_associations,
        recent_auto_blacklist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_mode_parsing() {
        assert_eq!("all".parse::<ClearMode>().unwrap(), ClearMode::All);
        assert_eq!(
            "associations-only".parse::<ClearMode>().unwrap(),
            ClearMode::AssociationsOnly
        );
        assert!("everything".parse::<ClearMode>().is_err());
    }

    #[test]
    fn purge_report_total() {
        let report = PurgeReport {
            blacklist: 1,
            whitelist: 2,
            combos: 3,
            votes: 4,
        };
        assert_eq!(report.total(), 10);
    }
}
