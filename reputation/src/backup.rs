//! Snapshot backup and restore.
//!
//! A snapshot is a full JSON copy of every table. Restoring runs in one
//! write transaction in one of two modes: [`RestoreMode::Fail`] refuses to
//! touch a store that already holds any of the snapshot's keys,
//! [`RestoreMode::Upsert`] overwrites them.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use tronguard_store::{Snapshot, StoreRead, StoreWrite};
use tronguard_types::Timestamp;

use crate::ReputationError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    Fail,
    #[default]
    Upsert,
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestoreMode::Fail => "fail",
            RestoreMode::Upsert => "upsert",
        })
    }
}

impl FromStr for RestoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(RestoreMode::Fail),
            "upsert" => Ok(RestoreMode::Upsert),
            other => Err(format!("unknown restore mode: {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Records whose key was free.
    pub inserted: u64,
    /// Records whose key was already occupied.
    pub conflicts: u64,
    pub policy_restored: bool,
    pub dry_run: bool,
}

/// Copy every table into a snapshot.
pub fn backup<V: StoreRead + ?Sized>(r: &V, now: Timestamp) -> Result<Snapshot, ReputationError> {
    Ok(Snapshot {
        format_version: Snapshot::FORMAT_VERSION,
        created_at: now,
        associations: r.iter_associations()?,
        blacklist: r.iter_blacklist()?,
        whitelist: r.iter_whitelist()?,
        combos: r.iter_combos()?,
        votes: r.iter_votes()?,
        policy: r.get_policy()?,
    })
}

fn check_version(snapshot: &Snapshot) -> Result<(), ReputationError> {
    if snapshot.format_version != Snapshot::FORMAT_VERSION {
        return Err(ReputationError::Snapshot(format!(
            "unsupported snapshot format version {} (expected {})",
            snapshot.format_version,
            Snapshot::FORMAT_VERSION
        )));
    }
    Ok(())
}

/// Count occupied keys for every snapshot record.
fn count_conflicts<V: StoreRead + ?Sized>(
    r: &V,
    snapshot: &Snapshot,
) -> Result<u64, ReputationError> {
    let mut conflicts = 0u64;
    for a in &snapshot.associations {
        conflicts += r.get_association(&a.provider, &a.payment)?.is_some() as u64;
    }
    for e in &snapshot.blacklist {
        conflicts += r.get_blacklist(&e.address, e.role)?.is_some() as u64;
    }
    for e in &snapshot.whitelist {
        conflicts += r.get_whitelist(&e.address, e.role)?.is_some() as u64;
    }
    for c in &snapshot.combos {
        conflicts += r.get_combo(&c.provider, &c.payment)?.is_some() as u64;
    }
    for v in &snapshot.votes {
        conflicts += r
            .get_vote(&v.provider, &v.payment, v.voter, v.kind)?
            .is_some() as u64;
    }
    Ok(conflicts)
}

fn restores_policy<V: StoreRead + ?Sized>(
    r: &V,
    snapshot: &Snapshot,
    mode: RestoreMode,
) -> Result<bool, ReputationError> {
    Ok(snapshot.policy.is_some() && (mode == RestoreMode::Upsert || r.get_policy()?.is_none()))
}

/// Report what [`restore`] would do without changing anything.
pub fn plan_restore<V: StoreRead + ?Sized>(
    r: &V,
    snapshot: &Snapshot,
    mode: RestoreMode,
) -> Result<RestoreReport, ReputationError> {
    check_version(snapshot)?;
    let conflicts = count_conflicts(r, snapshot)?;
    Ok(RestoreReport {
        inserted: snapshot.record_count() as u64 - conflicts,
        conflicts,
        policy_restored: restores_policy(r, snapshot, mode)?,
        dry_run: true,
    })
}

/// Write the snapshot into the store.
///
/// In [`RestoreMode::Fail`] any occupied key aborts the restore with
/// `AlreadyExists` before anything is written. The policy record is a
/// singleton: `Fail` only writes it into a store that has none.
pub fn restore<W: StoreWrite + ?Sized>(
    w: &mut W,
    snapshot: &Snapshot,
    mode: RestoreMode,
) -> Result<RestoreReport, ReputationError> {
    check_version(snapshot)?;
    let conflicts = count_conflicts(&*w, snapshot)?;
    if mode == RestoreMode::Fail && conflicts > 0 {
        return Err(ReputationError::AlreadyExists(format!(
            "{conflicts} snapshot records already present"
        )));
    }
    let policy_restored = restores_policy(&*w, snapshot, mode)?;

    for a in &snapshot.associations {
        w.put_association(a)?;
    }
    for e in &snapshot.blacklist {
        w.put_blacklist(e)?;
    }
    for e in &snapshot.whitelist {
        w.put_whitelist(e)?;
    }
    for c in &snapshot.combos {
        w.put_combo(c)?;
    }
    for v in &snapshot.votes {
        w.put_vote(v)?;
    }
    if policy_restored {
        if let Some(policy) = &snapshot.policy {
            w.put_policy(policy)?;
        }
    }

    let report = RestoreReport {
        inserted: snapshot.record_count() as u64 - conflicts,
        conflicts,
        policy_restored,
        dry_run: false,
    };
    info!(
        mode = %mode,
        inserted = report.inserted,
        overwritten = report.conflicts,
        "snapshot restored"
    );
    Ok(report)
}

/// Write a snapshot as pretty-printed JSON.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), ReputationError> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| ReputationError::Snapshot(e.to_string()))?;
    std::fs::write(path, json)
        .map_err(|e| ReputationError::Snapshot(format!("{}: {}", path.display(), e)))
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot, ReputationError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ReputationError::Snapshot(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| ReputationError::Snapshot(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_restore_mode_is_upsert() {
        assert_eq!(RestoreMode::default(), RestoreMode::Upsert);
        assert_eq!("FAIL".parse::<RestoreMode>().unwrap(), RestoreMode::Fail);
    }

    #[test]
    fn snapshot_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = Snapshot {
            format_version: Snapshot::FORMAT_VERSION,
            created_at: Timestamp::new(42),
            ..Default::default()
        };
        write_snapshot(&path, &snapshot).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn unknown_format_version_is_rejected() {
        let snapshot = Snapshot {
            format_version: 99,
            ..Default::default()
        };
        assert!(matches!(
            check_version(&snapshot),
            Err(ReputationError::Snapshot(_))
        ));
    }

    #[test]
    fn unreadable_file_is_snapshot_error() {
        let result = read_snapshot(Path::new("/nonexistent/snapshot.json"));
        assert!(matches!(result, Err(ReputationError::Snapshot(_))));
    }
}
