//! LMDB database integrity checks.
//!
//! Walks every table and decodes every record so that corruption shows up
//! in a report instead of as a failure in the middle of a mutation.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use tronguard_store::{
    AssociationRecord, BlacklistEntry, ComboEntry, PolicyConfig, VoteRecord, WhitelistEntry,
};

use crate::environment::{
    Databases, ASSOCIATIONS_DB, BLACKLIST_DB, COMBOS_DB, META_DB, VOTES_DB, WHITELIST_DB,
};
use crate::keys::{PAIR_KEY_LEN, VOTE_KEY_LEN};
use crate::meta::{get_schema_version, is_known_key};
use crate::view::{decode, POLICY_KEY};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub schema_version: u32,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

fn check_table<T: DeserializeOwned>(
    report: &mut IntegrityReport,
    db: &Database<Bytes, Bytes>,
    name: &'static str,
    txn: &RoTxn,
    key_len: usize,
) -> Result<(), LmdbError> {
    report.databases_checked += 1;
    for result in db.iter(txn)? {
        let (key, val) = match result {
            Ok(kv) => kv,
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to read database '{}': {}", name, e));
                return Ok(());
            }
        };
        report.total_entries += 1;
        if key.len() != key_len {
            report.errors.push(format!(
                "'{}': key of {} bytes, expected {}",
                name,
                key.len(),
                key_len
            ));
        }
        if let Err(e) = decode::<T>(name, val) {
            report.errors.push(e.to_string());
        }
    }
    Ok(())
}

/// Check every table inside one read transaction.
///
/// Undecodable records and malformed keys are recorded in the report rather
/// than causing a hard error.
pub(crate) fn check_integrity(dbs: &Databases, txn: &RoTxn) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let role_key_len = 1 + crate::keys::ADDRESS_LEN;

    check_table::<AssociationRecord>(&mut report, &dbs.associations, ASSOCIATIONS_DB, txn, PAIR_KEY_LEN)?;
    check_table::<BlacklistEntry>(&mut report, &dbs.blacklist, BLACKLIST_DB, txn, role_key_len)?;
    check_table::<WhitelistEntry>(&mut report, &dbs.whitelist, WHITELIST_DB, txn, role_key_len)?;
    check_table::<ComboEntry>(&mut report, &dbs.combos, COMBOS_DB, txn, PAIR_KEY_LEN)?;
    check_table::<VoteRecord>(&mut report, &dbs.votes, VOTES_DB, txn, VOTE_KEY_LEN)?;

    report.databases_checked += 1;
    match get_schema_version(&dbs.meta, txn) {
        Ok(version) => report.schema_version = version,
        Err(e) => report.errors.push(e.to_string()),
    }
    for result in dbs.meta.iter(txn)? {
        let (key, val) = result?;
        report.total_entries += 1;
        if !is_known_key(key) {
            report.errors.push(format!(
                "'{}': unexpected key {}",
                META_DB,
                String::from_utf8_lossy(key)
            ));
        } else if key == POLICY_KEY {
            if let Err(e) = decode::<PolicyConfig>(META_DB, val) {
                report.errors.push(e.to_string());
            }
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent or empty) directory. Returns an
/// error if the directory holds files but `data.mdb` is missing, which
/// suggests the wrong path or a partially deleted environment.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    if !path.is_dir() {
        return Err(format!("{} is not a directory", path.display()));
    }
    if path.join("data.mdb").exists() {
        return Ok(());
    }
    let has_entries = std::fs::read_dir(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?
        .next()
        .is_some();
    if has_entries {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
