//! The `meta` database: schema version and the policy record.
//!
//! The policy record itself is read and written through the store views;
//! this module owns the schema version counter.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use crate::environment::META_DB;
use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Stored schema version, `0` for a database that never recorded one.
pub fn get_schema_version(meta_db: &Database<Bytes, Bytes>, txn: &RoTxn) -> Result<u32, LmdbError> {
    match meta_db.get(txn, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| LmdbError::Corruption {
                db: META_DB,
                reason: format!("schema_version has {} bytes, expected 4", bytes.len()),
            })?;
            Ok(u32::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

pub fn set_schema_version(
    meta_db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn,
    version: u32,
) -> Result<(), LmdbError> {
    meta_db.put(txn, SCHEMA_VERSION_KEY, &version.to_le_bytes())?;
    Ok(())
}

/// Keys the `meta` database is allowed to hold.
pub(crate) fn is_known_key(key: &[u8]) -> bool {
    key == SCHEMA_VERSION_KEY || key == crate::view::POLICY_KEY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys() {
        assert!(is_known_key(b"schema_version"));
        assert!(is_known_key(b"policy"));
        assert!(!is_known_key(b"verified_count"));
    }
}
