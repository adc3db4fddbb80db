//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the `meta` database
//! and runs sequential migration steps to bring an older database up to date.

use heed::types::Bytes;
use heed::{Database, Env};

use crate::meta::{get_schema_version, set_schema_version};
use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Runs database migrations to bring the schema up to date.
pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - If the stored version matches `CURRENT_SCHEMA_VERSION`, this is a no-op.
    /// - A stored version *higher* than what this code supports means the
    ///   database was written by a newer release and is refused.
    ///
    /// All steps and the version bump share one write transaction.
    pub fn run(env: &Env, meta_db: &Database<Bytes, Bytes>) -> Result<u32, LmdbError> {
        let mut wtxn = env.write_txn()?;
        let current = get_schema_version(meta_db, &wtxn)?;

        if current == CURRENT_SCHEMA_VERSION {
            wtxn.abort();
            tracing::debug!(version = current, "database schema is up to date");
            return Ok(current);
        }

        if current > CURRENT_SCHEMA_VERSION {
            wtxn.abort();
            return Err(LmdbError::Schema(format!(
                "database schema version {} is newer than supported version {}",
                current, CURRENT_SCHEMA_VERSION
            )));
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(version, version + 1)?;
        }

        set_schema_version(meta_db, &mut wtxn, CURRENT_SCHEMA_VERSION)?;
        wtxn.commit()?;

        tracing::info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(CURRENT_SCHEMA_VERSION)
    }
}

fn run_migration(from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        // Initial schema, nothing to migrate from a blank slate.
        (0, 1) => Ok(()),
        _ => Err(LmdbError::Schema(format!(
            "unknown migration: {} -> {}",
            from, to
        ))),
    }
}
