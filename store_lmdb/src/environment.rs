//! LMDB environment setup and the transactional store implementation.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::{debug, info};

use tronguard_store::{ReputationStore, StoreError, StoreRead, StoreWrite};

use crate::integrity::{self, IntegrityReport};
use crate::migration::Migrator;
use crate::view::{LmdbReader, LmdbWriter};
use crate::LmdbError;

pub(crate) const ASSOCIATIONS_DB: &str = "associations";
pub(crate) const BLACKLIST_DB: &str = "blacklist";
pub(crate) const WHITELIST_DB: &str = "whitelist";
pub(crate) const COMBOS_DB: &str = "whitelist_combos";
pub(crate) const VOTES_DB: &str = "votes";
pub(crate) const META_DB: &str = "meta";

/// Every named database inside the environment.
pub const DATABASE_NAMES: [&str; 6] = [
    ASSOCIATIONS_DB,
    BLACKLIST_DB,
    WHITELIST_DB,
    COMBOS_DB,
    VOTES_DB,
    META_DB,
];

#[derive(Clone, Copy)]
pub(crate) struct Databases {
    pub(crate) associations: Database<Bytes, Bytes>,
    pub(crate) blacklist: Database<Bytes, Bytes>,
    pub(crate) whitelist: Database<Bytes, Bytes>,
    pub(crate) combos: Database<Bytes, Bytes>,
    pub(crate) votes: Database<Bytes, Bytes>,
    pub(crate) meta: Database<Bytes, Bytes>,
}

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    dbs: Databases,
    path: PathBuf,
    schema_version: u32,
}

fn store_err(e: heed::Error) -> StoreError {
    StoreError::from(LmdbError::from(e))
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// `map_size` is in bytes. Creates the directory and every database
    /// on first use, then brings the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        integrity::check_data_dir(path).map_err(LmdbError::Schema)?;
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the files are not modified by anything else while it is open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let dbs = Databases {
            associations: env.create_database(&mut wtxn, Some(ASSOCIATIONS_DB))?,
            blacklist: env.create_database(&mut wtxn, Some(BLACKLIST_DB))?,
            whitelist: env.create_database(&mut wtxn, Some(WHITELIST_DB))?,
            combos: env.create_database(&mut wtxn, Some(COMBOS_DB))?,
            votes: env.create_database(&mut wtxn, Some(VOTES_DB))?,
            meta: env.create_database(&mut wtxn, Some(META_DB))?,
        };
        wtxn.commit()?;

        let schema_version = Migrator::run(&env, &dbs.meta)?;

        info!(
            path = %path.display(),
            map_size,
            max_dbs,
            schema_version,
            "opened LMDB environment"
        );

        Ok(Self {
            env,
            dbs,
            path: path.to_path_buf(),
            schema_version,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Decode every record of every table and report what fails.
    pub fn check_integrity(&self) -> Result<IntegrityReport, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let report = integrity::check_integrity(&self.dbs, &rtxn)?;
        debug!(
            databases = report.databases_checked,
            entries = report.total_entries,
            errors = report.errors.len(),
            "integrity check finished"
        );
        Ok(report)
    }

    /// Flush the environment to disk.
    pub fn force_sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

impl ReputationStore for LmdbEnvironment {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&dyn StoreRead) -> Result<R, E>,
        E: From<StoreError>,
    {
        let rtxn = self.env.read_txn().map_err(store_err)?;
        let reader = LmdbReader {
            txn: &rtxn,
            dbs: &self.dbs,
        };
        f(&reader)
    }

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut dyn StoreWrite) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut wtxn = self.env.write_txn().map_err(store_err)?;
        let result = {
            let mut writer = LmdbWriter {
                txn: &mut wtxn,
                dbs: &self.dbs,
            };
            f(&mut writer)
        };
        match result {
            Ok(value) => {
                wtxn.commit().map_err(store_err)?;
                Ok(value)
            }
            Err(e) => {
                wtxn.abort();
                Err(e)
            }
        }
    }
}
