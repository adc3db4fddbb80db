//! LMDB storage backend for TronGuard.
//!
//! Implements [`tronguard_store::ReputationStore`] using the `heed` LMDB
//! bindings. Each logical table maps to one LMDB database within a single
//! environment; every `write` scope is one LMDB write transaction.

pub mod environment;
pub mod error;
pub mod integrity;
mod keys;
pub mod meta;
pub mod migration;
mod view;

pub use environment::{LmdbEnvironment, DATABASE_NAMES};
pub use error::LmdbError;
pub use integrity::IntegrityReport;
pub use migration::CURRENT_SCHEMA_VERSION;
