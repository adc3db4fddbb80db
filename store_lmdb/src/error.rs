use heed::MdbError;
use thiserror::Error;

use tronguard_store::StoreError;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("corrupt record in '{db}': {reason}")]
    Corruption { db: &'static str, reason: String },
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Heed(heed::Error::Io(io)) => StoreError::Unavailable(io.to_string()),
            LmdbError::Heed(heed::Error::Mdb(mdb)) => match mdb {
                MdbError::ReadersFull | MdbError::MapFull => {
                    StoreError::Unavailable(mdb.to_string())
                }
                MdbError::Corrupted | MdbError::PageNotFound => {
                    StoreError::Corruption(mdb.to_string())
                }
                other => StoreError::Backend(other.to_string()),
            },
            LmdbError::Heed(other) => StoreError::Backend(other.to_string()),
            LmdbError::Serialization(e) => StoreError::Serialization(e.to_string()),
            LmdbError::Io(e) => StoreError::Unavailable(e.to_string()),
            LmdbError::Schema(msg) => StoreError::Backend(msg),
            e @ LmdbError::Corruption { .. } => StoreError::Corruption(e.to_string()),
        }
    }
}
