use thiserror::Error;

use tronguard_store::StoreError;
use tronguard_types::TypeError;

#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Transient; the whole operation may be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("operation requires an admin caller")]
    Unauthorized,

    #[error("revocation window closed for every vote on this pair")]
    RevocationWindowClosed,

    #[error("no votes to cancel on this pair")]
    NoVotesToCancel,

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<StoreError> for ReputationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(key) => ReputationError::AlreadyExists(key),
            StoreError::NotFound(key) => ReputationError::NotFound(key),
            StoreError::Unavailable(msg) => ReputationError::StorageUnavailable(msg),
            other => ReputationError::Storage(other.to_string()),
        }
    }
}

impl From<TypeError> for ReputationError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::InvalidAddress(addr) => ReputationError::InvalidAddress(addr),
            other => ReputationError::InvalidInput(other.to_string()),
        }
    }
}

impl ReputationError {
    /// Whether retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReputationError::StorageUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_engine_kinds() {
        assert!(matches!(
            ReputationError::from(StoreError::Duplicate("k".into())),
            ReputationError::AlreadyExists(_)
        ));
        assert!(ReputationError::from(StoreError::Unavailable("busy".into())).is_transient());
        assert!(matches!(
            ReputationError::from(StoreError::Corruption("bad page".into())),
            ReputationError::Storage(_)
        ));
    }

    #[test]
    fn type_errors_keep_address_kind() {
        let err = ReputationError::from(TypeError::InvalidAddress("T1".into()));
        assert!(matches!(err, ReputationError::InvalidAddress(_)));
        let err = ReputationError::from(TypeError::ReasonTooLong { len: 2000, max: 1024 });
        assert!(matches!(err, ReputationError::InvalidInput(_)));
    }
}
