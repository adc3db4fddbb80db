//! Persisted global policy record.

use serde::{Deserialize, Serialize};
use tronguard_types::{ActorId, Timestamp};

/// Process-wide policy toggles, stored as a single record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Whether manual provider blacklisting fans out to associated payments.
    pub association_propagation_enabled: bool,
    pub updated_at: Timestamp,
    pub updated_by: Option<ActorId>,
}
