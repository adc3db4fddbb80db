//! Observed provider → payment associations.

use serde::{Deserialize, Serialize};
use tronguard_types::{Timestamp, TronAddress};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationSource {
    /// Reported by the chain scraper.
    Observed,
}

/// One observed pairing. Unique per `(provider, payment)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub provider: TronAddress,
    pub payment: TronAddress,
    pub created_at: Timestamp,
    pub source: AssociationSource,
}

impl AssociationRecord {
    pub fn observed(provider: TronAddress, payment: TronAddress, now: Timestamp) -> Self {
        Self {
            provider,
            payment,
            created_at: now,
            source: AssociationSource::Observed,
        }
    }
}
