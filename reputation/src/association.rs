//! Association table and the persisted propagation toggle.

use serde::Serialize;
use tracing::{debug, info, warn};

use tronguard_store::{AssociationRecord, PolicyConfig, StoreError, StoreRead, StoreWrite};
use tronguard_types::{ActorId, Timestamp, TronAddress};

use crate::ReputationError;

/// Result of recording an observed pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Created,
    AlreadyExisted,
}

/// Record `provider → payment` if it is not already known.
///
/// Recording never depends on the propagation toggle.
pub fn record_association<W: StoreWrite + ?Sized>(
    w: &mut W,
    provider: &TronAddress,
    payment: &TronAddress,
    now: Timestamp,
) -> Result<RecordOutcome, ReputationError> {
    let record = AssociationRecord::observed(provider.clone(), payment.clone(), now);
    match w.insert_association(&record) {
        Ok(()) => {
            info!(provider = %provider, payment = %payment, "association recorded");
            Ok(RecordOutcome::Created)
        }
        Err(StoreError::Duplicate(_)) => {
            debug!(provider = %provider, payment = %payment, "association already recorded");
            Ok(RecordOutcome::AlreadyExisted)
        }
        Err(e) => Err(e.into()),
    }
}

/// Current toggle state. A store without a policy record reads as disabled.
pub fn propagation_enabled<V: StoreRead + ?Sized>(r: &V) -> Result<bool, ReputationError> {
    match r.get_policy()? {
        Some(policy) => Ok(policy.association_propagation_enabled),
        None => {
            warn!("propagation toggle record missing, treating propagation as disabled");
            Ok(false)
        }
    }
}

pub fn set_propagation<W: StoreWrite + ?Sized>(
    w: &mut W,
    enabled: bool,
    actor: Option<ActorId>,
    now: Timestamp,
) -> Result<PolicyConfig, ReputationError> {
    let policy = PolicyConfig {
        association_propagation_enabled: enabled,
        updated_at: now,
        updated_by: actor,
    };
    w.put_policy(&policy)?;
    info!(enabled, actor = ?actor, "association propagation toggled");
    Ok(policy)
}

/// Recorded associations of one provider, oldest first.
pub fn associations_for<V: StoreRead + ?Sized>(
    r: &V,
    provider: &TronAddress,
) -> Result<Vec<AssociationRecord>, ReputationError> {
    let mut records = r.associations_for(provider)?;
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.payment.cmp(&b.payment))
    });
    Ok(records)
}
