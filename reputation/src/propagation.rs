//! One-directional fan-out of distrust from a provider to its payments.

use tracing::{debug, info};

use tronguard_store::{BlacklistEntry, BlacklistSource, Expiring, StoreWrite};
use tronguard_types::{ActorId, Reason, Role, Timestamp, TronAddress};

use crate::association::propagation_enabled;
use crate::ReputationError;

pub(crate) fn propagated_reason(provider: &TronAddress, reason: &Reason) -> Reason {
    Reason::truncated(format!(
        "associated with blacklisted provider {provider}: {reason}"
    ))
}

/// Blacklist every payment address associated with `provider`.
///
/// Gated by the persisted toggle, read inside the caller's transaction.
/// Payments that already carry an active payment-role entry are skipped,
/// so running this twice changes nothing. Returns the newly blacklisted
/// payment addresses.
pub fn on_provider_blacklisted<W: StoreWrite + ?Sized>(
    w: &mut W,
    provider: &TronAddress,
    reason: &Reason,
    actor: Option<ActorId>,
    now: Timestamp,
) -> Result<Vec<TronAddress>, ReputationError> {
    if !propagation_enabled(&*w)? {
        debug!(provider = %provider, "propagation disabled, no fan-out");
        return Ok(Vec::new());
    }

    let mut propagated = Vec::new();
    for association in w.associations_for(provider)? {
        let payment = association.payment;
        if let Some(existing) = w.get_blacklist(&payment, Role::Payment)? {
            if existing.is_active(now) {
                continue;
            }
            w.delete_blacklist(&payment, Role::Payment)?;
        }
        let entry = BlacklistEntry {
            address: payment.clone(),
            role: Role::Payment,
            reason: propagated_reason(provider, reason),
            source: BlacklistSource::AutoAssociated,
            vote_count: 0,
            voters: Default::default(),
            added_by: actor,
            created_at: now,
            expires_at: None,
        };
        w.insert_blacklist(&entry)?;
        propagated.push(payment);
    }

    info!(
        provider = %provider,
        count = propagated.len(),
        "propagated provider blacklisting to associated payments"
    );
    Ok(propagated)
}
