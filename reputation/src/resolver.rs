//! Policy resolver: `(provider, payment) → Verdict`.
//!
//! Precedence, highest first:
//!
//! 1. an active combo for the exact pair,
//! 2. a single-side whitelist together with any blacklist entry,
//! 3. blacklist entries only,
//! 4. a single-side whitelist only,
//! 5. nothing.
//!
//! Resolution only reads. Expired temporary entries are invisible.

use serde::Serialize;

use tronguard_store::{BlacklistEntry, ComboEntry, StoreRead, WhitelistEntry};
use tronguard_types::{Role, Timestamp, TronAddress};

use crate::lifecycle::active;
use crate::ReputationError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The exact pair is endorsed; blacklist state is not surfaced.
    ComboTrusted { combo: ComboEntry },
    /// A whitelisted side plus a blacklist entry on either side.
    PartiallyTrustedWithWarning {
        whitelisted: Vec<WhitelistEntry>,
        blacklisted: Vec<BlacklistEntry>,
    },
    Blacklisted { entries: Vec<BlacklistEntry> },
    SingleSideTrusted { whitelisted: Vec<WhitelistEntry> },
    Neutral,
}

impl Verdict {
    /// Whether the whitelist signal only shows the endorsed side succeeded
    /// with *some* counterpart, not necessarily this one.
    pub fn counterpart_advisory(&self) -> bool {
        matches!(
            self,
            Verdict::PartiallyTrustedWithWarning { .. } | Verdict::SingleSideTrusted { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Verdict::ComboTrusted { .. } => "combo_trusted",
            Verdict::PartiallyTrustedWithWarning { .. } => "partially_trusted_with_warning",
            Verdict::Blacklisted { .. } => "blacklisted",
            Verdict::SingleSideTrusted { .. } => "single_side_trusted",
            Verdict::Neutral => "neutral",
        }
    }
}

/// Resolve the verdict for one pair against the state visible in `r`.
pub fn resolve<V: StoreRead + ?Sized>(
    r: &V,
    provider: &TronAddress,
    payment: &TronAddress,
    now: Timestamp,
) -> Result<Verdict, ReputationError> {
    if let Some(combo) = active(r.get_combo(provider, payment)?, now) {
        return Ok(Verdict::ComboTrusted { combo });
    }

    let whitelisted: Vec<WhitelistEntry> = [
        active(r.get_whitelist(provider, Role::Provider)?, now),
        active(r.get_whitelist(payment, Role::Payment)?, now),
    ]
    .into_iter()
    .flatten()
    .collect();

    let blacklisted: Vec<BlacklistEntry> = [
        active(r.get_blacklist(provider, Role::Provider)?, now),
        active(r.get_blacklist(payment, Role::Payment)?, now),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok(match (whitelisted.is_empty(), blacklisted.is_empty()) {
        (false, false) => Verdict::PartiallyTrustedWithWarning {
            whitelisted,
            blacklisted,
        },
        (true, false) => Verdict::Blacklisted {
            entries: blacklisted,
        },
        (false, true) => Verdict::SingleSideTrusted { whitelisted },
        (true, true) => Verdict::Neutral,
    })
}
