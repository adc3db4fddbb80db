//! Vote records backing temporary entries.
//!
//! A vote is keyed by `(provider, payment, voter, kind)`; the same voter
//! repeating the same feedback on the same pair maps to the same key, which
//! is what makes voting idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;
use tronguard_types::{ActorId, Timestamp, TronAddress};

/// Which list a single-sided vote targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Whitelist,
    Blacklist,
}

/// The recorded effect of one vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Succeeded,
    Failed,
    PartialProviderOnly(ListKind),
    PartialPaymentOnly(ListKind),
}

impl VoteKind {
    /// Single-byte tag used as the last byte of a vote key.
    pub fn tag(&self) -> u8 {
        match self {
            VoteKind::Succeeded => 1,
            VoteKind::Failed => 2,
            VoteKind::PartialProviderOnly(ListKind::Whitelist) => 3,
            VoteKind::PartialProviderOnly(ListKind::Blacklist) => 4,
            VoteKind::PartialPaymentOnly(ListKind::Whitelist) => 5,
            VoteKind::PartialPaymentOnly(ListKind::Blacklist) => 6,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => VoteKind::Succeeded,
            2 => VoteKind::Failed,
            3 => VoteKind::PartialProviderOnly(ListKind::Whitelist),
            4 => VoteKind::PartialProviderOnly(ListKind::Blacklist),
            5 => VoteKind::PartialPaymentOnly(ListKind::Whitelist),
            6 => VoteKind::PartialPaymentOnly(ListKind::Blacklist),
            _ => return None,
        })
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteKind::Succeeded => f.write_str("succeeded"),
            VoteKind::Failed => f.write_str("failed"),
            VoteKind::PartialProviderOnly(list) => write!(f, "partial_provider_only({list:?})"),
            VoteKind::PartialPaymentOnly(list) => write!(f, "partial_payment_only({list:?})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: ActorId,
    pub provider: TronAddress,
    pub payment: TronAddress,
    pub kind: VoteKind,
    pub cast_at: Timestamp,
}
