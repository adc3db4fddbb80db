//! Feedback/voting processor.
//!
//! Turns button taps into temporary reputation entries. A vote is keyed by
//! `(provider, payment, voter, kind)`. Each entry records the voters it has
//! counted, so a voter raises an entry's `vote_count` at most once no matter
//! how many pairs or feedback kinds reach it. Votes never trigger
//! propagation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use tronguard_store::{
    BlacklistEntry, BlacklistSource, ComboEntry, EntryStatus, ListKind, StoreRead, StoreWrite,
    VoteKind, VoteRecord, WhitelistEntry,
};
use tronguard_types::{ActorId, Reason, Role, Timestamp, TronAddress};

use crate::lifecycle::{active, TemporaryPolicy, VoteBacked};
use crate::ReputationError;

pub const SUCCESS_REASON: &str = "user-reported success";
pub const FAILURE_REASON: &str = "user-reported failure";

/// A user's verdict on one provider/payment pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Succeeded,
    Failed,
    PartialProviderOnly(ListKind),
    PartialPaymentOnly(ListKind),
    /// Withdraw this voter's recent votes on the pair.
    Cancel,
}

impl Feedback {
    /// The stored vote kind, `None` for [`Feedback::Cancel`].
    pub fn vote_kind(&self) -> Option<VoteKind> {
        match *self {
            Feedback::Succeeded => Some(VoteKind::Succeeded),
            Feedback::Failed => Some(VoteKind::Failed),
            Feedback::PartialProviderOnly(list) => Some(VoteKind::PartialProviderOnly(list)),
            Feedback::PartialPaymentOnly(list) => Some(VoteKind::PartialPaymentOnly(list)),
            Feedback::Cancel => None,
        }
    }
}

fn parse_list(s: &str) -> Result<ListKind, String> {
    match s {
        "whitelist" | "white" => Ok(ListKind::Whitelist),
        "blacklist" | "black" => Ok(ListKind::Blacklist),
        other => Err(format!("unknown list: {other}")),
    }
}

impl FromStr for Feedback {
    type Err = String;

    /// Accepts `succeeded`, `failed`, `cancel`, `provider-only:<list>` and
    /// `payment-only:<list>` where `<list>` is `whitelist` or `blacklist`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.split_once(':') {
            Some(("provider-only", list)) => Ok(Feedback::PartialProviderOnly(parse_list(list)?)),
            Some(("payment-only", list)) => Ok(Feedback::PartialPaymentOnly(parse_list(list)?)),
            Some((other, _)) => Err(format!("unknown feedback: {other}")),
            None => match s.as_str() {
                "succeeded" | "success" => Ok(Feedback::Succeeded),
                "failed" | "failure" => Ok(Feedback::Failed),
                "cancel" | "revoke" => Ok(Feedback::Cancel),
                other => Err(format!("unknown feedback: {other}")),
            },
        }
    }
}

/// One entry a vote acts on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "list", rename_all = "snake_case")]
pub enum VoteTarget {
    Blacklist { address: TronAddress, role: Role },
    Whitelist { address: TronAddress, role: Role },
    Combo { provider: TronAddress, payment: TronAddress },
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::Blacklist { address, role } => write!(f, "blacklist {address} ({role})"),
            VoteTarget::Whitelist { address, role } => write!(f, "whitelist {address} ({role})"),
            VoteTarget::Combo { provider, payment } => write!(f, "combo {provider} -> {payment}"),
        }
    }
}

/// The entries touched by a vote of `kind` on a pair.
pub fn targets(kind: VoteKind, provider: &TronAddress, payment: &TronAddress) -> Vec<VoteTarget> {
    let single = |list: ListKind, address: &TronAddress, role: Role| match list {
        ListKind::Whitelist => VoteTarget::Whitelist {
            address: address.clone(),
            role,
        },
        ListKind::Blacklist => VoteTarget::Blacklist {
            address: address.clone(),
            role,
        },
    };
    match kind {
        VoteKind::Succeeded => vec![
            single(ListKind::Whitelist, provider, Role::Provider),
            single(ListKind::Whitelist, payment, Role::Payment),
            VoteTarget::Combo {
                provider: provider.clone(),
                payment: payment.clone(),
            },
        ],
        VoteKind::Failed => vec![
            single(ListKind::Blacklist, provider, Role::Provider),
            single(ListKind::Blacklist, payment, Role::Payment),
        ],
        VoteKind::PartialProviderOnly(list) => vec![single(list, provider, Role::Provider)],
        VoteKind::PartialPaymentOnly(list) => vec![single(list, payment, Role::Payment)],
    }
}

/// What counting a vote did to one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEffect {
    Created,
    Counted { vote_count: u32 },
    Promoted,
    /// This voter is already counted on the entry.
    AlreadyCounted,
    /// An admin or propagated entry is in place; votes leave it alone.
    Untouched,
}

impl TargetEffect {
    /// Whether the entry was written.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            TargetEffect::Created | TargetEffect::Counted { .. } | TargetEffect::Promoted
        )
    }
}

/// What cancelling a vote did to one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevokeEffect {
    Removed,
    Decremented { vote_count: u32 },
    Demoted,
    /// Another of the voter's votes still backs the entry.
    StillBacked,
    Untouched,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Recorded {
        kind: VoteKind,
        effects: Vec<(VoteTarget, TargetEffect)>,
    },
    /// The same voter already cast this vote and it still counts.
    Duplicate { kind: VoteKind },
    Cancelled {
        votes_removed: u32,
        effects: Vec<(VoteTarget, RevokeEffect)>,
    },
}

enum Change<T> {
    Put(T),
    Delete,
    Keep,
}

pub struct FeedbackProcessor {
    policy: TemporaryPolicy,
}

impl FeedbackProcessor {
    pub fn new(policy: TemporaryPolicy) -> Self {
        Self { policy }
    }

    /// Apply one piece of feedback from `voter` inside the caller's write
    /// transaction.
    ///
    /// A voter is counted at most once per entry, however many pairs or
    /// feedback kinds lead to it.
    pub fn cast<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        voter: ActorId,
        provider: &TronAddress,
        payment: &TronAddress,
        feedback: Feedback,
        now: Timestamp,
    ) -> Result<FeedbackOutcome, ReputationError> {
        let Some(kind) = feedback.vote_kind() else {
            return self.cancel(w, voter, provider, payment, now);
        };

        let previous = w.get_vote(provider, payment, voter, kind)?;

        let mut effects = Vec::new();
        for target in targets(kind, provider, payment) {
            let effect = self.count(w, &target, voter, now)?;
            effects.push((target, effect));
        }

        if previous.is_some() && !effects.iter().any(|(_, e)| e.changed()) {
            debug!(voter = %voter, provider = %provider, payment = %payment, kind = %kind, "duplicate vote ignored");
            return Ok(FeedbackOutcome::Duplicate { kind });
        }

        w.put_vote(&VoteRecord {
            voter,
            provider: provider.clone(),
            payment: payment.clone(),
            kind,
            cast_at: now,
        })?;

        info!(
            voter = %voter,
            provider = %provider,
            payment = %payment,
            kind = %kind,
            "vote recorded"
        );
        Ok(FeedbackOutcome::Recorded { kind, effects })
    }

    fn cancel<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        voter: ActorId,
        provider: &TronAddress,
        payment: &TronAddress,
        now: Timestamp,
    ) -> Result<FeedbackOutcome, ReputationError> {
        let votes: Vec<VoteRecord> = w
            .votes_for_pair(provider, payment)?
            .into_iter()
            .filter(|v| v.voter == voter)
            .collect();
        if votes.is_empty() {
            return Err(ReputationError::NoVotesToCancel);
        }
        let revocable: Vec<VoteRecord> = votes
            .into_iter()
            .filter(|v| self.policy.can_revoke(v.cast_at, now))
            .collect();
        if revocable.is_empty() {
            return Err(ReputationError::RevocationWindowClosed);
        }

        for vote in &revocable {
            w.delete_vote(provider, payment, voter, vote.kind)?;
        }

        // What the voter's surviving votes (any pair, any kind) still point at.
        let remaining: Vec<(VoteTarget, Timestamp)> = w
            .iter_votes()?
            .into_iter()
            .filter(|v| v.voter == voter)
            .flat_map(|v| {
                targets(v.kind, &v.provider, &v.payment)
                    .into_iter()
                    .map(move |t| (t, v.cast_at))
            })
            .collect();

        let mut effects: Vec<(VoteTarget, RevokeEffect)> = Vec::new();
        for vote in &revocable {
            for target in targets(vote.kind, provider, payment) {
                if effects.iter().any(|(t, _)| *t == target) {
                    continue;
                }
                let effect = self.uncount(w, &target, voter, &remaining, now)?;
                effects.push((target, effect));
            }
        }

        info!(
            voter = %voter,
            provider = %provider,
            payment = %payment,
            votes = revocable.len(),
            "votes cancelled"
        );
        Ok(FeedbackOutcome::Cancelled {
            votes_removed: revocable.len() as u32,
            effects,
        })
    }

    /// `create` builds a fresh entry with no voters.
    fn tally<T: VoteBacked>(
        &self,
        existing: Option<T>,
        create: impl FnOnce() -> T,
        voter: ActorId,
        now: Timestamp,
    ) -> (Option<T>, TargetEffect) {
        let (mut entry, fresh) = match active(existing, now) {
            None => (create(), true),
            Some(entry) if entry.is_vote_backed() => (entry, false),
            Some(_) => return (None, TargetEffect::Untouched),
        };
        if !entry.add_voter(voter) {
            return (None, TargetEffect::AlreadyCounted);
        }
        if !entry.is_promoted() && self.policy.reaches_promotion(entry.vote_count()) {
            entry.promote();
            return (Some(entry), TargetEffect::Promoted);
        }
        let effect = if fresh {
            TargetEffect::Created
        } else {
            TargetEffect::Counted {
                vote_count: entry.vote_count(),
            }
        };
        (Some(entry), effect)
    }

    fn untally<T: VoteBacked>(
        &self,
        existing: Option<T>,
        voter: ActorId,
        backed_elsewhere: impl Fn(Timestamp) -> bool,
        now: Timestamp,
    ) -> (Change<T>, RevokeEffect) {
        match active(existing, now) {
            Some(mut entry) if entry.is_vote_backed() && entry.counts(voter) => {
                if backed_elsewhere(entry.created_at()) {
                    return (Change::Keep, RevokeEffect::StillBacked);
                }
                entry.remove_voter(voter);
                let count = entry.vote_count();
                if count == 0 {
                    return (Change::Delete, RevokeEffect::Removed);
                }
                if entry.is_promoted() && !self.policy.reaches_promotion(count) {
                    entry.demote(self.policy.expiry(now));
                    (Change::Put(entry), RevokeEffect::Demoted)
                } else {
                    (Change::Put(entry), RevokeEffect::Decremented { vote_count: count })
                }
            }
            _ => (Change::Keep, RevokeEffect::Untouched),
        }
    }

    fn count<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        target: &VoteTarget,
        voter: ActorId,
        now: Timestamp,
    ) -> Result<TargetEffect, ReputationError> {
        let expires_at = Some(self.policy.expiry(now));
        match target {
            VoteTarget::Blacklist { address, role } => {
                let (entry, effect) = self.tally(
                    w.get_blacklist(address, *role)?,
                    || BlacklistEntry {
                        address: address.clone(),
                        role: *role,
                        reason: Reason::truncated(FAILURE_REASON),
                        source: BlacklistSource::Temporary,
                        vote_count: 0,
                        voters: BTreeSet::new(),
                        added_by: Some(voter),
                        created_at: now,
                        expires_at,
                    },
                    voter,
                    now,
                );
                if let Some(entry) = entry {
                    w.put_blacklist(&entry)?;
                }
                Ok(effect)
            }
            VoteTarget::Whitelist { address, role } => {
                let (entry, effect) = self.tally(
                    w.get_whitelist(address, *role)?,
                    || WhitelistEntry {
                        address: address.clone(),
                        role: *role,
                        reason: Reason::truncated(SUCCESS_REASON),
                        status: EntryStatus::Temporary,
                        vote_count: 0,
                        voters: BTreeSet::new(),
                        added_by: Some(voter),
                        created_at: now,
                        expires_at,
                    },
                    voter,
                    now,
                );
                if let Some(entry) = entry {
                    w.put_whitelist(&entry)?;
                }
                Ok(effect)
            }
            VoteTarget::Combo { provider, payment } => {
                let (entry, effect) = self.tally(
                    w.get_combo(provider, payment)?,
                    || ComboEntry {
                        provider: provider.clone(),
                        payment: payment.clone(),
                        reason: Reason::truncated(SUCCESS_REASON),
                        status: EntryStatus::Temporary,
                        vote_count: 0,
                        voters: BTreeSet::new(),
                        added_by: Some(voter),
                        created_at: now,
                        expires_at,
                    },
                    voter,
                    now,
                );
                if let Some(entry) = entry {
                    w.put_combo(&entry)?;
                }
                Ok(effect)
            }
        }
    }

    /// Withdraw `voter` from `target` unless one of their `remaining` votes
    /// was cast during the entry's current lifetime and still points at it.
    fn uncount<W: StoreWrite + ?Sized>(
        &self,
        w: &mut W,
        target: &VoteTarget,
        voter: ActorId,
        remaining: &[(VoteTarget, Timestamp)],
        now: Timestamp,
    ) -> Result<RevokeEffect, ReputationError> {
        let backed_elsewhere = |created_at: Timestamp| {
            remaining
                .iter()
                .any(|(t, cast_at)| t == target && created_at <= *cast_at)
        };
        match target {
            VoteTarget::Blacklist { address, role } => {
                let (change, effect) =
                    self.untally(w.get_blacklist(address, *role)?, voter, backed_elsewhere, now);
                match change {
                    Change::Put(entry) => w.put_blacklist(&entry)?,
                    Change::Delete => {
                        w.delete_blacklist(address, *role)?;
                    }
                    Change::Keep => {}
                }
                Ok(effect)
            }
            VoteTarget::Whitelist { address, role } => {
                let (change, effect) =
                    self.untally(w.get_whitelist(address, *role)?, voter, backed_elsewhere, now);
                match change {
                    Change::Put(entry) => w.put_whitelist(&entry)?,
                    Change::Delete => {
                        w.delete_whitelist(address, *role)?;
                    }
                    Change::Keep => {}
                }
                Ok(effect)
            }
            VoteTarget::Combo { provider, payment } => {
                let (change, effect) =
                    self.untally(w.get_combo(provider, payment)?, voter, backed_elsewhere, now);
                match change {
                    Change::Put(entry) => w.put_combo(&entry)?,
                    Change::Delete => {
                        w.delete_combo(provider, payment)?;
                    }
                    Change::Keep => {}
                }
                Ok(effect)
            }
        }
    }
}

/// Whether `vote` still counts towards at least one active vote-backed
/// entry: the entry lists the voter and was created no later than the vote.
/// A vote that backs nothing can be purged once its revocation window has
/// closed.
pub(crate) fn vote_backs_any<V: StoreRead + ?Sized>(
    r: &V,
    vote: &VoteRecord,
    now: Timestamp,
) -> Result<bool, ReputationError> {
    fn backs<T: VoteBacked>(entry: Option<T>, vote: &VoteRecord, now: Timestamp) -> bool {
        active(entry, now).map_or(false, |e| {
            e.is_vote_backed() && e.counts(vote.voter) && e.created_at() <= vote.cast_at
        })
    }

    for target in targets(vote.kind, &vote.provider, &vote.payment) {
        let backed = match &target {
            VoteTarget::Blacklist { address, role } => {
                backs(r.get_blacklist(address, *role)?, vote, now)
            }
            VoteTarget::Whitelist { address, role } => {
                backs(r.get_whitelist(address, *role)?, vote, now)
            }
            VoteTarget::Combo { provider, payment } => {
                backs(r.get_combo(provider, payment)?, vote, now)
            }
        };
        if backed {
            return Ok(true);
        }
    }
    Ok(false)
}
