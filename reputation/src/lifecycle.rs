//! Temporary-entry lifecycle rules.
//!
//! A vote creates an entry with `vote_count = 1` and an expiry one window
//! ahead. Each distinct voter raises the count once; reaching the promotion threshold
//! clears the expiry. Unpromoted entries past their expiry read as absent
//! and are physically removed by the purge.

use std::collections::BTreeSet;

use tronguard_store::{BlacklistEntry, BlacklistSource, ComboEntry, EntryStatus, Expiring, WhitelistEntry};
use tronguard_types::{ActorId, Timestamp};

/// Window lengths and promotion threshold for vote-created entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporaryPolicy {
    pub window_secs: u64,
    pub revocation_window_secs: u64,
    pub promotion_threshold: u32,
}

impl Default for TemporaryPolicy {
    fn default() -> Self {
        Self {
            window_secs: 86_400,
            revocation_window_secs: 86_400,
            promotion_threshold: 3,
        }
    }
}

impl TemporaryPolicy {
    /// Expiry for a temporary entry (re)started at `now`.
    pub fn expiry(&self, now: Timestamp) -> Timestamp {
        now.plus_secs(self.window_secs)
    }

    pub fn reaches_promotion(&self, vote_count: u32) -> bool {
        vote_count >= self.promotion_threshold
    }

    /// Whether a vote cast at `cast_at` may still be cancelled.
    pub fn can_revoke(&self, cast_at: Timestamp, now: Timestamp) -> bool {
        !cast_at.has_expired(self.revocation_window_secs, now)
    }
}

/// `entry` if it exists and has not expired at `now`.
pub fn active<T: Expiring>(entry: Option<T>, now: Timestamp) -> Option<T> {
    entry.filter(|e| e.is_active(now))
}

/// Entries whose existence is owed to votes.
///
/// Admin-added and propagated entries carry `vote_count = 0` and are never
/// touched by voting. On vote-backed entries `vote_count` equals the number
/// of distinct voters recorded in the entry, whatever pairs or feedback
/// kinds they voted through.
pub(crate) trait VoteBacked: Expiring {
    fn vote_count(&self) -> u32;
    fn voters(&self) -> &BTreeSet<ActorId>;
    fn voters_mut(&mut self) -> &mut BTreeSet<ActorId>;
    fn set_vote_count(&mut self, count: u32);
    fn created_at(&self) -> Timestamp;
    fn is_vote_backed(&self) -> bool;
    fn is_promoted(&self) -> bool;
    fn promote(&mut self);
    fn demote(&mut self, expires_at: Timestamp);

    fn counts(&self, voter: ActorId) -> bool {
        self.voters().contains(&voter)
    }

    /// Count `voter` once. Returns `false` if already counted.
    fn add_voter(&mut self, voter: ActorId) -> bool {
        if !self.voters_mut().insert(voter) {
            return false;
        }
        let count = self.voters().len() as u32;
        self.set_vote_count(count);
        true
    }

    /// Returns `false` if `voter` was not counted.
    fn remove_voter(&mut self, voter: ActorId) -> bool {
        if !self.voters_mut().remove(&voter) {
            return false;
        }
        let count = self.voters().len() as u32;
        self.set_vote_count(count);
        true
    }
}

macro_rules! vote_counting {
    () => {
        fn vote_count(&self) -> u32 {
            self.vote_count
        }

        fn voters(&self) -> &BTreeSet<ActorId> {
            &self.voters
        }

        fn voters_mut(&mut self) -> &mut BTreeSet<ActorId> {
            &mut self.voters
        }

        fn set_vote_count(&mut self, count: u32) {
            self.vote_count = count;
        }

        fn created_at(&self) -> Timestamp {
            self.created_at
        }
    };
}

impl VoteBacked for BlacklistEntry {
    vote_counting!();

    fn is_vote_backed(&self) -> bool {
        self.source == BlacklistSource::Temporary && self.vote_count > 0
    }

    // Promoted blacklist entries keep their `temporary` source.
    fn is_promoted(&self) -> bool {
        self.expires_at.is_none()
    }

    fn promote(&mut self) {
        self.expires_at = None;
    }

    fn demote(&mut self, expires_at: Timestamp) {
        self.expires_at = Some(expires_at);
    }
}

impl VoteBacked for WhitelistEntry {
    vote_counting!();

    fn is_vote_backed(&self) -> bool {
        self.vote_count > 0
    }

    fn is_promoted(&self) -> bool {
        self.status == EntryStatus::Permanent
    }

    fn promote(&mut self) {
        self.status = EntryStatus::Permanent;
        self.expires_at = None;
    }

    fn demote(&mut self, expires_at: Timestamp) {
        self.status = EntryStatus::Temporary;
        self.expires_at = Some(expires_at);
    }
}

impl VoteBacked for ComboEntry {
    vote_counting!();

    fn is_vote_backed(&self) -> bool {
        self.vote_count > 0
    }

    fn is_promoted(&self) -> bool {
        self.status == EntryStatus::Permanent
    }

    fn promote(&mut self) {
        self.status = EntryStatus::Permanent;
        self.expires_at = None;
    }

    fn demote(&mut self, expires_at: Timestamp) {
        self.status = EntryStatus::Temporary;
        self.expires_at = Some(expires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revocation_window_boundary() {
        let policy = TemporaryPolicy {
            revocation_window_secs: 100,
            ..Default::default()
        };
        let cast = Timestamp::new(1_000);
        assert!(policy.can_revoke(cast, Timestamp::new(1_099)));
        assert!(!policy.can_revoke(cast, Timestamp::new(1_100)));
    }

    #[test]
    fn active_hides_expired_entries() {
        let entry = ComboEntry {
            provider: tronguard_types::TronAddress::from_account_id([1; 20]),
            payment: tronguard_types::TronAddress::from_account_id([2; 20]),
            reason: Default::default(),
            status: EntryStatus::Temporary,
            vote_count: 1,
            voters: Default::default(),
            added_by: None,
            created_at: Timestamp::new(0),
            expires_at: Some(Timestamp::new(10)),
        };
        assert!(active(Some(entry.clone()), Timestamp::new(9)).is_some());
        assert!(active(Some(entry), Timestamp::new(10)).is_none());
    }

    #[test]
    fn each_voter_counts_once() {
        let mut entry = WhitelistEntry {
            address: tronguard_types::TronAddress::from_account_id([1; 20]),
            role: tronguard_types::Role::Provider,
            reason: Default::default(),
            status: EntryStatus::Temporary,
            vote_count: 0,
            voters: Default::default(),
            added_by: None,
            created_at: Timestamp::new(0),
            expires_at: Some(Timestamp::new(10)),
        };
        assert!(entry.add_voter(ActorId::new(5)));
        assert!(!entry.add_voter(ActorId::new(5)));
        assert!(entry.add_voter(ActorId::new(6)));
        assert_eq!(entry.vote_count, 2);
        assert!(!entry.remove_voter(ActorId::new(7)));
        assert!(entry.remove_voter(ActorId::new(5)));
        assert_eq!(entry.vote_count, 1);
        assert!(entry.counts(ActorId::new(6)));
    }
}
