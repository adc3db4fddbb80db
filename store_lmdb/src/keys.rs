//! Binary key layouts.
//!
//! Every TRON address is exactly 34 bytes, so fixed-offset composite keys
//! sort by their leading address and prefix scans stay exact:
//!
//! - role-scoped tables (`blacklist`, `whitelist`): `role(1) ++ address(34)`
//! - pair tables (`associations`, `whitelist_combos`):
//!   `provider(34) ++ payment(34)`
//! - `votes`: `provider(34) ++ payment(34) ++ voter_be(8) ++ kind(1)`

use tronguard_store::VoteKind;
use tronguard_types::{ActorId, Role, TronAddress};

pub(crate) const ADDRESS_LEN: usize = TronAddress::LEN;
pub(crate) const PAIR_KEY_LEN: usize = ADDRESS_LEN * 2;
pub(crate) const VOTE_KEY_LEN: usize = PAIR_KEY_LEN + 8 + 1;

pub(crate) fn role_key(address: &TronAddress, role: Role) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ADDRESS_LEN);
    key.push(role.as_byte());
    key.extend_from_slice(address.as_bytes());
    key
}

pub(crate) fn pair_key(provider: &TronAddress, payment: &TronAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(PAIR_KEY_LEN);
    key.extend_from_slice(provider.as_bytes());
    key.extend_from_slice(payment.as_bytes());
    key
}

pub(crate) fn vote_key(
    provider: &TronAddress,
    payment: &TronAddress,
    voter: ActorId,
    kind: VoteKind,
) -> Vec<u8> {
    let mut key = pair_key(provider, payment);
    key.extend_from_slice(&voter.to_be_bytes());
    key.push(kind.tag());
    key
}

/// Turn `prefix` into the smallest key greater than every key starting with
/// it. An all-`0xFF` prefix has no such key and is emptied, which callers
/// treat as an unbounded upper end.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.pop() {
        if last < 0xFF {
            prefix.push(last + 1);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tronguard_store::ListKind;

    fn addr(seed: u8) -> TronAddress {
        TronAddress::from_account_id([seed; 20])
    }

    #[test]
    fn key_lengths_are_fixed() {
        assert_eq!(role_key(&addr(1), Role::Provider).len(), 1 + ADDRESS_LEN);
        assert_eq!(pair_key(&addr(1), &addr(2)).len(), PAIR_KEY_LEN);
        let vk = vote_key(
            &addr(1),
            &addr(2),
            ActorId::new(42),
            VoteKind::PartialPaymentOnly(ListKind::Blacklist),
        );
        assert_eq!(vk.len(), VOTE_KEY_LEN);
        assert_eq!(vk[VOTE_KEY_LEN - 1], 6);
    }

    #[test]
    fn role_keys_differ_by_role() {
        let a = addr(3);
        assert_ne!(role_key(&a, Role::Provider), role_key(&a, Role::Payment));
    }

    #[test]
    fn increment_prefix_carries() {
        let mut p = vec![0x01, 0xFF];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x02]);

        let mut p = vec![0xFF, 0xFF];
        increment_prefix(&mut p);
        assert!(p.is_empty());
    }
}
