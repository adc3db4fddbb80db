use proptest::prelude::*;

use tronguard_nullables::{NullClock, NullStore};
use tronguard_reputation::{Caller, EngineConfig, Feedback, ReputationEngine, Verdict};
use tronguard_store::{BlacklistSource, ListKind};
use tronguard_types::{ActorId, Role, TronAddress};

#[derive(Clone, Debug)]
enum Op {
    Associate(u8, u8),
    Blacklist(u8, Role, bool),
    Unblacklist(u8, Role),
    Whitelist(u8, Role),
    Combo(u8, u8),
    Vote(i64, u8, u8, Feedback),
    Toggle(bool),
    Advance(u64),
    Purge,
}

fn addr(seed: u8) -> TronAddress {
    TronAddress::from_account_id([seed; 20])
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Provider), Just(Role::Payment)]
}

fn feedback() -> impl Strategy<Value = Feedback> {
    prop_oneof![
        Just(Feedback::Succeeded),
        Just(Feedback::Failed),
        Just(Feedback::Cancel),
        Just(Feedback::PartialProviderOnly(ListKind::Blacklist)),
        Just(Feedback::PartialPaymentOnly(ListKind::Whitelist)),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    // A small address space so operations collide often.
    let seed = 1u8..6;
    prop_oneof![
        (seed.clone(), seed.clone()).prop_map(|(p, q)| Op::Associate(p, q)),
        (seed.clone(), role(), any::<bool>()).prop_map(|(a, r, m)| Op::Blacklist(a, r, m)),
        (seed.clone(), role()).prop_map(|(a, r)| Op::Unblacklist(a, r)),
        (seed.clone(), role()).prop_map(|(a, r)| Op::Whitelist(a, r)),
        (seed.clone(), seed.clone()).prop_map(|(p, q)| Op::Combo(p, q)),
        (1i64..5, seed.clone(), seed.clone(), feedback())
            .prop_map(|(v, p, q, f)| Op::Vote(v, p, q, f)),
        any::<bool>().prop_map(Op::Toggle),
        (0u64..100_000).prop_map(Op::Advance),
        Just(Op::Purge),
    ]
}

fn apply(engine: &ReputationEngine<NullStore, NullClock>, clock: &NullClock, op: &Op) {
    let admin = Caller::Admin(ActorId::new(1));
    // Business errors (duplicates, not found, closed windows) are expected
    // outcomes of random sequences and are ignored.
    let _ = match op {
        Op::Associate(p, q) => engine.record_association(&addr(*p), &addr(*q)).map(|_| ()),
        Op::Blacklist(a, r, manual) => {
            let source = if *manual {
                BlacklistSource::Manual
            } else {
                BlacklistSource::Temporary
            };
            engine
                .blacklist_add(admin, &addr(*a), *r, "random", source)
                .map(|_| ())
        }
        Op::Unblacklist(a, r) => engine.blacklist_remove(admin, &addr(*a), *r).map(|_| ()),
        Op::Whitelist(a, r) => engine
            .whitelist_add_single(admin, &addr(*a), *r, "random")
            .map(|_| ()),
        Op::Combo(p, q) => engine
            .whitelist_add_combo(admin, &addr(*p), &addr(*q), "random")
            .map(|_| ()),
        Op::Vote(v, p, q, f) => engine
            .cast(Caller::Regular(ActorId::new(*v)), &addr(*p), &addr(*q), *f)
            .map(|_| ()),
        Op::Toggle(on) => engine.set_propagation(admin, *on),
        Op::Advance(secs) => {
            clock.advance(*secs);
            Ok(())
        }
        Op::Purge => engine.purge_expired(admin).map(|_| ()),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The blacklist source partition always sums to the total.
    #[test]
    fn blacklist_stats_partition(ops in prop::collection::vec(op(), 1..40)) {
        let clock = NullClock::new(1_700_000_000);
        let engine = ReputationEngine::with_clock(NullStore::new(), clock.clone(), &EngineConfig::default());
        for op in &ops {
            apply(&engine, &clock, op);
            let stats = engine.blacklist_stats().unwrap();
            prop_assert_eq!(stats.manual + stats.auto_associated + stats.temporary, stats.total);
        }
    }

    /// The resolver's precedence holds for every pair after any sequence.
    #[test]
    fn resolver_precedence(ops in prop::collection::vec(op(), 1..40), p in 1u8..6, q in 1u8..6) {
        let clock = NullClock::new(1_700_000_000);
        let engine = ReputationEngine::with_clock(NullStore::new(), clock.clone(), &EngineConfig::default());
        for op in &ops {
            apply(&engine, &clock, op);
        }
        let (provider, payment) = (addr(p), addr(q));
        let combo = engine.whitelist_check_combo(&provider, &payment).unwrap();
        let white = engine.whitelist_check_single(&provider, Role::Provider).unwrap().is_some()
            || engine.whitelist_check_single(&payment, Role::Payment).unwrap().is_some();
        let black = engine.blacklist_check(&provider, Role::Provider).unwrap().is_some()
            || engine.blacklist_check(&payment, Role::Payment).unwrap().is_some();

        let verdict = engine.resolve(&provider, &payment).unwrap();
        let expected = match (combo.is_some(), white, black) {
            (true, _, _) => "combo_trusted",
            (false, true, true) => "partially_trusted_with_warning",
            (false, false, true) => "blacklisted",
            (false, true, false) => "single_side_trusted",
            (false, false, false) => "neutral",
        };
        prop_assert_eq!(verdict.name(), expected);
        if let Verdict::ComboTrusted { combo: c } = verdict {
            prop_assert_eq!(Some(c), combo);
        }
    }

    /// Every auto-associated entry traces back to a recorded association
    /// from a provider that is (or was) blacklisted.
    #[test]
    fn auto_entries_have_an_association(ops in prop::collection::vec(op(), 1..40)) {
        let clock = NullClock::new(1_700_000_000);
        let engine = ReputationEngine::with_clock(NullStore::new(), clock.clone(), &EngineConfig::default());
        for op in &ops {
            apply(&engine, &clock, op);
        }
        for entry in engine.blacklist_list(Some(BlacklistSource::AutoAssociated)).unwrap() {
            let reason = entry.reason.as_str().to_string();
            let linked = (1u8..6).any(|p| {
                reason.contains(addr(p).as_str())
                    && engine
                        .associations_for(&addr(p))
                        .unwrap()
                        .iter()
                        .any(|a| a.payment == entry.address)
            });
            prop_assert!(linked, "orphan auto entry {}", entry.address);
        }
    }
}
