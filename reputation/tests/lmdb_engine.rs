use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use tronguard_reputation::{
    backup, Caller, ClearMode, EngineConfig, Feedback, ReputationEngine, ReputationError,
    RestoreMode, Verdict,
};
use tronguard_store::BlacklistSource;
use tronguard_store_lmdb::LmdbEnvironment;
use tronguard_types::{ActorId, Role, TronAddress};

fn addr(seed: u8) -> TronAddress {
    TronAddress::from_account_id([seed; 20])
}

fn admin() -> Caller {
    Caller::Admin(ActorId::new(1))
}

fn open(dir: &TempDir) -> ReputationEngine<Arc<LmdbEnvironment>> {
    let config = EngineConfig::default();
    let env = LmdbEnvironment::open(dir.path(), config.max_dbs, 10 * 1024 * 1024).unwrap();
    ReputationEngine::new(Arc::new(env), &config)
}

#[test]
fn propagation_over_lmdb() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(&dir);
    engine.set_propagation(admin(), true).unwrap();
    engine.record_association(&addr(1), &addr(10)).unwrap();
    engine.record_association(&addr(1), &addr(11)).unwrap();

    let added = engine
        .blacklist_add(admin(), &addr(1), Role::Provider, "scam", BlacklistSource::Manual)
        .unwrap();
    assert_eq!(added.propagated.len(), 2);
    assert!(matches!(
        engine.resolve(&addr(2), &addr(11)).unwrap(),
        Verdict::Blacklisted { .. }
    ));
}

#[test]
fn failed_transaction_rolls_back_on_lmdb() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(&dir);
    engine.record_association(&addr(1), &addr(10)).unwrap();
    let snapshot = engine.backup().unwrap();
    engine.record_association(&addr(2), &addr(11)).unwrap();

    // Fail mode conflicts on the first record; nothing from the snapshot
    // may land.
    let result = engine.restore(admin(), &snapshot, RestoreMode::Fail, false);
    assert!(matches!(result, Err(ReputationError::AlreadyExists(_))));
    assert_eq!(engine.verify(0).unwrap().associations, 2);
}

#[test]
fn concurrent_adds_of_same_key_admit_one() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(open(&dir));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.blacklist_add(
                    Caller::Admin(ActorId::new(i)),
                    &addr(1),
                    Role::Provider,
                    "race",
                    BlacklistSource::Manual,
                )
            })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => ok += 1,
            Err(ReputationError::AlreadyExists(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(engine.blacklist_stats().unwrap().manual, 1);
}

#[test]
fn concurrent_votes_from_distinct_voters_all_count() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(open(&dir));

    let handles: Vec<_> = (10..13)
        .map(|voter| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.cast(
                    Caller::Regular(ActorId::new(voter)),
                    &addr(1),
                    &addr(10),
                    Feedback::Failed,
                )
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let entry = engine.blacklist_check(&addr(1), Role::Provider).unwrap().unwrap();
    assert_eq!(entry.vote_count, 3);
    assert!(entry.expires_at.is_none());
}

#[test]
fn snapshot_file_moves_state_between_stores() {
    let source_dir = tempfile::tempdir().unwrap();
    let source = open(&source_dir);
    source.set_propagation(admin(), true).unwrap();
    source.record_association(&addr(1), &addr(10)).unwrap();
    source
        .blacklist_add(admin(), &addr(1), Role::Provider, "scam", BlacklistSource::Manual)
        .unwrap();
    source
        .whitelist_add_combo(admin(), &addr(2), &addr(11), "pair")
        .unwrap();

    let file_dir = tempfile::tempdir().unwrap();
    let path = file_dir.path().join("backup.json");
    backup::write_snapshot(&path, &source.backup().unwrap()).unwrap();

    let target_dir = tempfile::tempdir().unwrap();
    let target = open(&target_dir);
    let snapshot = backup::read_snapshot(&path).unwrap();
    target.restore(admin(), &snapshot, RestoreMode::Fail, false).unwrap();

    assert!(target.propagation_enabled().unwrap());
    assert_eq!(target.blacklist_stats().unwrap(), source.blacklist_stats().unwrap());
    assert!(matches!(
        target.resolve(&addr(2), &addr(11)).unwrap(),
        Verdict::ComboTrusted { .. }
    ));
}

#[test]
fn clear_all_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = open(&dir);
        engine.set_propagation(admin(), true).unwrap();
        engine.record_association(&addr(1), &addr(10)).unwrap();
        engine
            .blacklist_add(admin(), &addr(1), Role::Provider, "scam", BlacklistSource::Manual)
            .unwrap();
        engine.clear(admin(), ClearMode::All, false, false).unwrap();
    }
    let engine = open(&dir);
    let stats = engine.blacklist_stats().unwrap();
    assert_eq!(stats.auto_associated, 0);
    assert_eq!(stats.manual, 1);
    assert_eq!(engine.verify(0).unwrap().associations, 0);
}
