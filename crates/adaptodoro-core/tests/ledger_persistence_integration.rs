//! Integration tests for ledger persistence across app restarts.

use adaptodoro_core::ledger::snapshot;
use adaptodoro_core::{
    App, Database, EscalationSchedule, ManualClock, MemoryStore, SnapshotStore,
};

fn finish_task<S: SnapshotStore>(app: &mut App<S, ManualClock>, minutes: i64, result: &str) {
    app.start_work();
    app.clock().advance_secs(minutes * 60);
    app.complete_early();
    app.record_completion(result);
}

#[test]
fn ledger_survives_restart_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adaptodoro.db");

    {
        let db = Database::open_at(&path).unwrap();
        let mut app = App::new(db, ManualClock::default(), EscalationSchedule::default());
        finish_task(&mut app, 7, "draft");
        finish_task(&mut app, 60, "");
    }

    let db = Database::open_at(&path).unwrap();
    let app = App::new(db, ManualClock::default(), EscalationSchedule::default());
    let ledger = app.ledger();
    assert_eq!(ledger.history().len(), 2);
    assert_eq!(ledger.history()[0].result, "draft");
    assert_eq!(ledger.history()[1].result, "Task complete");
    assert_eq!(ledger.total_work_minutes(), 67);
    assert_eq!(ledger.total_exp(), 11 + 90);
    assert_eq!(ledger.level(), 2);
}

#[test]
fn reset_all_is_persisted() {
    let store = MemoryStore::new();
    {
        let mut app = App::new(&store, ManualClock::default(), EscalationSchedule::default());
        finish_task(&mut app, 3, "x");
        app.reset_all();
        assert_eq!(app.ledger().level(), 1);
    }
    let app = App::new(&store, ManualClock::default(), EscalationSchedule::default());
    assert!(app.ledger().is_empty());
    assert_eq!(store.writes(), 2);
}

#[test]
fn corrupt_record_starts_empty_without_failing() {
    let store = MemoryStore::with_record("{{{ definitely not json");
    let mut app = App::new(&store, ManualClock::default(), EscalationSchedule::default());
    assert!(app.ledger().is_empty());

    // The next mutation overwrites the corrupt record with a valid one.
    finish_task(&mut app, 2, "ok");
    let restored = snapshot::decode(&store.record().unwrap());
    assert!(restored.is_clean());
    assert_eq!(restored.ledger.total_exp(), 3);
}

#[test]
fn partially_corrupt_record_keeps_good_fields() {
    let store = MemoryStore::with_record(
        r#"{"history":[{"reason":"a","result":"b","datetime":"2024-01-01T00:00:00Z","plannedDuration":5,"actualDuration":4,"expGained":6}],"totalWorkTime":"four","totalExp":6,"level":1}"#,
    );
    let app = App::new(&store, ManualClock::default(), EscalationSchedule::default());
    assert_eq!(app.ledger().history().len(), 1);
    assert_eq!(app.ledger().total_work_minutes(), 0);
    assert_eq!(app.ledger().total_exp(), 6);
}

#[test]
fn well_formed_record_round_trips() {
    let raw = r#"{"history":[{"reason":"call the bank","result":"done","datetime":"2024/5/1 9:30:00","plannedDuration":8,"actualDuration":12,"expGained":18}],"totalWorkTime":12,"totalExp":18,"level":1}"#;
    let store = MemoryStore::with_record(raw);
    let app = App::new(&store, ManualClock::default(), EscalationSchedule::default());
    app.persist().unwrap();

    let before: serde_json::Value = serde_json::from_str(raw).unwrap();
    let after: serde_json::Value = serde_json::from_str(&store.record().unwrap()).unwrap();
    assert_eq!(before, after);
}
