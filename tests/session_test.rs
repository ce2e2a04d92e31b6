//! Integration tests for Session: command dispatch, undo, layout gestures, saves

use std::sync::Arc;
use std::time::{Duration, Instant};

use stationmap::application::{Command, Outcome, PersistenceStatus, Session};
use stationmap::config::Settings;
use stationmap::domain::{DomainError, Forest, Node, ACCENT_COLOR, MAIN_ID};
use stationmap::infrastructure::MemoryForestStore;
use stationmap::util::testing;

fn settings() -> Settings {
    Settings {
        save_debounce_ms: 800,
        ..Default::default()
    }
}

/// main → A → B, plus a separate root C
fn sample() -> Forest {
    Forest::new(vec![
        Node::main_root().with_child(
            Node::new("A", "Alpha", "#e6194b").with_child(Node::new("B", "Beta", "#e6194b")),
        ),
        Node::new("C", "Gamma", "#3cb44b"),
    ])
}

fn open(store: &Arc<MemoryForestStore>, t0: Instant) -> Session {
    testing::init_test_setup();
    Session::open_seeded(store.clone(), &settings(), t0, 17).expect("open session")
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ============================================================
// open()
// ============================================================

#[test]
fn given_empty_store_when_open_then_main_root_and_initial_save_pending() {
    let store = Arc::new(MemoryForestStore::new());
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    assert_eq!(session.forest().roots.len(), 1);
    let main = &session.forest().roots[0];
    assert_eq!((main.id.as_str(), main.name.as_str()), (MAIN_ID, "Main"));
    assert_eq!(main.color, ACCENT_COLOR);
    assert!(session.is_save_pending());

    session.poll(t0 + ms(900));
    assert_eq!(store.save_count(), 1);
}

#[test]
fn given_corrupt_document_when_open_then_rejected() {
    let store = Arc::new(MemoryForestStore::with_forest(Forest::new(vec![
        Node::new("x", "X", "#000"),
        Node::new("x", "Y", "#000"),
    ])));
    let err = Session::open(store, &settings(), Instant::now()).unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::CorruptForest(_))));
}

// ============================================================
// dispatch(): mutations and undo
// ============================================================

#[test]
fn given_adds_without_name_when_dispatched_then_station_sequence() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    let first = session.dispatch(Command::Add { name: None }, t0).unwrap();
    let second = session.dispatch(Command::Add { name: None }, t0).unwrap();

    let name_of = |outcome: &Outcome| match outcome {
        Outcome::Created { id } => session.find_node(id).unwrap().name.clone(),
        other => panic!("unexpected outcome {other:?}"),
    };
    assert_eq!(name_of(&first), "Station 1");
    assert_eq!(name_of(&second), "Station 2");
    assert_eq!(session.forest().roots.len(), 4);
}

#[test]
fn given_mutations_when_undone_then_exact_prior_forests_restored() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);
    let original = session.forest().clone();

    session
        .dispatch(Command::Connect { source: "C".into(), target: "B".into() }, t0)
        .unwrap();
    let after_connect = session.forest().clone();
    session
        .dispatch(Command::Rename { id: "A".into(), name: "Renamed".into() }, t0)
        .unwrap();

    session.dispatch(Command::Undo, t0).unwrap();
    assert_eq!(session.forest(), &after_connect);
    session.dispatch(Command::Undo, t0).unwrap();
    assert_eq!(session.forest(), &original);

    let err = session.dispatch(Command::Undo, t0).unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::UndoEmpty));
}

#[test]
fn given_eleven_mutations_when_undoing_then_ten_steps_back_then_empty() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    session
        .dispatch(Command::Rename { id: "C".into(), name: "v1".into() }, t0)
        .unwrap();
    let after_first = session.forest().clone();
    for i in 2..=11 {
        session
            .dispatch(Command::Rename { id: "C".into(), name: format!("v{i}") }, t0)
            .unwrap();
    }
    assert_eq!(session.undo_depth(), 10);

    for _ in 0..10 {
        session.dispatch(Command::Undo, t0).unwrap();
    }
    assert_eq!(session.forest(), &after_first);
    assert!(session.dispatch(Command::Undo, t0).is_err());
}

#[test]
fn given_toggle_when_dispatched_then_hidden_from_scene_and_not_undoable() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    session
        .dispatch(Command::ToggleChildren { id: "A".into() }, t0)
        .unwrap();

    let scene = session.scene();
    assert!(scene.nodes.iter().all(|n| n.id != "B"));
    assert!(scene.links.iter().all(|l| l.target != "B"));
    assert!(session.forest().contains("B"));
    assert_eq!(session.undo_depth(), 0);
}

#[test]
fn given_selected_node_when_removed_then_selection_cleared() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    session
        .dispatch(Command::Select { id: Some("B".into()) }, t0)
        .unwrap();
    assert_eq!(session.selected(), Some("B"));

    session.dispatch(Command::Remove { id: "A".into() }, t0).unwrap();
    assert_eq!(session.selected(), None);
    assert!(!session.forest().contains("B"));
}

// ============================================================
// Drag gestures
// ============================================================

#[test]
fn given_drag_onto_other_node_when_dropped_then_reparented() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);
    // Spread the freshly seeded nodes apart so the drop target is unambiguous
    session.settle(500);
    let target = session.layout().position_of("B").unwrap();

    session.dispatch(Command::DragStart { id: "C".into() }, t0).unwrap();
    session
        .dispatch(Command::DragMove { id: "C".into(), x: target.x + 3.0, y: target.y }, t0)
        .unwrap();
    let outcome = session
        .dispatch(Command::DragEnd { id: "C".into(), x: target.x + 3.0, y: target.y }, t0)
        .unwrap();

    assert_eq!(outcome, Outcome::Changed);
    let b = session.find_node("B").unwrap();
    assert_eq!(b.children[0].id, "C");
    assert_eq!(b.children[0].color, b.color);
}

#[test]
fn given_drag_onto_removal_zone_when_dropped_then_confirmation_requested() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);
    let zone = settings().layout.removal_zone;

    session.dispatch(Command::DragStart { id: "C".into() }, t0).unwrap();
    let outcome = session
        .dispatch(Command::DragEnd { id: "C".into(), x: zone.x, y: zone.y }, t0)
        .unwrap();

    assert_eq!(outcome, Outcome::ConfirmRemoval { id: "C".into() });
    assert!(session.forest().contains("C"));

    session.dispatch(Command::Remove { id: "C".into() }, t0).unwrap();
    assert!(!session.forest().contains("C"));
}

#[test]
fn given_drag_onto_descendant_when_dropped_then_cycle_and_unchanged() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);
    let before = session.forest().clone();
    session.settle(500);
    let b = session.layout().position_of("B").unwrap();

    session.dispatch(Command::DragStart { id: "A".into() }, t0).unwrap();
    let err = session
        .dispatch(Command::DragEnd { id: "A".into(), x: b.x, y: b.y }, t0)
        .unwrap_err();

    assert!(matches!(err.as_domain(), Some(DomainError::Cycle { .. })));
    assert_eq!(session.forest(), &before);
    assert_eq!(session.layout().pinned(), None);
}

#[test]
fn given_drag_move_without_start_when_dispatched_then_invalid_operation() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    let err = session
        .dispatch(Command::DragMove { id: "A".into(), x: 0.0, y: 0.0 }, t0)
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::InvalidOperation(_))
    ));
}

// ============================================================
// Debounced persistence
// ============================================================

#[test]
fn given_burst_of_edits_when_polled_then_single_write_of_last_state() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    session
        .dispatch(Command::Rename { id: "A".into(), name: "one".into() }, t0)
        .unwrap();
    session
        .dispatch(Command::Rename { id: "A".into(), name: "two".into() }, t0 + ms(500))
        .unwrap();

    session.poll(t0 + ms(900));
    assert_eq!(store.save_count(), 0);

    session.tick(t0 + ms(1400));
    assert_eq!(store.save_count(), 1);
    let saved = store.stored().unwrap();
    assert_eq!(saved.find_node("A").unwrap().name, "two");
    // Layout positions travel with the saved document
    assert!(saved.find_node("A").unwrap().position.is_some());
    assert!(matches!(session.status(), PersistenceStatus::Saved { .. }));
}

#[test]
fn given_failing_store_when_saving_then_failed_status_and_local_state_kept() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    store.set_fail_saves(true);
    let t0 = Instant::now();
    let mut session = open(&store, t0);

    session
        .dispatch(Command::Rename { id: "A".into(), name: "kept".into() }, t0)
        .unwrap();
    assert!(session.flush().is_err());
    assert!(matches!(session.status(), PersistenceStatus::Failed { .. }));
    assert_eq!(session.find_node("A").unwrap().name, "kept");
    assert!(!session.is_save_pending());

    // Next mutation schedules a fresh attempt
    store.set_fail_saves(false);
    session
        .dispatch(Command::SetNotes { id: "A".into(), notes: "n".into() }, t0)
        .unwrap();
    session.flush().unwrap();
    assert_eq!(store.save_count(), 1);
}
