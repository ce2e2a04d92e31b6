//! Integration tests for the line-oriented shell driving a session

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use stationmap::application::Session;
use stationmap::cli::commands::shell;
use stationmap::config::Settings;
use stationmap::domain::{Forest, Node};
use stationmap::infrastructure::MemoryForestStore;
use stationmap::util::testing;

fn session(store: &Arc<MemoryForestStore>) -> Session {
    testing::init_test_setup();
    Session::open_seeded(store.clone(), &Settings::default(), Instant::now(), 5).unwrap()
}

fn sample() -> Forest {
    Forest::new(vec![
        Node::main_root().with_child(Node::new("A", "Alpha", "#e6194b")),
        Node::new("B", "Beta", "#3cb44b"),
    ])
}

#[test]
fn given_script_when_run_then_commands_applied_in_order() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let mut session = session(&store);
    let script = "\
# comments and blank lines are skipped

connect B A
rename A Central Station
notes B <p>platform  2</p> only
";

    shell(&mut session, Cursor::new(script)).unwrap();

    let a = session.find_node("A").unwrap();
    assert_eq!(a.name, "Central Station");
    assert_eq!(a.children[0].id, "B");
    assert_eq!(session.find_node("B").unwrap().notes, "<p>platform  2</p> only");
    assert_eq!(session.undo_depth(), 3);
}

#[test]
fn given_failing_line_when_run_then_later_lines_still_applied() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let mut session = session(&store);
    let script = "\
connect main A
frobnicate
rename B Beta Two
undo
undo
";

    shell(&mut session, Cursor::new(script)).unwrap();

    // Only the rename was recorded, so the second undo reports an empty log
    assert_eq!(session.find_node("B").unwrap().name, "Beta");
    assert_eq!(session.undo_depth(), 0);
    assert_eq!(session.forest(), &sample());
}

#[test]
fn given_drag_sequence_when_run_then_node_pinned_and_released() {
    let store = Arc::new(MemoryForestStore::with_forest(sample()));
    let mut session = session(&store);

    shell(&mut session, Cursor::new("drag-start B\ndrag-move B 10 10\n")).unwrap();
    assert_eq!(session.layout().pinned(), Some("B"));

    // Far from every station and the removal zone
    shell(&mut session, Cursor::new("drag-end B -5000 -5000\n")).unwrap();
    assert_eq!(session.layout().pinned(), None);
    assert_eq!(session.forest(), &sample());
}
