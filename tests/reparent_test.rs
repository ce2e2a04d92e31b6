//! Integration tests for ReparentService detach/connect
//!
//! Every rejected call must leave the forest and the undo log untouched.

use rstest::rstest;

use stationmap::application::services::{GraphStore, ReparentService, UndoLog};
use stationmap::domain::{ColorAssigner, DomainError, Forest, Node};

struct World {
    store: GraphStore,
    colors: ColorAssigner,
    undo: UndoLog,
}

impl World {
    fn new(forest: Forest) -> Self {
        Self {
            store: GraphStore::new(forest),
            colors: ColorAssigner::seeded(vec!["#111".into(), "#222".into(), "#333".into()], 1),
            undo: UndoLog::default(),
        }
    }

    fn svc(&mut self) -> ReparentService<'_> {
        ReparentService::new(&mut self.store, &mut self.colors, &mut self.undo)
    }
}

/// main → A → B
fn main_a_b() -> Forest {
    Forest::new(vec![Node::main_root().with_child(
        Node::new("A", "A", "#111").with_child(Node::new("B", "B", "#111")),
    )])
}

fn root_ids(forest: &Forest) -> Vec<&str> {
    forest.roots.iter().map(|n| n.id.as_str()).collect()
}

// ============================================================
// connect() rejections
// ============================================================

#[rstest]
#[case("main", "A")]
#[case("main", "B")]
#[case("A", "A")]
#[case("B", "B")]
fn given_main_or_self_loop_when_connect_then_invalid_operation(
    #[case] source: &str,
    #[case] target: &str,
) {
    // Arrange
    let mut world = World::new(main_a_b());

    // Act
    let err = world.svc().connect(source, target).unwrap_err();

    // Assert
    assert!(matches!(
        err.as_domain(),
        Some(DomainError::InvalidOperation(_))
    ));
    assert_eq!(world.store.forest(), &main_a_b());
    assert!(world.undo.is_empty());
}

#[test]
fn given_main_a_b_when_connect_a_under_b_then_cycle_and_unchanged() {
    let mut world = World::new(main_a_b());

    let err = world.svc().connect("A", "B").unwrap_err();

    assert_eq!(
        err.as_domain(),
        Some(&DomainError::Cycle {
            source_id: "A".into(),
            target_id: "B".into()
        })
    );
    assert_eq!(world.store.forest(), &main_a_b());
    assert!(world.undo.is_empty());
}

#[rstest]
#[case("ghost", "A")]
#[case("A", "ghost")]
fn given_unknown_endpoint_when_connect_then_not_found(#[case] source: &str, #[case] target: &str) {
    let mut world = World::new(main_a_b());
    let err = world.svc().connect(source, target).unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::NotFound("ghost".into())));
    assert_eq!(world.store.forest(), &main_a_b());
}

// ============================================================
// detach() / connect() success paths
// ============================================================

#[test]
fn given_main_a_b_when_detach_b_then_b_becomes_root() {
    let mut world = World::new(main_a_b());

    world.svc().detach("B").unwrap();

    let forest = world.store.forest();
    assert_eq!(root_ids(forest), vec!["main", "B"]);
    assert!(forest.find_node("A").unwrap().children.is_empty());
    assert_eq!(world.undo.len(), 1);
}

#[rstest]
#[case("main")]
#[case("X")]
fn given_existing_root_when_detach_then_root_order_kept_and_logged(#[case] id: &str) {
    // Arrange
    let start = Forest::new(vec![
        Node::main_root().with_child(Node::new("A", "A", "#111")),
        Node::new("X", "X", "#222"),
    ]);
    let mut world = World::new(start.clone());

    // Act
    world.svc().detach(id).unwrap();

    // Assert
    assert_eq!(world.store.forest(), &start);
    assert_eq!(root_ids(world.store.forest()), vec!["main", "X"]);
    assert_eq!(world.undo.len(), 1);
}

#[test]
fn given_detached_node_when_connected_back_then_structure_restored() {
    let mut world = World::new(main_a_b());

    world.svc().detach("B").unwrap();
    world.svc().connect("B", "A").unwrap();

    assert_eq!(world.store.forest(), &main_a_b());
    assert_eq!(world.undo.len(), 2);
}

#[test]
fn given_deep_subtree_when_connected_elsewhere_then_whole_subtree_moves() {
    // main → {A → {B → {C}}, D}
    let mut world = World::new(Forest::new(vec![Node::main_root()
        .with_child(
            Node::new("A", "A", "#111")
                .with_child(Node::new("B", "B", "#111").with_child(Node::new("C", "C", "#111"))),
        )
        .with_child(Node::new("D", "D", "#222"))]));

    world.svc().connect("B", "D").unwrap();

    let forest = world.store.forest();
    let d = forest.find_node("D").unwrap();
    assert_eq!(d.children[0].id, "B");
    assert_eq!(d.children[0].children[0].id, "C");
    // Whole subtree took D's color
    assert_eq!(forest.find_node("B").unwrap().color, "#222");
    assert_eq!(forest.find_node("C").unwrap().color, "#222");
    assert_eq!(forest.len(), 5);
    forest.validate().unwrap();
}

#[test]
fn given_detached_branch_when_connected_to_main_then_gets_fresh_palette_color() {
    // #111 is in use by A under main
    let mut world = World::new(Forest::new(vec![
        Node::main_root().with_child(Node::new("A", "A", "#111")),
        Node::new("X", "X", "#111").with_child(Node::new("Y", "Y", "#111")),
    ]));

    world.svc().connect("X", "main").unwrap();

    let x = world.store.find_node("X").unwrap();
    assert_ne!(x.color, "#111");
    assert_eq!(world.store.find_node("Y").unwrap().color, x.color);
}
