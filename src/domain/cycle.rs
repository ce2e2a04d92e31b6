//! Cycle detection for tentative parent→child edges

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use crate::domain::arena::ForestArena;
use crate::domain::entities::Forest;

/// Decides whether a proposed reparenting would close a cycle.
pub struct CycleDetector;

impl CycleDetector {
    /// Would making `source_id` a child of `target_id` create a cycle?
    ///
    /// Builds the child adjacency of the current forest, adds the tentative
    /// edge `target_id → source_id`, and runs a depth-first search from
    /// `source_id`. Reaching a node that is still on the DFS stack means the
    /// new edge closes a loop. The search is iterative; its stack can never
    /// legitimately grow past the node count, so exceeding that bound is
    /// reported as a cycle.
    pub fn would_create_cycle(forest: &Forest, source_id: &str, target_id: &str) -> bool {
        let view = ForestArena::from_forest(forest);
        let mut adjacency: HashMap<&str, Vec<&str>> = view
            .iter()
            .map(|(_, record)| (record.node.id.as_str(), view.child_ids(&record.node.id)))
            .collect();
        adjacency.entry(target_id).or_default().push(source_id);

        let limit = view.len() + 1;
        let mut on_stack: HashSet<&str> = HashSet::new();
        let mut done: HashSet<&str> = HashSet::new();
        // (node, index of next child to explore)
        let mut stack: Vec<(&str, usize)> = vec![(source_id, 0)];
        on_stack.insert(source_id);

        while let Some((node, next)) = stack.last_mut() {
            let children = adjacency.get(*node).map(Vec::as_slice).unwrap_or(&[]);
            match children.get(*next) {
                Some(&child) => {
                    *next += 1;
                    if on_stack.contains(child) {
                        trace!(source_id, target_id, revisited = child, "cycle found");
                        return true;
                    }
                    if done.contains(child) {
                        continue;
                    }
                    if stack.len() >= limit {
                        warn!(source_id, target_id, "cycle search exceeded depth bound");
                        return true;
                    }
                    on_stack.insert(child);
                    stack.push((child, 0));
                }
                None => {
                    let finished = *node;
                    on_stack.remove(finished);
                    done.insert(finished);
                    stack.pop();
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Node;
    use rstest::rstest;

    // main → a → b → c, main → d, e
    fn chain() -> Forest {
        Forest::new(vec![
            Node::main_root()
                .with_child(
                    Node::new("a", "A", "red")
                        .with_child(Node::new("b", "B", "red").with_child(Node::new("c", "C", "red"))),
                )
                .with_child(Node::new("d", "D", "blue")),
            Node::new("e", "E", "green"),
        ])
    }

    #[rstest]
    #[case::parent_under_child("a", "b", true)]
    #[case::ancestor_under_deep_descendant("a", "c", true)]
    #[case::root_under_descendant("main", "c", true)]
    #[case::self_loop("b", "b", true)]
    #[case::child_under_sibling("b", "d", false)]
    #[case::descendant_under_ancestor("c", "a", false)]
    #[case::into_other_tree("a", "e", false)]
    #[case::other_tree_under_leaf("e", "c", false)]
    fn given_chain_when_checking_edge_then_detects_cycles(
        #[case] source: &str,
        #[case] target: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(CycleDetector::would_create_cycle(&chain(), source, target), expected);
    }

    #[test]
    fn given_unknown_ids_when_checking_then_no_cycle() {
        assert!(!CycleDetector::would_create_cycle(&chain(), "nope", "a"));
        assert!(!CycleDetector::would_create_cycle(&Forest::default(), "x", "y"));
    }

    #[test]
    fn given_very_deep_chain_when_checking_then_does_not_overflow() {
        let mut node = Node::new("n0", "n0", "red");
        for i in 1..2_000 {
            node = Node::new(format!("n{i}"), "n", "red").with_child(node);
        }
        let forest = Forest::new(vec![node]);
        assert!(CycleDetector::would_create_cycle(&forest, "n1999", "n0"));
        assert!(!CycleDetector::would_create_cycle(&forest, "n0", "n1999"));
    }
}
