use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{FlatNode, Forest, Link, Node};

/// Arena record pointing back into the borrowed forest.
#[derive(Debug)]
pub struct ArenaNode<'a> {
    /// Station this record indexes
    pub node: &'a Node,
    /// Index of parent record, None for roots
    pub parent: Option<Index>,
    /// Indices of child records, in forest order
    pub children: Vec<Index>,
    /// Distance from the root, roots are 0
    pub depth: usize,
}

/// Indexed view of a forest: id → record with a parent back-reference.
///
/// Ownership stays with the `Forest`; the arena only borrows it, so the
/// view cannot outlive or alias a forest that has since been replaced.
#[derive(Debug)]
pub struct ForestArena<'a> {
    arena: Arena<ArenaNode<'a>>,
    roots: Vec<Index>,
    ids: HashMap<&'a str, Index>,
}

impl<'a> ForestArena<'a> {
    #[instrument(level = "trace", skip(forest))]
    pub fn from_forest(forest: &'a Forest) -> Self {
        let mut view = Self {
            arena: Arena::with_capacity(forest.len()),
            roots: Vec::with_capacity(forest.roots.len()),
            ids: HashMap::new(),
        };

        let mut stack: Vec<(&'a Node, Option<Index>, usize)> = forest
            .roots
            .iter()
            .rev()
            .map(|root| (root, None, 0))
            .collect();

        while let Some((node, parent, depth)) = stack.pop() {
            let idx = view.arena.insert(ArenaNode {
                node,
                parent,
                children: Vec::with_capacity(node.children.len()),
                depth,
            });
            view.ids.insert(node.id.as_str(), idx);

            match parent.and_then(|p| view.arena.get_mut(p)) {
                Some(parent_node) => parent_node.children.push(idx),
                None => view.roots.push(idx),
            }

            // Reverse push keeps children in forest order
            for child in node.children.iter().rev() {
                stack.push((child, Some(idx), depth + 1));
            }
        }

        view
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn index_of(&self, id: &str) -> Option<Index> {
        self.ids.get(id).copied()
    }

    pub fn get_node(&self, idx: Index) -> Option<&ArenaNode<'a>> {
        self.arena.get(idx)
    }

    pub fn get(&self, id: &str) -> Option<&ArenaNode<'a>> {
        self.index_of(id).and_then(|idx| self.arena.get(idx))
    }

    pub fn parent_of(&self, id: &str) -> Option<&'a Node> {
        let record = self.get(id)?;
        record
            .parent
            .and_then(|p| self.arena.get(p))
            .map(|p| p.node)
    }

    /// Ids of the direct children of `id`, in order.
    pub fn child_ids(&self, id: &str) -> Vec<&'a str> {
        self.get(id)
            .map(|record| {
                record
                    .children
                    .iter()
                    .filter_map(|&c| self.arena.get(c))
                    .map(|c| c.node.id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Depth-first pre-order over all trees.
    pub fn iter(&self) -> PreOrderIter<'_, 'a> {
        PreOrderIter::new(self, false)
    }

    /// Pre-order that does not descend below nodes with hidden children.
    pub fn iter_visible(&self) -> PreOrderIter<'_, 'a> {
        PreOrderIter::new(self, true)
    }

    pub fn flatten(&self, respect_hidden: bool) -> Vec<FlatNode> {
        let iter = if respect_hidden {
            self.iter_visible()
        } else {
            self.iter()
        };
        iter.map(|(_, record)| FlatNode {
            id: record.node.id.clone(),
            name: record.node.name.clone(),
            color: record.node.color.clone(),
            depth: record.depth,
            parent_id: record
                .parent
                .and_then(|p| self.arena.get(p))
                .map(|p| p.node.id.clone()),
            children_hidden: record.node.children_hidden,
            child_count: record.children.len(),
        })
        .collect()
    }

    /// Parent→child edges, excluding edges below hidden nodes.
    pub fn visible_links(&self) -> Vec<Link> {
        let arena = &self.arena;
        self.iter_visible()
            .filter(|(_, record)| !record.node.children_hidden)
            .flat_map(move |(_, record)| {
                record
                    .children
                    .iter()
                    .filter_map(move |&c| arena.get(c))
                    .map(move |child| Link::new(record.node.id.as_str(), child.node.id.as_str()))
            })
            .collect()
    }
}

pub struct PreOrderIter<'v, 'a> {
    view: &'v ForestArena<'a>,
    stack: Vec<Index>,
    respect_hidden: bool,
}

impl<'v, 'a> PreOrderIter<'v, 'a> {
    fn new(view: &'v ForestArena<'a>, respect_hidden: bool) -> Self {
        let stack = view.roots.iter().rev().copied().collect();
        Self {
            view,
            stack,
            respect_hidden,
        }
    }
}

impl<'v, 'a> Iterator for PreOrderIter<'v, 'a> {
    type Item = (Index, &'v ArenaNode<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(record) = self.view.arena.get(current) {
                if !(self.respect_hidden && record.node.children_hidden) {
                    // Push children in reverse order for left-to-right traversal
                    for &child in record.children.iter().rev() {
                        self.stack.push(child);
                    }
                }
                return Some((current, record));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // main
    // ├── a
    // │   ├── b
    // │   └── c
    // └── d
    // e
    fn sample() -> Forest {
        Forest::new(vec![
            Node::main_root()
                .with_child(
                    Node::new("a", "A", "red")
                        .with_child(Node::new("b", "B", "red"))
                        .with_child(Node::new("c", "C", "red")),
                )
                .with_child(Node::new("d", "D", "blue")),
            Node::new("e", "E", "green"),
        ])
    }

    fn ids<'v, 'a: 'v>(iter: impl Iterator<Item = (Index, &'v ArenaNode<'a>)>) -> Vec<&'a str> {
        iter.map(|(_, r)| r.node.id.as_str()).collect()
    }

    #[test]
    fn given_forest_when_iterating_preorder_then_depth_first_left_to_right() {
        let forest = sample();
        let view = ForestArena::from_forest(&forest);
        assert_eq!(ids(view.iter()), vec!["main", "a", "b", "c", "d", "e"]);
        assert_eq!(view.len(), 6);
    }

    #[test]
    fn given_hidden_children_when_iterating_visible_then_subtree_skipped() {
        let mut forest = sample();
        forest.find_node_mut("a").unwrap().children_hidden = true;
        let view = ForestArena::from_forest(&forest);
        assert_eq!(ids(view.iter_visible()), vec!["main", "a", "d", "e"]);
        let links = view.visible_links();
        assert_eq!(links, vec![Link::new("main", "a"), Link::new("main", "d")]);
    }

    #[test]
    fn given_nested_node_when_querying_parent_and_children_then_follows_back_references() {
        let forest = sample();
        let view = ForestArena::from_forest(&forest);
        assert_eq!(view.parent_of("b").map(|n| n.id.as_str()), Some("a"));
        assert!(view.parent_of("main").is_none());
        assert_eq!(view.child_ids("a"), vec!["b", "c"]);
    }

    #[test]
    fn given_forest_when_flattening_then_records_depth_and_parent() {
        let forest = sample();
        let view = ForestArena::from_forest(&forest);
        let flat = view.flatten(false);
        let c = flat.iter().find(|f| f.id == "c").unwrap();
        assert_eq!(c.depth, 2);
        assert_eq!(c.parent_id.as_deref(), Some("a"));
        assert_eq!(flat[0].child_count, 2);
    }
}
