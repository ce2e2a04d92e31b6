//! Domain entities: stations, the forest that owns them, and derived views

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};

/// Id of the permanent root station.
pub const MAIN_ID: &str = "main";

/// Reserved color of the implicit top root. Never part of the palette.
pub const ACCENT_COLOR: &str = "accent";

/// A point in layout space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A station: titled, colored entry with notes and exclusively owned children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Globally unique, immutable once created
    pub id: String,
    pub name: String,
    /// Palette value, or [`ACCENT_COLOR`] for the top root
    pub color: String,
    /// Opaque rich-text blob, passed through untouched
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub children: Vec<Node>,
    /// Hides descendants from the layout only; they stay in the forest
    #[serde(default)]
    pub children_hidden: bool,
    /// Last persisted layout position. Domain mutations never read it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            notes: String::new(),
            children: Vec::new(),
            children_hidden: false,
            position: None,
        }
    }

    /// Create a node with a fresh UUID v4 id.
    pub fn create(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), name, color)
    }

    /// The permanent root: `main`, accent colored.
    pub fn main_root() -> Self {
        Self::new(MAIN_ID, "Main", ACCENT_COLOR)
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Number of nodes in this subtree, self included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    /// Rewrite `from` to `to` on every node of this subtree holding `from`.
    ///
    /// Walks the subtree structurally; nodes holding other colors are left alone.
    pub fn recolor_matching(&mut self, from: &str, to: &str) {
        if self.color == from {
            self.color = to.to_string();
        }
        for child in &mut self.children {
            child.recolor_matching(from, to);
        }
    }

    /// Pre-order visit of this subtree.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Node)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

/// Ordered collection of root stations forming the whole diagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    pub roots: Vec<Node>,
}

impl Forest {
    pub fn new(roots: Vec<Node>) -> Self {
        Self { roots }
    }

    /// Forest containing only the permanent root.
    pub fn with_main_root() -> Self {
        Self::new(vec![Node::main_root()])
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes across all trees.
    pub fn len(&self) -> usize {
        self.roots.iter().map(Node::subtree_len).sum()
    }

    /// Depth-first search over the whole forest.
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.roots.iter().find_map(|r| r.find(id))
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.roots.iter_mut().find_map(|r| r.find_mut(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    pub fn is_root(&self, id: &str) -> bool {
        self.roots.iter().any(|r| r.id == id)
    }

    /// Remove the node with `id` (and its subtree) from wherever it lives.
    pub fn take_node(&mut self, id: &str) -> Option<Node> {
        take_from(&mut self.roots, id)
    }

    /// Pre-order visit of every node.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a Node)) {
        for root in &self.roots {
            root.walk(&mut visit);
        }
    }

    pub fn walk_mut(&mut self, mut visit: impl FnMut(&mut Node)) {
        for root in &mut self.roots {
            root.walk_mut(&mut visit);
        }
    }

    /// Check the structural invariants: unique ids and `main` only as a root.
    ///
    /// Acyclicity is guaranteed by ownership: a `Node` cannot contain itself.
    pub fn validate(&self) -> DomainResult<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicate = None;
        self.walk(|n| {
            if !seen.insert(n.id.as_str()) && duplicate.is_none() {
                duplicate = Some(n.id.clone());
            }
        });
        if let Some(id) = duplicate {
            return Err(DomainError::CorruptForest(format!("duplicate node id: {id}")));
        }
        if seen.contains(MAIN_ID) && !self.is_root(MAIN_ID) {
            return Err(DomainError::CorruptForest(format!(
                "{MAIN_ID} must be a root"
            )));
        }
        Ok(())
    }
}

fn take_from(nodes: &mut Vec<Node>, id: &str) -> Option<Node> {
    if let Some(pos) = nodes.iter().position(|n| n.id == id) {
        return Some(nodes.remove(pos));
    }
    nodes.iter_mut().find_map(|n| take_from(&mut n.children, id))
}

/// A parent→child edge of the visible forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// One entry of a flattened forest, in depth-first pre-order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatNode {
    pub id: String,
    pub name: String,
    pub color: String,
    pub depth: usize,
    pub parent_id: Option<String>,
    pub children_hidden: bool,
    pub child_count: usize,
}

/// A node prepared for the search collaborator: notes without markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    pub id: String,
    pub name: String,
    pub text: String,
}
