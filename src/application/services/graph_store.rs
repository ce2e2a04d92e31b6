//! Canonical owner of the station forest

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::{
    DomainError, DomainResult, FlatNode, Forest, ForestArena, Link, Node, SearchEntry, ACCENT_COLOR,
};

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space pattern"));

/// Holds the forest. `replace_forest` is the only way to change it, so
/// every mutation is an atomic swap of a fully built forest.
#[derive(Debug, Default)]
pub struct GraphStore {
    forest: Forest,
}

impl GraphStore {
    pub fn new(forest: Forest) -> Self {
        Self { forest }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Swap in `next`, returning the forest it replaces.
    #[instrument(level = "debug", skip_all, fields(nodes = next.len()))]
    pub fn replace_forest(&mut self, next: Forest) -> Forest {
        std::mem::replace(&mut self.forest, next)
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.forest.find_node(id)
    }

    /// Like `find_node`, but absence is a `NotFound` error.
    pub fn require(&self, id: &str) -> DomainResult<&Node> {
        self.find_node(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.forest.contains(id)
    }

    pub fn len(&self) -> usize {
        self.forest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    pub fn find_parent(&self, id: &str) -> Option<&Node> {
        ForestArena::from_forest(&self.forest).parent_of(id)
    }

    /// Every node in depth-first pre-order.
    ///
    /// With `respect_hidden`, descendants of nodes whose children are hidden
    /// are left out; they remain in the forest.
    pub fn flatten(&self, respect_hidden: bool) -> Vec<FlatNode> {
        ForestArena::from_forest(&self.forest).flatten(respect_hidden)
    }

    /// Parent→child links of the visible forest.
    pub fn links(&self) -> Vec<Link> {
        ForestArena::from_forest(&self.forest).visible_links()
    }

    /// Colors carried by the top-level branches (roots and children of accent roots).
    pub fn branch_colors(&self) -> HashSet<String> {
        let mut colors = HashSet::new();
        for root in &self.forest.roots {
            if root.color == ACCENT_COLOR {
                colors.extend(root.children.iter().map(|c| c.color.clone()));
            } else {
                colors.insert(root.color.clone());
            }
        }
        colors
    }

    /// All nodes with their notes reduced to plain text, for the search collaborator.
    ///
    /// One pre-order pass, so entries come in `flatten(false)` order.
    pub fn search_corpus(&self) -> Vec<SearchEntry> {
        let mut entries = Vec::with_capacity(self.forest.len());
        self.forest.walk(|node| {
            entries.push(SearchEntry {
                id: node.id.clone(),
                name: node.name.clone(),
                text: strip_markup(&node.notes),
            })
        });
        debug!(entries = entries.len(), "search corpus built");
        entries
    }
}

/// Reduce a rich-text blob to plain, whitespace-normalized text.
pub fn strip_markup(notes: &str) -> String {
    let text = TAG.replace_all(notes, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    SPACE.replace_all(&text, " ").trim().to_string()
}
