//! Structural reparenting: detach to top level and connect under a new parent

use tracing::{debug, instrument, warn};

use crate::application::services::{GraphStore, Operation, UndoEntry, UndoLog};
use crate::application::ApplicationResult;
use crate::domain::{ColorAssigner, CycleDetector, DomainError, ACCENT_COLOR, MAIN_ID};

/// The only place the parent/child structure is rewritten.
///
/// Every call validates against the current forest first, then builds the
/// next forest on a copy and commits it with a single `replace_forest`.
/// A rejected call leaves both the forest and the undo log untouched.
pub struct ReparentService<'s> {
    store: &'s mut GraphStore,
    colors: &'s mut ColorAssigner,
    undo: &'s mut UndoLog,
}

impl<'s> ReparentService<'s> {
    pub fn new(
        store: &'s mut GraphStore,
        colors: &'s mut ColorAssigner,
        undo: &'s mut UndoLog,
    ) -> Self {
        Self {
            store,
            colors,
            undo,
        }
    }

    /// Move `id` (with its subtree) to the end of the top level.
    ///
    /// A node that already is a root keeps its place; the call is still logged.
    #[instrument(level = "debug", skip(self))]
    pub fn detach(&mut self, id: &str) -> ApplicationResult<()> {
        self.store.require(id)?;
        let parent = self.store.find_parent(id).map(|p| p.id.clone());

        let mut next = self.store.forest().clone();
        if parent.is_some() {
            let node = next
                .take_node(id)
                .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
            next.roots.push(node);
        }

        self.commit(Operation::Detach, next);
        debug!(id, from = ?parent, "detached to top level");
        Ok(())
    }

    /// Make `source_id` (with its subtree) the last child of `target_id`.
    #[instrument(level = "debug", skip(self))]
    pub fn connect(&mut self, source_id: &str, target_id: &str) -> ApplicationResult<()> {
        if source_id == target_id {
            return Err(DomainError::InvalidOperation(format!(
                "cannot connect {source_id} to itself"
            ))
            .into());
        }
        if source_id == MAIN_ID {
            return Err(DomainError::InvalidOperation(format!(
                "{MAIN_ID} is a permanent root and cannot be reparented"
            ))
            .into());
        }
        self.store.require(source_id)?;
        let target_color = self.store.require(target_id)?.color.clone();

        if CycleDetector::would_create_cycle(self.store.forest(), source_id, target_id) {
            warn!(source_id, target_id, "connect rejected: cycle");
            return Err(DomainError::Cycle {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
            }
            .into());
        }

        let mut next = self.store.forest().clone();
        // `next` is an owned deep copy, so the moved subtree shares nothing
        // with the forest still held by the store.
        let mut subtree = next
            .take_node(source_id)
            .ok_or_else(|| DomainError::NotFound(source_id.to_string()))?;

        let original_color = subtree.color.clone();
        let new_color = if target_color == ACCENT_COLOR {
            self.colors.next(&self.store.branch_colors())
        } else {
            target_color
        };
        subtree.color = new_color.clone();
        for child in &mut subtree.children {
            child.recolor_matching(&original_color, &new_color);
        }

        let target = next
            .find_node_mut(target_id)
            .ok_or_else(|| DomainError::NotFound(target_id.to_string()))?;
        target.children.push(subtree);

        self.commit(Operation::Connect, next);
        debug!(source_id, target_id, from = %original_color, to = %new_color, "connected");
        Ok(())
    }

    fn commit(&mut self, operation: Operation, next: crate::domain::Forest) {
        let after = next.clone();
        let before = self.store.replace_forest(next);
        self.undo.push(UndoEntry::new(operation, before, after));
    }
}
