//! Property edits and node lifecycle: add, remove, rename, recolor, notes

use tracing::{debug, instrument};

use crate::application::services::{GraphStore, Operation, UndoEntry, UndoLog};
use crate::application::ApplicationResult;
use crate::domain::{ColorAssigner, DomainError, Forest, Node};

/// Applies non-structural mutations to the forest.
///
/// Same commit protocol as [`super::ReparentService`]: build the next forest
/// on a copy, swap it in, log an undo entry. `toggle_children` is view
/// state and bypasses the undo log.
pub struct EditService<'s> {
    store: &'s mut GraphStore,
    colors: &'s mut ColorAssigner,
    undo: &'s mut UndoLog,
}

impl<'s> EditService<'s> {
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

    /// Append a new root station with a fresh id and a free palette color.
    #[instrument(level = "debug", skip(self))]
    pub fn add_root(&mut self, name: &str) -> ApplicationResult<String> {
        let color = self.colors.next(&self.store.branch_colors());
        let node = Node::create(name, color);
        let id = node.id.clone();

        let mut next = self.store.forest().clone();
        next.roots.push(node);
        self.commit(Operation::Add, next);
        debug!(%id, "station added");
        Ok(id)
    }

    /// Delete `id` together with its whole subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, id: &str) -> ApplicationResult<usize> {
        let mut next = self.store.forest().clone();
        let removed = next
            .take_node(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        let count = removed.subtree_len();
        self.commit(Operation::Remove, next);
        debug!(id, count, "subtree removed");
        Ok(count)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> ApplicationResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidOperation("name must not be empty".into()).into());
        }
        self.update(id, Operation::Rename, |node| node.name = name.to_string())
    }

    /// Set a new color on `id` and on every descendant sharing its old color.
    #[instrument(level = "debug", skip(self))]
    pub fn recolor(&mut self, id: &str, color: &str) -> ApplicationResult<()> {
        let color = color.trim();
        if color.is_empty() {
            return Err(DomainError::InvalidOperation("color must not be empty".into()).into());
        }
        self.update(id, Operation::Recolor, |node| {
            let old = node.color.clone();
            node.recolor_matching(&old, color);
        })
    }

    pub fn set_notes(&mut self, id: &str, notes: &str) -> ApplicationResult<()> {
        self.update(id, Operation::SetNotes, |node| node.notes = notes.to_string())
    }

    /// Flip `children_hidden`; returns the new value. Not undoable.
    pub fn toggle_children(&mut self, id: &str) -> ApplicationResult<bool> {
        let mut next = self.store.forest().clone();
        let node = next
            .find_node_mut(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        node.children_hidden = !node.children_hidden;
        let hidden = node.children_hidden;
        self.store.replace_forest(next);
        debug!(id, hidden, "children visibility toggled");
        Ok(hidden)
    }

    fn update(
        &mut self,
        id: &str,
        operation: Operation,
        apply: impl FnOnce(&mut Node),
    ) -> ApplicationResult<()> {
        let mut next = self.store.forest().clone();
        let node = next
            .find_node_mut(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        apply(node);
        self.commit(operation, next);
        debug!(id, %operation, "station updated");
        Ok(())
    }

    fn commit(&mut self, operation: Operation, next: Forest) {
        let after = next.clone();
        let before = self.store.replace_forest(next);
        self.undo.push(UndoEntry::new(operation, before, after));
    }
}
