//! Bounded undo history of forest snapshots

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::domain::{DomainError, DomainResult, Forest};

/// What kind of mutation an undo entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    Rename,
    Recolor,
    SetNotes,
    Detach,
    Connect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Rename => "rename",
            Operation::Recolor => "recolor",
            Operation::SetNotes => "set-notes",
            Operation::Detach => "detach",
            Operation::Connect => "connect",
        };
        f.write_str(name)
    }
}

/// One committed mutation: independent copies of the forest around it.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub operation: Operation,
    pub before: Forest,
    pub after: Forest,
}

impl UndoEntry {
    pub fn new(operation: Operation, before: Forest, after: Forest) -> Self {
        Self {
            operation,
            before,
            after,
        }
    }
}

/// Double-ended log holding at most `capacity` entries; the oldest are evicted.
#[derive(Debug)]
pub struct UndoLog {
    entries: VecDeque<UndoEntry>,
    capacity: usize,
}

impl UndoLog {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: UndoEntry) {
        debug!(operation = %entry.operation, depth = self.entries.len() + 1, "undo entry recorded");
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Remove and return the most recent entry.
    pub fn pop(&mut self) -> DomainResult<UndoEntry> {
        self.entries.pop_back().ok_or(DomainError::UndoEmpty)
    }

    pub fn last_operation(&self) -> Option<Operation> {
        self.entries.back().map(|e| e.operation)
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
