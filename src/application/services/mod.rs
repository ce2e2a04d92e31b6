//! Application services
//!
//! Concrete services that mutate the forest. The store owns the forest;
//! the edit and reparent services borrow it for the duration of one
//! command and commit through `GraphStore::replace_forest`.

mod edit;
mod graph_store;
mod reparent;
mod undo;

pub use edit::EditService;
pub use graph_store::{strip_markup, GraphStore};
pub use reparent::ReparentService;
pub use undo::{Operation, UndoEntry, UndoLog};
