//! Domain layer: the station forest and the pure algorithms over it
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod cycle;
pub mod entities;
pub mod error;
pub mod palette;

pub use arena::{ArenaNode, ForestArena};
pub use cycle::CycleDetector;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use palette::{ColorAssigner, DEFAULT_PALETTE};
