//! Application layer: services, session, and save scheduling
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod save;
pub mod services;
pub mod session;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use save::{PersistenceStatus, SaveScheduler};
pub use session::{Command, Outcome, Scene, SceneNode, Session};
