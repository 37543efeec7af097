//! Timeline Module
//!
//! - `step`: Immutable step snapshots
//! - `store`: Systems and the commit/seek/truncate operations
//! - `preset`: Built-in read-only demo system

pub mod preset;
pub mod step;
pub mod store;

pub use preset::preset_system;

pub use step::Step;
pub use store::{System, SystemId, TimelineError, TimelineStore};
