//! Tactical Replay Engine
//!
//! - `scheduler`: Frame-driven state machine that animates steps
//! - `events`: Notifications raised while replaying

pub mod events;
pub mod scheduler;

pub use events::ReplayEvent;
pub use scheduler::{FrameResult, ReplayConfig, ReplayError, ReplayScheduler};
