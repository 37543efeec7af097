//! Core primitives.
//!
//! Pure, stateless building blocks shared by the board, timeline and replay
//! modules.

pub mod vec2;
pub mod geometry;
pub mod hash;
pub mod clock;

// Re-export core types
pub use vec2::{Vec2, Position};
pub use geometry::{locate_at_progress, path_length, point_at_progress, point_at_index_progress};
pub use hash::{StateHash, StateHasher, compute_state_hash};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
