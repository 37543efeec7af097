//! # Tactics Board
//!
//! Basketball set-play authoring and replay: drag ten players and a ball
//! around a court, commit snapshots as steps, and play the steps back as a
//! smooth animation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       TACTICS BOARD                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Pure primitives                          │
//! │  ├── vec2.rs      - 2D position / offset                     │
//! │  ├── geometry.rs  - Polyline length and progress             │
//! │  ├── hash.rs      - Board state hashing                      │
//! │  └── clock.rs     - Millisecond clock                        │
//! │                                                              │
//! │  board/           - Live board                               │
//! │  ├── state.rs     - Positions, possession, token keys        │
//! │  ├── possession.rs- Possession detector, radii, highlights   │
//! │  ├── recorder.rs  - Drag path capture                        │
//! │  └── annotation.rs- Comments, strokes, orientation markers   │
//! │                                                              │
//! │  timeline/        - Committed history                        │
//! │  ├── step.rs      - Step snapshots                           │
//! │  ├── store.rs     - Systems, commit / seek / truncate        │
//! │  └── preset.rs    - Built-in demo system                     │
//! │                                                              │
//! │  replay/          - Tactical replay engine                   │
//! │  ├── scheduler.rs - Frame-driven state machine               │
//! │  └── events.rs    - Replay notifications                     │
//! │                                                              │
//! │  session.rs       - Command surface for the renderer         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Replay is a pure function of the steps and the frame timestamps:
//! - No HashMap (BTreeMap keeps path iteration sorted)
//! - No wall-clock reads inside the scheduler
//! - Every step transition settles on the committed snapshot
//!
//! Replaying a system twice with the same frame timing yields the same
//! [`BoardState::compute_hash`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod board;
pub mod timeline;
pub mod replay;
pub mod session;

// Re-export commonly used types
pub use crate::core::vec2::{Position, Vec2};
pub use board::state::{BoardState, PathMap, PlayerIndex, Possession, TokenKey};
pub use board::possession::CollisionRadii;
pub use timeline::{Step, SystemId, TimelineStore};
pub use replay::{ReplayConfig, ReplayEvent, ReplayScheduler};
pub use session::{SessionConfig, SessionError, TacticsSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Players on the court (two teams of five)
pub const PLAYER_COUNT: usize = 10;
