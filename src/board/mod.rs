//! Live Board Module
//!
//! Everything the user manipulates between commits.
//!
//! ## Module Structure
//!
//! - `state`: Player/ball positions, possession, token keys
//! - `possession`: Possession detector, collision radii, highlights
//! - `recorder`: Path capture while dragging
//! - `annotation`: Comment boxes, strokes, orientation markers

pub mod state;
pub mod possession;
pub mod recorder;
pub mod annotation;

// Re-export key types
pub use state::{BoardState, PathMap, PlayerIndex, Possession, TokenKey};
pub use possession::{detect_possession, CollisionRadii, PlayerHighlight};
pub use recorder::{PathRecorder, RecorderConfig};
pub use annotation::{Annotation, AnnotationDraft, AnnotationError, AnnotationId, AnnotationLayer};
