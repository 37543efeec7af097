//! Replay Events
//!
//! Progress notifications emitted by the scheduler for the rendering layer.

use serde::{Serialize, Deserialize};

use crate::board::state::PlayerIndex;

/// Something that happened during a replay frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Replay began at step 0
    Started {
        /// Number of steps in the system
        step_count: usize,
    },

    /// The next step's comment and annotations were swapped in
    StepEntered {
        /// Step being animated into
        index: usize,
    },

    /// Paths published for the renderer to draw as arrows
    PreviewPublished {
        /// Step the paths belong to
        index: usize,
    },

    /// Interpolation began after the preview delay
    MovementStarted {
        /// Step being animated into
        index: usize,
    },

    /// Board settled on a step; the cursor now points at it
    StepCompleted {
        /// New cursor
        index: usize,
    },

    /// Ball holder changed
    PossessionChanged {
        /// Previous holder
        from: Option<PlayerIndex>,
        /// New holder
        to: Option<PlayerIndex>,
    },

    /// Replay stopped after the last step
    Finished {
        /// Index of the last step
        last_index: usize,
    },
}

impl ReplayEvent {
    /// Possession change event, if the holder actually changed.
    pub fn possession_change(from: Option<PlayerIndex>, to: Option<PlayerIndex>) -> Option<Self> {
        (from != to).then_some(ReplayEvent::PossessionChanged { from, to })
    }
}
