//! Replay Scheduler
//!
//! Finite-state machine that animates a system step by step. It never owns
//! time: an external frame source calls [`ReplayScheduler::tick`] once per
//! display refresh with a monotonic millisecond timestamp, and each tick
//! either writes an interpolated board or moves on to the next step pair.
//!
//! ```text
//!            start()                     no successor step
//!   Idle ─────────────► Playing ─────────────────────────► Idle
//!    ▲                   │  ▲
//!    │ stop()            │  │ toggle_pause()
//!    └───────────────────┘  ▼
//!                       Playing (paused)
//! ```
//!
//! Within Playing, each step transition runs through three phases:
//! `Entering` (discrete cuts: comment, annotations, preview), `Preview`
//! (fixed delay while the renderer shows arrows) and `Moving` (timed
//! interpolation). Steps without paths skip straight to the snapshot.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::board::annotation::AnnotationLayer;
use crate::board::possession::{detect_on_board, CollisionRadii};
use crate::board::state::{BoardState, PathMap, PlayerIndex, TokenKey};
use crate::core::geometry::{point_at_index_progress, point_at_progress};
use crate::replay::events::ReplayEvent;
use crate::timeline::step::Step;

/// Shortest allowed step animation.
pub const MIN_STEP_DURATION_MS: f64 = 400.0;

/// Longest allowed step animation.
pub const MAX_STEP_DURATION_MS: f64 = 2000.0;

/// Default step animation.
pub const DEFAULT_STEP_DURATION_MS: f64 = 1200.0;

/// Delay between publishing preview arrows and starting to move.
pub const PREVIEW_DELAY_MS: f64 = 100.0;

/// Replay timing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Duration of one step's interpolation
    pub step_duration_ms: f64,
    /// Wait between preview and movement
    pub preview_delay_ms: f64,
    /// How long the ball waits before a pass leaves a standing holder
    pub pass_delay_ms: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            step_duration_ms: DEFAULT_STEP_DURATION_MS,
            preview_delay_ms: PREVIEW_DELAY_MS,
            pass_delay_ms: 0.0,
        }
    }
}

impl ReplayConfig {
    /// Set the step duration, clamped to the legal range. Returns the value applied.
    pub fn set_step_duration(&mut self, ms: f64) -> f64 {
        self.step_duration_ms = if ms.is_nan() {
            DEFAULT_STEP_DURATION_MS
        } else {
            ms.clamp(MIN_STEP_DURATION_MS, MAX_STEP_DURATION_MS)
        };
        self.step_duration_ms
    }

    /// Set the pass delay. Negative or NaN values mean no delay.
    pub fn set_pass_delay(&mut self, ms: f64) -> f64 {
        self.pass_delay_ms = if ms.is_nan() { 0.0 } else { ms.max(0.0) };
        self.pass_delay_ms
    }
}

/// Replay errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The system has no steps
    #[error("cannot replay an empty timeline")]
    EmptyTimeline,

    /// The command needs a running replay
    #[error("no replay in progress")]
    NotPlaying,
}

/// Outcome of one frame.
#[derive(Debug, Default)]
pub struct FrameResult {
    /// Events raised since the previous frame
    pub events: Vec<ReplayEvent>,
    /// Cursor after this frame (`None` once idle)
    pub cursor: Option<usize>,
    /// Normalized time of the in-flight movement, if any
    pub progress: Option<f64>,
    /// Replay reached the last step during this frame
    pub finished: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Entering,
    Preview { elapsed: f64 },
    Moving { elapsed: f64 },
}

#[derive(Clone, Debug)]
struct Playback {
    cursor: usize,
    phase: Phase,
    paused: bool,
    last_frame_at: Option<f64>,
    /// Time between the last frame and the pause request, credited on resume
    carried_ms: f64,
}

#[derive(Clone, Debug, Default)]
enum ReplayState {
    #[default]
    Idle,
    Playing(Playback),
}

/// Drives a board through a system's steps.
#[derive(Clone, Debug, Default)]
pub struct ReplayScheduler {
    config: ReplayConfig,
    state: ReplayState,
    preview: PathMap,
    pending_events: Vec<ReplayEvent>,
}

impl ReplayScheduler {
    /// Create an idle scheduler.
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active timing.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Mutable timing. Changes apply from the next frame.
    pub fn config_mut(&mut self) -> &mut ReplayConfig {
        &mut self.config
    }

    /// Is a replay running (paused or not)?
    pub fn is_playing(&self) -> bool {
        matches!(self.state, ReplayState::Playing(_))
    }

    /// Is the running replay paused?
    pub fn is_paused(&self) -> bool {
        matches!(&self.state, ReplayState::Playing(pb) if pb.paused)
    }

    /// Step the board currently rests on or animates away from.
    pub fn cursor(&self) -> Option<usize> {
        match &self.state {
            ReplayState::Playing(pb) => Some(pb.cursor),
            ReplayState::Idle => None,
        }
    }

    /// Paths of the step being animated into, for arrow drawing.
    pub fn preview(&self) -> &PathMap {
        &self.preview
    }

    /// Begin replaying from step 0.
    ///
    /// Writes step 0 into the board. Restarts if already playing.
    pub fn start(&mut self, steps: &[Step], board: &mut BoardState) -> Result<(), ReplayError> {
        let first = steps.first().ok_or(ReplayError::EmptyTimeline)?;
        first.apply_to(board);
        self.preview.clear();
        self.state = ReplayState::Playing(Playback {
            cursor: 0,
            phase: Phase::Entering,
            paused: false,
            last_frame_at: None,
            carried_ms: 0.0,
        });
        self.push_event(ReplayEvent::Started { step_count: steps.len() });
        debug!(steps = steps.len(), "replay started");
        Ok(())
    }

    /// Flip the paused flag at `now_ms`. Returns the new value.
    ///
    /// Elapsed time is frozen while paused. Time between the last frame and
    /// the pause request still counts: it is credited to the first frame
    /// after resuming, and the wall-clock gap of the pause is not.
    pub fn toggle_pause(&mut self, now_ms: f64) -> Result<bool, ReplayError> {
        match &mut self.state {
            ReplayState::Playing(pb) => {
                if pb.paused {
                    pb.last_frame_at = (pb.carried_ms > 0.0).then_some(now_ms - pb.carried_ms);
                    pb.carried_ms = 0.0;
                } else {
                    pb.carried_ms = pb
                        .last_frame_at
                        .map_or(0.0, |prev| (now_ms - prev).max(0.0));
                    pb.last_frame_at = None;
                }
                pb.paused = !pb.paused;
                debug!(paused = pb.paused, cursor = pb.cursor, "replay pause toggled");
                Ok(pb.paused)
            }
            ReplayState::Idle => Err(ReplayError::NotPlaying),
        }
    }

    /// Move a paused replay to another step. The in-flight transition is
    /// dropped; resuming animates from `cursor` to its successor.
    pub fn reposition(&mut self, cursor: usize) -> Result<(), ReplayError> {
        match &mut self.state {
            ReplayState::Playing(pb) => {
                pb.cursor = cursor;
                pb.phase = Phase::Entering;
                pb.last_frame_at = None;
                pb.carried_ms = 0.0;
                self.preview.clear();
                Ok(())
            }
            ReplayState::Idle => Err(ReplayError::NotPlaying),
        }
    }

    /// Cancel the replay. The board keeps its last written frame.
    pub fn stop(&mut self) {
        if self.is_playing() {
            debug!("replay stopped");
        }
        self.state = ReplayState::Idle;
        self.preview.clear();
    }

    /// Advance the replay to `now_ms`.
    ///
    /// Does nothing while idle or paused. Time left over after a phase ends
    /// carries into the next phase, so frame pacing does not change where
    /// the board lands.
    pub fn tick(
        &mut self,
        steps: &[Step],
        now_ms: f64,
        board: &mut BoardState,
        radii: CollisionRadii,
    ) -> FrameResult {
        let mut result = FrameResult::default();

        let mut pb = match std::mem::take(&mut self.state) {
            ReplayState::Playing(pb) if !pb.paused => pb,
            other => {
                result.cursor = match &other {
                    ReplayState::Playing(pb) => Some(pb.cursor),
                    ReplayState::Idle => None,
                };
                self.state = other;
                result.events = self.take_events();
                return result;
            }
        };

        let mut budget = match pb.last_frame_at {
            Some(prev) => (now_ms - prev).max(0.0),
            None => 0.0,
        };
        pb.last_frame_at = Some(now_ms);

        loop {
            match pb.phase {
                Phase::Entering => {
                    let index = pb.cursor + 1;
                    let Some(next) = steps.get(index) else {
                        self.finish(board, pb.cursor, &mut result);
                        return result;
                    };

                    board.comment = next.comment.clone();
                    board.annotations = AnnotationLayer::from_vec(next.annotations.clone());
                    self.push_event(ReplayEvent::StepEntered { index });

                    if next.has_paths() {
                        self.preview = next.paths.clone();
                        self.push_event(ReplayEvent::PreviewPublished { index });
                        pb.phase = Phase::Preview { elapsed: 0.0 };
                    } else {
                        // No recorded motion: cut straight to the snapshot.
                        let before = board.possessor();
                        board.players = next.players;
                        board.ball = next.ball;
                        board.possession = detect_on_board(board, radii);
                        if let Some(event) = ReplayEvent::possession_change(before, board.possessor()) {
                            self.push_event(event);
                        }
                        pb.cursor = index;
                        self.push_event(ReplayEvent::StepCompleted { index });
                    }
                }

                Phase::Preview { elapsed } => {
                    let elapsed = elapsed + budget;
                    if elapsed < self.config.preview_delay_ms {
                        pb.phase = Phase::Preview { elapsed };
                        break;
                    }
                    budget = elapsed - self.config.preview_delay_ms;

                    let index = pb.cursor + 1;
                    if let Some(next) = steps.get(index) {
                        for (key, path) in &next.paths {
                            if path.len() == 1 {
                                warn!(%key, index, "single-point path, holding token static");
                            }
                        }
                    }
                    pb.phase = Phase::Moving { elapsed: 0.0 };
                    self.push_event(ReplayEvent::MovementStarted { index });
                }

                Phase::Moving { elapsed } => {
                    let index = pb.cursor + 1;
                    let (Some(current), Some(next)) = (steps.get(pb.cursor), steps.get(index)) else {
                        self.finish(board, pb.cursor, &mut result);
                        return result;
                    };

                    let duration = self.config.step_duration_ms;
                    let total = elapsed + budget;
                    interpolate_frame(board, current, next, total.min(duration), &self.config);

                    if total < duration {
                        pb.phase = Phase::Moving { elapsed: total };
                        result.progress = Some(total / duration);
                        break;
                    }
                    budget = total - duration;

                    // Settle on the committed snapshot.
                    self.preview.clear();
                    let before = board.possessor();
                    board.players = next.players;
                    board.ball = next.ball;
                    board.possession = next.possession;
                    if let Some(event) = ReplayEvent::possession_change(before, board.possessor()) {
                        self.push_event(event);
                    }
                    pb.cursor = index;
                    pb.phase = Phase::Entering;
                    self.push_event(ReplayEvent::StepCompleted { index });
                    #[cfg(feature = "debug-tracing")]
                    tracing::trace!(index, hash = %hex::encode(board.compute_hash()), "step settled");
                }
            }
        }

        result.cursor = Some(pb.cursor);
        self.state = ReplayState::Playing(pb);
        result.events = self.take_events();
        result
    }

    fn finish(&mut self, board: &mut BoardState, last_index: usize, result: &mut FrameResult) {
        board.comment.clear();
        self.preview.clear();
        self.state = ReplayState::Idle;
        self.push_event(ReplayEvent::Finished { last_index });
        debug!(last_index, "replay finished");
        result.finished = true;
        result.cursor = Some(last_index);
        result.events = self.take_events();
    }

    fn push_event(&mut self, event: ReplayEvent) {
        self.pending_events.push(event);
    }

    fn take_events(&mut self) -> Vec<ReplayEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

/// Ball progress for a pass thrown by a standing holder.
///
/// Holds at 0 until `delay` has elapsed, then covers the remaining
/// `duration - delay` linearly.
pub fn pass_progress(elapsed: f64, duration: f64, delay: f64) -> f64 {
    if delay <= 0.0 {
        return (elapsed / duration).clamp(0.0, 1.0);
    }
    if elapsed < delay {
        return 0.0;
    }
    if duration <= delay {
        return 1.0;
    }
    ((elapsed - delay) / (duration - delay)).clamp(0.0, 1.0)
}

/// Write the board for `elapsed_ms` into the `from → to` transition.
///
/// - Players with a path in `to` follow it by sample index; the rest hold
///   their `from` position.
/// - The ball follows its own path by arclength. When the step's holder
///   stands still, the ball waits `pass_delay_ms` first.
/// - Without a ball path, a recorded holder carries the ball at its offset;
///   otherwise the ball holds its `from` position.
pub fn interpolate_frame(
    board: &mut BoardState,
    from: &Step,
    to: &Step,
    elapsed_ms: f64,
    config: &ReplayConfig,
) {
    let duration = config.step_duration_ms;
    let t = (elapsed_ms / duration).clamp(0.0, 1.0);

    for index in PlayerIndex::all() {
        let position = to
            .path(TokenKey::Player(index))
            .and_then(|path| point_at_index_progress(path, t))
            .unwrap_or(from.players[index.get()]);
        board.set_player(index, position);
    }

    let ball_path = to.path(TokenKey::Ball).filter(|path| !path.is_empty());
    board.ball = match (ball_path, to.possession) {
        (Some(path), possession) => {
            let holder_standing = possession
                .is_some_and(|p| !to.token_moved(TokenKey::Player(p.player)));
            let ball_t = if holder_standing {
                pass_progress(elapsed_ms, duration, config.pass_delay_ms)
            } else {
                t
            };
            point_at_progress(path, ball_t).unwrap_or(from.ball)
        }
        (None, Some(possession)) => possession.ball_position(board.player(possession.player)),
        (None, None) => from.ball,
    };
}
