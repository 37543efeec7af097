//! Tactics Session
//!
//! The explicit context object every command flows through. Owns the live
//! board, the timeline, the path recorder and the replay scheduler, and
//! keeps authoring and replay mutually exclusive: while a replay is running
//! (paused or not) authoring commands are refused.
//!
//! A renderer drives the session with two kinds of calls:
//! - commands (`begin_drag`, `commit_step`, `start_replay`, `seek_to`, ...)
//! - `tick(now_ms)` once per display refresh while replaying
//!
//! and reads back [`TacticsSession::view`] to draw.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::board::annotation::{
    Annotation, AnnotationDraft, AnnotationError, AnnotationId, AnnotationIds, AnnotationLayer,
};
use crate::board::possession::{
    detect_on_board, near_ball_flags, player_highlight, CollisionRadii, PlayerHighlight,
};
use crate::board::recorder::{PathRecorder, RecorderConfig};
use crate::board::state::{BoardState, PathMap, PlayerIndex, TokenKey};
use crate::core::clock::{Clock, Millis, SystemClock};
use crate::core::vec2::Position;
use crate::replay::scheduler::{FrameResult, ReplayConfig, ReplayError, ReplayScheduler};
use crate::timeline::preset::preset_system;
use crate::timeline::step::Step;
use crate::timeline::store::{System, SystemId, TimelineError, TimelineStore};
use crate::PLAYER_COUNT;

// =============================================================================
// CONFIG & ERRORS
// =============================================================================

/// Session configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Replay timing
    pub replay: ReplayConfig,
    /// Drag sampling thresholds
    pub recorder: RecorderConfig,
    /// Token radii for possession detection
    pub radii: CollisionRadii,
}

/// Errors returned by session commands. A failed command leaves the
/// session untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Timeline lookup or mutation failed
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Replay control failed
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Annotation edit failed
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// Authoring command issued while a replay is running
    #[error("command not available while a replay is in progress")]
    ReplayInProgress,
}

/// Result type for session commands.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// READ MODEL
// =============================================================================

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    /// Player positions
    pub players: [Position; PLAYER_COUNT],
    /// Ball position
    pub ball: Position,
    /// Ball holder
    pub possessor: Option<PlayerIndex>,
    /// Highlight per player
    pub highlights: [PlayerHighlight; PLAYER_COUNT],
    /// Annotations to draw
    pub annotations: Vec<Annotation>,
    /// Comment text
    pub comment: String,
    /// Seek cursor
    pub cursor: Option<usize>,
    /// Steps in the current system
    pub step_count: usize,
    /// Replay running
    pub playing: bool,
    /// Replay paused
    pub paused: bool,
    /// Arrows to draw for the step being animated into
    pub preview: PathMap,
}

impl BoardView {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Authoring and replay context for one board.
pub struct TacticsSession {
    board: BoardState,
    timeline: TimelineStore,
    recorder: PathRecorder,
    scheduler: ReplayScheduler,
    radii: CollisionRadii,
    cursor: Option<usize>,
    annotation_ids: AnnotationIds,
    clock: Box<dyn Clock>,
    preset: System,
    replaying_preset: bool,
}

impl Default for TacticsSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl TacticsSession {
    /// Create a session on the wall clock.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create a session on a specific clock.
    pub fn with_clock(config: SessionConfig, clock: impl Clock + 'static) -> Self {
        Self {
            board: BoardState::initial(),
            timeline: TimelineStore::new(),
            recorder: PathRecorder::new(config.recorder),
            scheduler: ReplayScheduler::new(config.replay),
            radii: config.radii,
            cursor: None,
            annotation_ids: AnnotationIds::default(),
            clock: Box::new(clock),
            preset: preset_system(),
            replaying_preset: false,
        }
    }

    fn ensure_authoring(&self) -> SessionResult<()> {
        if self.scheduler.is_playing() {
            return Err(SessionError::ReplayInProgress);
        }
        Ok(())
    }

    // =========================================================================
    // Read model
    // =========================================================================

    /// Live board.
    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// All systems and their steps.
    pub fn timeline(&self) -> &TimelineStore {
        &self.timeline
    }

    /// Seek cursor: the step the board was last set from or committed as.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of steps in the current system (0 without one).
    pub fn step_count(&self) -> usize {
        self.timeline
            .current_system()
            .map(|s| s.steps.len())
            .unwrap_or(0)
    }

    /// Step progress as `"i / n"`, 1-based. `None` before the first commit.
    pub fn progress(&self) -> Option<String> {
        let len = self.step_count();
        match self.cursor {
            Some(cursor) if len > 0 => Some(format!("{} / {}", cursor + 1, len)),
            _ => None,
        }
    }

    /// Is a replay running?
    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// Is the replay paused?
    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    /// Preview paths of the step being animated into.
    pub fn preview(&self) -> &PathMap {
        self.scheduler.preview()
    }

    /// Path recorded for a token since the last commit.
    pub fn current_path(&self, key: TokenKey) -> &[Position] {
        self.recorder.current_path(key)
    }

    /// Highlight for one player.
    pub fn player_highlight(&self, index: PlayerIndex) -> PlayerHighlight {
        player_highlight(&self.board, index)
    }

    /// Per-player "near the ball" flags.
    pub fn near_ball(&self) -> [bool; PLAYER_COUNT] {
        near_ball_flags(&self.board)
    }

    /// Active collision radii.
    pub fn radii(&self) -> CollisionRadii {
        self.radii
    }

    /// Active replay timing.
    pub fn replay_config(&self) -> &ReplayConfig {
        self.scheduler.config()
    }

    /// Snapshot of the read model.
    pub fn view(&self) -> BoardView {
        BoardView {
            players: self.board.players,
            ball: self.board.ball,
            possessor: self.board.possessor(),
            highlights: std::array::from_fn(|i| match PlayerIndex::new(i) {
                Some(index) => player_highlight(&self.board, index),
                None => PlayerHighlight::Defense,
            }),
            annotations: self.board.annotations.to_vec(),
            comment: self.board.comment.clone(),
            cursor: self.cursor,
            step_count: self.step_count(),
            playing: self.scheduler.is_playing(),
            paused: self.scheduler.is_paused(),
            preview: self.scheduler.preview().clone(),
        }
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    /// Start dragging a token.
    pub fn begin_drag(&mut self, key: TokenKey) -> SessionResult<()> {
        self.ensure_authoring()?;
        self.recorder.begin_track(key, self.board.token_position(key));
        Ok(())
    }

    /// Move a dragged token. Returns whether the recorder kept the sample.
    ///
    /// The board always follows the pointer. Moving the ball re-runs the
    /// possession detector on accepted samples; moving the ball holder
    /// carries the ball along at its offset.
    pub fn drag_sample(&mut self, key: TokenKey, position: Position, now: Millis) -> SessionResult<bool> {
        self.ensure_authoring()?;
        self.board.set_token_position(key, position);
        let accepted = self.recorder.record_sample(key, position, now);

        match key {
            TokenKey::Ball => {
                if accepted {
                    self.board.possession = detect_on_board(&self.board, self.radii);
                }
            }
            TokenKey::Player(index) => {
                if self.board.possessor() == Some(index) {
                    self.board.pin_ball_to_possessor();
                }
            }
        }
        Ok(accepted)
    }

    /// Release a dragged token. Does not commit.
    pub fn end_drag(&mut self, key: TokenKey) -> SessionResult<()> {
        self.ensure_authoring()?;
        self.recorder.end_track(key, self.board.token_position(key));
        if key.is_ball() {
            self.board.possession = detect_on_board(&self.board, self.radii);
        }
        Ok(())
    }

    /// Snapshot the board and recorded paths as a new step.
    ///
    /// Steps after the cursor are discarded first. Returns the new index.
    pub fn commit_step(&mut self) -> SessionResult<usize> {
        self.ensure_authoring()?;
        let id = self.timeline.current_id()?.clone();

        let mut board = self.board.clone();
        board.possession = detect_on_board(&board, self.radii);
        let step = Step::capture(&board, self.recorder.paths(), self.clock.now_ms());
        let index = self.timeline.commit_step(&id, step, self.cursor)?;

        self.board = board;
        self.board.comment.clear();
        self.recorder.clear_all();
        self.cursor = Some(index);
        Ok(index)
    }

    /// Set the comment attached to the next committed step.
    pub fn set_comment(&mut self, text: impl Into<String>) -> SessionResult<()> {
        self.ensure_authoring()?;
        self.board.comment = text.into();
        Ok(())
    }

    /// Put the board back in its initial layout.
    ///
    /// Stops any replay, clears recorded paths, annotations and comment, and
    /// rewinds the cursor to the first step so the next commit starts over.
    pub fn reset_to_initial(&mut self) {
        self.scheduler.stop();
        self.replaying_preset = false;
        self.board = BoardState::initial();
        self.recorder.clear_all();
        self.cursor = (self.step_count() > 0).then_some(0);
        debug!(cursor = ?self.cursor, "board reset");
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    /// Add an annotation. Anchored comments are placed next to their token.
    pub fn add_annotation(&mut self, draft: AnnotationDraft) -> SessionResult<AnnotationId> {
        self.ensure_authoring()?;
        self.annotation_ids.observe(&self.board.annotations);
        let id = self.annotation_ids.next(self.clock.now_ms());
        let annotation = draft.into_annotation(id, &self.board);
        self.board.annotations.push(annotation);
        Ok(id)
    }

    /// Place an orientation marker on a player.
    pub fn mark_player_orientation(&mut self, index: PlayerIndex, rotation: f64) -> SessionResult<AnnotationId> {
        let position = self.board.player(index);
        self.add_annotation(AnnotationDraft::Orientation { position, rotation })
    }

    /// Replace a comment box's text.
    pub fn update_annotation_text(&mut self, id: AnnotationId, text: impl Into<String>) -> SessionResult<()> {
        self.ensure_authoring()?;
        self.board.annotations.update_text(id, text)?;
        Ok(())
    }

    /// Move an annotation.
    pub fn move_annotation(&mut self, id: AnnotationId, position: Position) -> SessionResult<()> {
        self.ensure_authoring()?;
        self.board.annotations.move_to(id, position)?;
        Ok(())
    }

    /// Delete an annotation.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> SessionResult<Annotation> {
        self.ensure_authoring()?;
        Ok(self.board.annotations.remove(id)?)
    }

    /// Delete the most recent annotation, if any.
    pub fn erase_last_annotation(&mut self) -> SessionResult<Option<Annotation>> {
        self.ensure_authoring()?;
        Ok(self.board.annotations.erase_last())
    }

    /// Annotations on the board.
    pub fn annotations(&self) -> &AnnotationLayer {
        &self.board.annotations
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Replay the current system from step 0.
    pub fn start_replay(&mut self) -> SessionResult<()> {
        let steps = &self.timeline.current_system()?.steps;
        self.scheduler.start(steps, &mut self.board)?;
        self.replaying_preset = false;
        self.recorder.clear_all();
        self.cursor = Some(0);
        info!(steps = steps.len(), "replay requested");
        Ok(())
    }

    /// Replay the built-in preset system.
    ///
    /// The user's systems and seek cursor are left alone; only the board is
    /// written. Frames are driven by [`tick`](Self::tick) as usual.
    pub fn play_preset_system(&mut self) -> SessionResult<()> {
        self.scheduler.start(&self.preset.steps, &mut self.board)?;
        self.replaying_preset = true;
        self.recorder.clear_all();
        info!(steps = self.preset.steps.len(), "preset replay requested");
        Ok(())
    }

    /// Is the running replay the built-in preset?
    pub fn is_replaying_preset(&self) -> bool {
        self.replaying_preset && self.scheduler.is_playing()
    }

    /// Advance the replay to `now_ms`. A no-op frame while idle or paused.
    pub fn tick(&mut self, now_ms: f64) -> FrameResult {
        let steps = if self.replaying_preset {
            self.preset.steps.as_slice()
        } else {
            match self.timeline.current_system() {
                Ok(system) => system.steps.as_slice(),
                Err(_) => {
                    self.scheduler.stop();
                    return FrameResult {
                        cursor: self.cursor,
                        ..FrameResult::default()
                    };
                }
            }
        };
        let mut result = self.scheduler.tick(steps, now_ms, &mut self.board, self.radii);
        if self.replaying_preset {
            // Preset steps do not index the user's timeline.
            result.cursor = self.cursor;
            if result.finished {
                self.replaying_preset = false;
            }
        } else if result.cursor.is_some() {
            self.cursor = result.cursor;
        }
        result
    }

    /// Pause or resume at `now_ms`. Returns the new paused flag.
    pub fn toggle_pause(&mut self, now_ms: f64) -> SessionResult<bool> {
        Ok(self.scheduler.toggle_pause(now_ms)?)
    }

    /// Cancel the replay, leaving the board on its last frame.
    pub fn stop_replay(&mut self) {
        self.scheduler.stop();
        self.replaying_preset = false;
    }

    /// Jump the board to a step without animation.
    ///
    /// Allowed while idle or paused. With `truncate`, every later step is
    /// discarded. A paused replay resumes from the new step.
    pub fn seek_to(&mut self, index: usize, truncate: bool) -> SessionResult<()> {
        if self.scheduler.is_playing() && !self.scheduler.is_paused() {
            return Err(SessionError::ReplayInProgress);
        }
        if self.replaying_preset {
            self.stop_replay();
        }
        let id = self.timeline.current_id()?.clone();
        let step = self.timeline.seek(&id, index)?;
        step.apply_to(&mut self.board);
        if truncate {
            self.timeline.truncate_to(&id, index)?;
        }
        if self.scheduler.is_paused() {
            self.scheduler.reposition(index)?;
        }
        self.recorder.clear_all();
        self.cursor = Some(index);
        debug!(index, truncate, "seek");
        Ok(())
    }

    /// Seek one step back (stays on step 0).
    pub fn previous_step(&mut self) -> SessionResult<usize> {
        let index = self.cursor.map_or(0, |c| c.saturating_sub(1));
        self.seek_to(index, false)?;
        Ok(index)
    }

    /// Seek one step forward.
    pub fn next_step(&mut self) -> SessionResult<usize> {
        let index = self.cursor.map_or(0, |c| c + 1);
        self.seek_to(index, false)?;
        Ok(index)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the per-step replay duration. Returns the clamped value.
    pub fn set_replay_speed(&mut self, ms: f64) -> f64 {
        self.scheduler.config_mut().set_step_duration(ms)
    }

    /// Set the pass delay. Returns the value applied.
    pub fn set_pass_delay(&mut self, ms: f64) -> f64 {
        self.scheduler.config_mut().set_pass_delay(ms)
    }

    /// Pick collision radii for the viewport width.
    pub fn set_viewport_width(&mut self, width: f64) -> CollisionRadii {
        self.radii = CollisionRadii::for_viewport_width(width);
        self.radii
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Add an empty system. Does not select it.
    pub fn create_system(&mut self, label: impl Into<String>) -> SystemId {
        self.timeline.create_system(label)
    }

    /// Switch to another system, landing on its last step.
    pub fn select_system(&mut self, id: &SystemId) -> SessionResult<()> {
        self.ensure_authoring()?;
        self.timeline.select_system(id)?;
        let system = self.timeline.system(id)?;
        if let Some(last) = system.steps.last() {
            last.apply_to(&mut self.board);
        }
        self.cursor = system.last_index();
        self.recorder.clear_all();
        Ok(())
    }

    /// Rename a system.
    pub fn rename_system(&mut self, id: &SystemId, label: impl Into<String>) -> SessionResult<()> {
        Ok(self.timeline.rename_system(id, label)?)
    }

    /// Delete a system. Removing the current one leaves no system selected.
    pub fn remove_system(&mut self, id: &SystemId) -> SessionResult<()> {
        self.ensure_authoring()?;
        let was_current = self.timeline.current_id().ok() == Some(id);
        self.timeline.remove_system(id)?;
        if was_current {
            self.cursor = None;
            self.recorder.clear_all();
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::annotation::{Anchor, PLAYER_ANCHOR_OFFSET};
    use crate::core::clock::ManualClock;
    use crate::core::vec2::Vec2;
    use crate::replay::events::ReplayEvent;
    use crate::timeline::store::MAIN_SYSTEM_ID;

    fn idx(i: usize) -> PlayerIndex {
        PlayerIndex::new(i).unwrap()
    }

    fn session() -> (TacticsSession, ManualClock) {
        let clock = ManualClock::new(1_000);
        (TacticsSession::with_clock(SessionConfig::default(), clock.clone()), clock)
    }

    /// Drag a token along `points`, 40ms apart.
    fn drag(session: &mut TacticsSession, key: TokenKey, points: &[Position]) {
        session.begin_drag(key).unwrap();
        for (i, point) in points.iter().enumerate() {
            session.drag_sample(key, *point, (i as u64 + 1) * 40).unwrap();
        }
        session.end_drag(key).unwrap();
    }

    /// Tick at 16ms until the replay finishes.
    fn play_to_end(session: &mut TacticsSession) -> Vec<ReplayEvent> {
        let mut events = Vec::new();
        let mut now = 0.0;
        for _ in 0..10_000 {
            let result = session.tick(now);
            events.extend(result.events);
            if result.finished {
                return events;
            }
            now += 16.0;
        }
        panic!("replay never finished");
    }

    /// Three steps: start, player 3 cuts, ball passed to player 3.
    fn author_play(session: &mut TacticsSession) {
        session.commit_step().unwrap();
        drag(session, TokenKey::Player(idx(3)), &[
            Position::new(320.0, 50.0),
            Position::new(380.0, 80.0),
            Position::new(420.0, 100.0),
        ]);
        session.commit_step().unwrap();
        drag(session, TokenKey::Ball, &[Position::new(450.0, 150.0), Position::new(430.0, 105.0)]);
        session.set_comment("hit the cutter").unwrap();
        session.commit_step().unwrap();
    }

    #[test]
    fn test_commit_first_step() {
        let (mut session, _) = session();
        assert_eq!(session.progress(), None);
        assert_eq!(session.commit_step(), Ok(0));
        assert_eq!(session.progress().as_deref(), Some("1 / 1"));
        assert_eq!(session.timeline().current_system().unwrap().steps[0].time, 1_000);
    }

    #[test]
    fn test_single_player_move_replay() {
        let (mut session, _) = session();
        let initial = BoardState::initial();
        session.commit_step().unwrap();
        drag(&mut session, TokenKey::Player(idx(3)), &[Position::new(420.0, 100.0)]);
        session.commit_step().unwrap();

        let step = &session.timeline().current_system().unwrap().steps[1];
        assert_eq!(
            step.path(TokenKey::Player(idx(3))),
            Some(&[initial.players[3], Position::new(420.0, 100.0)][..])
        );

        session.start_replay().unwrap();
        assert_eq!(session.board().players[3], initial.players[3]);
        play_to_end(&mut session);

        assert_eq!(session.board().players[3], Position::new(420.0, 100.0));
        for i in (0..PLAYER_COUNT).filter(|i| *i != 3) {
            assert_eq!(session.board().players[i], initial.players[i]);
        }
        assert_eq!(session.cursor(), Some(1));
    }

    #[test]
    fn test_ball_sticks_to_holder() {
        let (mut session, _) = session();

        // Drop the ball onto player 0.
        drag(&mut session, TokenKey::Ball, &[Position::new(60.0, 20.0)]);
        let possession = session.board().possession.unwrap();
        assert_eq!(possession.player, idx(0));
        assert_eq!(possession.offset, Vec2::new(10.0, 5.0));
        session.commit_step().unwrap();

        // Player 0 dribbles; no ball path recorded.
        drag(&mut session, TokenKey::Player(idx(0)), &[
            Position::new(50.0, 60.0),
            Position::new(50.0, 120.0),
            Position::new(50.0, 200.0),
        ]);
        assert_eq!(session.board().ball, Position::new(60.0, 205.0));
        session.commit_step().unwrap();
        assert!(session.current_path(TokenKey::Ball).is_empty());

        session.start_replay().unwrap();
        session.tick(0.0);
        session.tick(100.0);
        session.tick(700.0);
        let board = session.board();
        assert_eq!(board.players[0], Position::new(50.0, 90.0));
        assert_eq!(board.ball, board.players[0] + Vec2::new(10.0, 5.0));
    }

    #[test]
    fn test_seek_then_commit_discards_future() {
        let (mut session, _) = session();
        for i in 0..5 {
            session.set_comment(format!("step {}", i)).unwrap();
            session.commit_step().unwrap();
        }
        session.seek_to(1, false).unwrap();
        assert_eq!(session.board().comment, "step 1");

        session.set_comment("new").unwrap();
        assert_eq!(session.commit_step(), Ok(2));

        let steps = &session.timeline().current_system().unwrap().steps;
        let comments: Vec<_> = steps.iter().map(|s| s.comment.as_str()).collect();
        assert_eq!(comments, vec!["step 0", "step 1", "new"]);
        assert_eq!(session.progress().as_deref(), Some("3 / 3"));
    }

    #[test]
    fn test_seek_out_of_range_is_noop() {
        let (mut session, _) = session();
        session.commit_step().unwrap();
        let before = session.board().compute_hash();
        assert_eq!(
            session.seek_to(4, false),
            Err(SessionError::Timeline(TimelineError::OutOfRange { index: 4, len: 1 }))
        );
        assert_eq!(session.board().compute_hash(), before);
        assert_eq!(session.cursor(), Some(0));
    }

    #[test]
    fn test_seek_with_truncate() {
        let (mut session, _) = session();
        for _ in 0..4 {
            session.commit_step().unwrap();
        }
        session.seek_to(1, true).unwrap();
        assert_eq!(session.step_count(), 2);
    }

    #[test]
    fn test_authoring_rejected_while_replaying() {
        let (mut session, _) = session();
        author_play(&mut session);
        session.start_replay().unwrap();

        let ball = TokenKey::Ball;
        assert_eq!(session.begin_drag(ball), Err(SessionError::ReplayInProgress));
        assert_eq!(
            session.drag_sample(ball, Position::ZERO, 5),
            Err(SessionError::ReplayInProgress)
        );
        assert_eq!(session.commit_step(), Err(SessionError::ReplayInProgress));
        assert_eq!(session.seek_to(0, false), Err(SessionError::ReplayInProgress));

        // Paused still blocks authoring, but seeking is allowed.
        session.toggle_pause(0.0).unwrap();
        assert_eq!(session.commit_step(), Err(SessionError::ReplayInProgress));
        assert_eq!(session.step_count(), 3);
        assert!(session.seek_to(1, false).is_ok());
    }

    #[test]
    fn test_paused_seek_resumes_from_new_step() {
        let (mut session, _) = session();
        author_play(&mut session);
        session.start_replay().unwrap();
        session.tick(0.0);
        session.toggle_pause(10.0).unwrap();

        session.seek_to(1, false).unwrap();
        assert_eq!(session.board().players[3], Position::new(420.0, 100.0));
        assert!(session.preview().is_empty());

        session.toggle_pause(20.0).unwrap();
        let events = play_to_end(&mut session);
        // Only the 1 -> 2 transition remains.
        assert!(events.contains(&ReplayEvent::StepEntered { index: 2 }));
        assert!(!events.contains(&ReplayEvent::StepEntered { index: 1 }));
    }

    #[test]
    fn test_replay_is_idempotent() {
        let (mut session, _) = session();
        author_play(&mut session);
        let last = session.timeline().current_system().unwrap().steps[2].clone();

        session.start_replay().unwrap();
        play_to_end(&mut session);
        let first = session.board().compute_hash();

        session.start_replay().unwrap();
        play_to_end(&mut session);
        let second = session.board().compute_hash();

        assert_eq!(first, second);
        let mut expected = BoardState::initial();
        last.apply_to(&mut expected);
        assert_eq!(first, expected.compute_hash());
        // Comment is cleared at the end of a replay.
        assert!(session.board().comment.is_empty());
    }

    #[test]
    fn test_replay_reports_pass() {
        let (mut session, _) = session();
        author_play(&mut session);
        session.start_replay().unwrap();
        let events = play_to_end(&mut session);

        assert_eq!(events.first(), Some(&ReplayEvent::Started { step_count: 3 }));
        assert!(events.contains(&ReplayEvent::PossessionChanged { from: None, to: Some(idx(3)) }));
        assert_eq!(events.last(), Some(&ReplayEvent::Finished { last_index: 2 }));
    }

    #[test]
    fn test_empty_timeline_cannot_replay() {
        let (mut session, _) = session();
        assert_eq!(
            session.start_replay(),
            Err(SessionError::Replay(ReplayError::EmptyTimeline))
        );
        assert!(!session.is_playing());
    }

    #[test]
    fn test_no_active_system() {
        let (mut session, _) = session();
        session.remove_system(&SystemId::new(MAIN_SYSTEM_ID)).unwrap();
        assert_eq!(
            session.commit_step(),
            Err(SessionError::Timeline(TimelineError::NoActiveSystem))
        );
        assert_eq!(
            session.start_replay(),
            Err(SessionError::Timeline(TimelineError::NoActiveSystem))
        );
        assert_eq!(session.step_count(), 0);
    }

    #[test]
    fn test_stop_and_pause_flags() {
        let (mut session, _) = session();
        author_play(&mut session);
        assert!(session.toggle_pause(0.0).is_err());

        session.start_replay().unwrap();
        assert!(session.is_playing());
        assert_eq!(session.toggle_pause(0.0), Ok(true));
        assert!(session.is_paused());
        session.stop_replay();
        assert!(!session.is_playing());
        assert!(session.begin_drag(TokenKey::Ball).is_ok());
    }

    #[test]
    fn test_reset_to_initial() {
        let (mut session, _) = session();
        author_play(&mut session);
        session.add_annotation(AnnotationDraft::Orientation { position: Position::ZERO, rotation: 90.0 }).unwrap();
        drag(&mut session, TokenKey::Player(idx(1)), &[Position::new(200.0, 300.0)]);

        session.reset_to_initial();
        assert_eq!(session.board().compute_hash(), BoardState::initial().compute_hash());
        assert!(session.annotations().is_empty());
        assert!(session.current_path(TokenKey::Player(idx(1))).is_empty());
        assert_eq!(session.cursor(), Some(0));

        // Next commit restarts the system after step 0.
        session.commit_step().unwrap();
        assert_eq!(session.step_count(), 2);
    }

    #[test]
    fn test_annotations_travel_with_steps() {
        let (mut session, clock) = session();
        let comment = session
            .add_annotation(AnnotationDraft::Comment {
                position: Position::ZERO,
                text: String::new(),
                anchor: Some(Anchor::Player(idx(2))),
            })
            .unwrap();
        clock.advance(5);
        let marker = session.mark_player_orientation(idx(4), 45.0).unwrap();
        assert!(marker > comment);

        match session.annotations().get(comment) {
            Some(Annotation::Comment(c)) => {
                assert_eq!(c.position, BoardState::initial().players[2] + PLAYER_ANCHOR_OFFSET);
                assert_eq!(c.text, "Comment...");
            }
            other => panic!("expected comment, got {:?}", other),
        }
        session.update_annotation_text(comment, "screen here").unwrap();
        assert!(session.update_annotation_text(marker, "nope").is_err());
        session.commit_step().unwrap();

        session.erase_last_annotation().unwrap();
        session.remove_annotation(comment).unwrap();
        assert!(session.annotations().is_empty());
        assert_eq!(
            session.remove_annotation(comment),
            Err(SessionError::Annotation(AnnotationError::NotFound(comment)))
        );

        session.seek_to(0, false).unwrap();
        assert_eq!(session.annotations().len(), 2);
    }

    #[test]
    fn test_systems_switching() {
        let (mut session, _) = session();
        author_play(&mut session);

        let horns = session.create_system("Horns");
        session.select_system(&horns).unwrap();
        assert_eq!(session.cursor(), None);
        assert_eq!(session.step_count(), 0);
        session.commit_step().unwrap();

        session.select_system(&SystemId::new(MAIN_SYSTEM_ID)).unwrap();
        assert_eq!(session.cursor(), Some(2));
        assert_eq!(session.board().players[3], Position::new(420.0, 100.0));
        assert_eq!(session.progress().as_deref(), Some("3 / 3"));

        session.rename_system(&horns, "Horns Flex").unwrap();
        assert_eq!(session.timeline().system(&horns).unwrap().label, "Horns Flex");
    }

    #[test]
    fn test_config_surface() {
        let (mut session, _) = session();
        assert_eq!(session.set_replay_speed(50.0), 400.0);
        assert_eq!(session.replay_config().step_duration_ms, 400.0);
        assert_eq!(session.set_pass_delay(250.0), 250.0);
        assert_eq!(session.set_viewport_width(500.0), CollisionRadii { player: 65.0, ball: 60.0 });
    }

    #[test]
    fn test_view_serializes() {
        let (mut session, _) = session();
        drag(&mut session, TokenKey::Ball, &[Position::new(60.0, 20.0)]);
        let view = session.view();
        assert_eq!(view.possessor, Some(idx(0)));
        assert_eq!(view.highlights[0], PlayerHighlight::WithBall);
        assert_eq!(view.highlights[9], PlayerHighlight::Defense);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["possessor"], 0);
        assert_eq!(json["playing"], false);

        let text = view.to_json().unwrap();
        assert_eq!(BoardView::from_json(&text).unwrap(), view);
        assert!(BoardView::from_json("{}").is_err());
    }

    #[test]
    fn test_ball_release_point_is_committed() {
        let (mut session, _) = session();
        session.commit_step().unwrap();

        session.begin_drag(TokenKey::Ball).unwrap();
        assert_eq!(session.drag_sample(TokenKey::Ball, Position::new(300.0, 250.0), 40), Ok(true));
        // Throttled, yet this is where the ball is let go.
        assert_eq!(session.drag_sample(TokenKey::Ball, Position::new(306.0, 250.0), 50), Ok(false));
        session.end_drag(TokenKey::Ball).unwrap();
        session.commit_step().unwrap();

        let step = &session.timeline().current_system().unwrap().steps[1];
        assert_eq!(step.ball, Position::new(306.0, 250.0));
        assert_eq!(step.path(TokenKey::Ball).and_then(|p| p.last()), Some(&step.ball));

        // Just before settling, the animated ball is already at the release point.
        session.start_replay().unwrap();
        session.tick(0.0);
        session.tick(1_299.0);
        assert!((session.board().ball.x - 306.0).abs() < 0.5);
        play_to_end(&mut session);
        assert_eq!(session.board().ball, Position::new(306.0, 250.0));
    }

    #[test]
    fn test_preset_replay_leaves_systems_alone() {
        let (mut session, _) = session();
        author_play(&mut session);
        let before = session.timeline().current_system().unwrap().clone();

        session.play_preset_system().unwrap();
        assert!(session.is_replaying_preset());
        assert_eq!(session.begin_drag(TokenKey::Ball), Err(SessionError::ReplayInProgress));

        let events = play_to_end(&mut session);
        assert_eq!(events.first(), Some(&ReplayEvent::Started { step_count: 1 }));
        assert!(!session.is_playing());
        assert!(!session.is_replaying_preset());

        let preset = &preset_system().steps[0];
        assert_eq!(session.board().players, preset.players);
        assert_eq!(session.board().ball, preset.ball);
        assert_eq!(session.timeline().current_system().unwrap(), &before);
        assert_eq!(session.cursor(), Some(2));
    }

    #[test]
    fn test_seek_ends_paused_preset() {
        let (mut session, _) = session();
        author_play(&mut session);
        session.play_preset_system().unwrap();
        session.toggle_pause(0.0).unwrap();

        session.seek_to(1, false).unwrap();
        assert!(!session.is_playing());
        assert_eq!(session.board().players[3], Position::new(420.0, 100.0));

        // A regular replay after the preset uses the user's steps again.
        session.start_replay().unwrap();
        let events = play_to_end(&mut session);
        assert_eq!(events.last(), Some(&ReplayEvent::Finished { last_index: 2 }));
        assert_eq!(session.cursor(), Some(2));
    }
}
