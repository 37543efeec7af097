//! Step Snapshots
//!
//! A step is the board frozen at commit time plus the paths recorded since
//! the previous commit, which replay uses to animate into it.

use serde::{Serialize, Deserialize};

use crate::board::annotation::{Annotation, AnnotationLayer};
use crate::board::state::{BoardState, PathMap, PlayerIndex, Possession, TokenKey};
use crate::core::clock::Millis;
use crate::core::vec2::{Position, Vec2};
use crate::PLAYER_COUNT;

/// Immutable snapshot of one moment of the play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Commit timestamp (ms since epoch)
    pub time: Millis,
    /// Player positions
    pub players: [Position; PLAYER_COUNT],
    /// Ball position
    pub ball: Position,
    /// Ball holder and offset at commit time
    pub possession: Option<Possession>,
    /// Step comment
    pub comment: String,
    /// Annotations shown during this step
    pub annotations: Vec<Annotation>,
    /// Paths travelled since the previous step
    pub paths: PathMap,
}

impl Step {
    /// Freeze the board into a step.
    pub fn capture(board: &BoardState, paths: PathMap, time: Millis) -> Self {
        Self {
            time,
            players: board.players,
            ball: board.ball,
            possession: board.possession,
            comment: board.comment.clone(),
            annotations: board.annotations.to_vec(),
            paths,
        }
    }

    /// Ball holder at commit time.
    #[inline]
    pub fn possessor(&self) -> Option<PlayerIndex> {
        self.possession.map(|p| p.player)
    }

    /// Ball offset from its holder at commit time.
    #[inline]
    pub fn possession_offset(&self) -> Option<Vec2> {
        self.possession.map(|p| p.offset)
    }

    /// Recorded path for a token, if any.
    pub fn path(&self, key: TokenKey) -> Option<&[Position]> {
        self.paths.get(&key).map(|p| p.as_slice())
    }

    /// Did this token travel (at least two path points) into this step?
    pub fn token_moved(&self, key: TokenKey) -> bool {
        self.path(key).is_some_and(|p| p.len() > 1)
    }

    /// Has any motion to animate?
    pub fn has_paths(&self) -> bool {
        !self.paths.is_empty()
    }

    /// Write the snapshot into a live board: positions, possession,
    /// comment and annotations.
    pub fn apply_to(&self, board: &mut BoardState) {
        board.players = self.players;
        board.ball = self.ball;
        board.possession = self.possession;
        board.comment = self.comment.clone();
        board.annotations = AnnotationLayer::from_vec(self.annotations.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::annotation::{AnnotationDraft, AnnotationId};

    #[test]
    fn test_capture_and_apply() {
        let mut board = BoardState::initial();
        let p3 = PlayerIndex::new(3).unwrap();
        board.set_player(p3, Position::new(420.0, 100.0));
        board.comment = "weak side flare".to_string();
        let draft = AnnotationDraft::Orientation { position: Position::new(1.0, 1.0), rotation: 0.0 };
        let marker = draft.into_annotation(AnnotationId(1), &board);
        board.annotations.push(marker);

        let mut paths = PathMap::new();
        paths.insert(TokenKey::Player(p3), vec![Position::new(290.0, 15.0), Position::new(420.0, 100.0)]);

        let step = Step::capture(&board, paths, 42);
        assert_eq!(step.time, 42);
        assert!(step.token_moved(TokenKey::Player(p3)));
        assert!(!step.token_moved(TokenKey::Ball));

        let mut other = BoardState::initial();
        step.apply_to(&mut other);
        assert_eq!(other.player(p3), Position::new(420.0, 100.0));
        assert_eq!(other.comment, "weak side flare");
        assert_eq!(other.annotations.len(), 1);
    }

    #[test]
    fn test_step_json_shape() {
        let step = Step::capture(&BoardState::initial(), PathMap::new(), 1);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["players"].as_array().map(|a| a.len()), Some(PLAYER_COUNT));
        assert!(json["possession"].is_null());
        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }
}
