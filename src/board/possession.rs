//! Possession Detection
//!
//! Decides which player, if any, holds the ball from proximity alone.
//! Pure functions: callers write the result into the board.

use serde::{Serialize, Deserialize};

use crate::board::state::{BoardState, PlayerIndex, Possession};
use crate::core::vec2::Position;
use crate::PLAYER_COUNT;

/// Distance under which a player is highlighted as "near the ball".
pub const PROXIMITY_THRESHOLD: f64 = 50.0;

/// Check if two circles overlap (touching counts).
#[inline]
pub fn circles_overlap(pos_a: Position, radius_a: f64, pos_b: Position, radius_b: f64) -> bool {
    let combined_radius = radius_a + radius_b;
    pos_a.distance_squared(pos_b) <= combined_radius * combined_radius
}

/// Collision radii for players and the ball.
///
/// Scaled to the viewport so touch screens get larger grab targets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionRadii {
    /// Player token radius
    pub player: f64,
    /// Ball radius
    pub ball: f64,
}

impl Default for CollisionRadii {
    fn default() -> Self {
        Self { player: 40.0, ball: 30.0 }
    }
}

impl CollisionRadii {
    /// Radii tier for a viewport of `width` pixels.
    pub fn for_viewport_width(width: f64) -> Self {
        if width < 640.0 {
            Self { player: 65.0, ball: 60.0 }
        } else if width < 1024.0 {
            Self { player: 40.0, ball: 40.0 }
        } else {
            Self::default()
        }
    }

    /// Ball-to-player distance at or under which the player holds the ball.
    #[inline]
    pub fn reach(&self) -> f64 {
        self.player + self.ball
    }
}

/// Find who holds the ball.
///
/// Scans players in index order and returns the **first** one within
/// `radii.reach()` of the ball, not the closest. Offset is `ball - player`.
pub fn detect_possession(
    ball: Position,
    players: &[Position],
    radii: CollisionRadii,
) -> Option<Possession> {
    players
        .iter()
        .take(PLAYER_COUNT)
        .enumerate()
        .find(|(_, player)| circles_overlap(**player, radii.player, ball, radii.ball))
        .and_then(|(i, player)| {
            PlayerIndex::new(i).map(|index| Possession {
                player: index,
                offset: ball - *player,
            })
        })
}

/// Run the detector against a board.
pub fn detect_on_board(board: &BoardState, radii: CollisionRadii) -> Option<Possession> {
    detect_possession(board.ball, &board.players, radii)
}

/// Per-player "near the ball" flags.
pub fn near_ball_flags(board: &BoardState) -> [bool; PLAYER_COUNT] {
    std::array::from_fn(|i| board.players[i].distance(board.ball) <= PROXIMITY_THRESHOLD)
}

/// How the renderer should highlight a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerHighlight {
    /// Holding the ball
    WithBall,
    /// Within `PROXIMITY_THRESHOLD` of the ball
    NearBall,
    /// Offensive player, idle
    Offense,
    /// Defensive player, idle
    Defense,
}

/// Highlight for one player. Holding beats proximity beats team colour.
pub fn player_highlight(board: &BoardState, index: PlayerIndex) -> PlayerHighlight {
    if board.possessor() == Some(index) {
        PlayerHighlight::WithBall
    } else if board.player(index).distance(board.ball) <= PROXIMITY_THRESHOLD {
        PlayerHighlight::NearBall
    } else if index.is_offense() {
        PlayerHighlight::Offense
    } else {
        PlayerHighlight::Defense
    }
}
