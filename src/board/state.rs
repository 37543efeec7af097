//! Board State Definitions
//!
//! Live positions of the ten players and the ball, who holds the ball, and
//! the annotation overlay currently shown. Mutated by authoring drags and by
//! the replay scheduler, one writer at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::board::annotation::AnnotationLayer;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::vec2::{Position, Vec2};
use crate::PLAYER_COUNT;

// =============================================================================
// PLAYER INDEX
// =============================================================================

/// Index of a player token, always in `0..PLAYER_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PlayerIndex(u8);

impl PlayerIndex {
    /// Create a player index. `None` if out of range.
    pub fn new(index: usize) -> Option<Self> {
        if index < PLAYER_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Index as usize, for array access.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Offense occupies the first half of the roster.
    #[inline]
    pub fn is_offense(self) -> bool {
        self.get() < PLAYER_COUNT / 2
    }

    /// All player indices in order.
    pub fn all() -> impl Iterator<Item = PlayerIndex> {
        (0..PLAYER_COUNT as u8).map(PlayerIndex)
    }
}

impl TryFrom<u8> for PlayerIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PlayerIndex::new(value as usize)
            .ok_or_else(|| format!("player index {} out of range", value))
    }
}

impl From<PlayerIndex> for u8 {
    fn from(index: PlayerIndex) -> u8 {
        index.0
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TOKEN KEY
// =============================================================================

/// Identifies a movable token. Serialized as `"ball"` or the player index
/// as a decimal string, so path maps stay readable as JSON objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKey {
    /// The single ball
    Ball,
    /// A player token
    Player(PlayerIndex),
}

impl TokenKey {
    /// Key for player `index`. `None` if out of range.
    pub fn player(index: usize) -> Option<Self> {
        PlayerIndex::new(index).map(TokenKey::Player)
    }

    /// Is this the ball key?
    #[inline]
    pub fn is_ball(self) -> bool {
        matches!(self, TokenKey::Ball)
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKey::Ball => write!(f, "ball"),
            TokenKey::Player(index) => write!(f, "{}", index),
        }
    }
}

/// Error parsing a token key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid token key: {0:?}")]
pub struct ParseTokenKeyError(pub String);

impl FromStr for TokenKey {
    type Err = ParseTokenKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ball" {
            return Ok(TokenKey::Ball);
        }
        s.parse::<usize>()
            .ok()
            .and_then(TokenKey::player)
            .ok_or_else(|| ParseTokenKeyError(s.to_string()))
    }
}

impl Serialize for TokenKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Recorded trajectories keyed by token.
///
/// BTreeMap keeps iteration order stable: ball first, then players by index.
pub type PathMap = BTreeMap<TokenKey, Vec<Position>>;

// =============================================================================
// POSSESSION
// =============================================================================

/// "Player P is carrying the ball", with the ball's offset from P's position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Possession {
    /// Player holding the ball
    pub player: PlayerIndex,
    /// `ball - player` at the moment possession was detected
    pub offset: Vec2,
}

impl Possession {
    /// Ball position when glued to a player standing at `player_pos`.
    #[inline]
    pub fn ball_position(&self, player_pos: Position) -> Position {
        player_pos + self.offset
    }
}

// =============================================================================
// BOARD STATE
// =============================================================================

/// Initial ball position.
pub const INITIAL_BALL_POSITION: Position = Position::new(501.0, 250.0);

/// Initial player layout: a row along the top edge.
pub fn initial_player_positions() -> [Position; PLAYER_COUNT] {
    std::array::from_fn(|i| Position::new(50.0 + i as f64 * 80.0, 15.0))
}

/// Complete live state of the board.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardState {
    /// Player positions, by index
    pub players: [Position; PLAYER_COUNT],

    /// Ball position
    pub ball: Position,

    /// Who holds the ball, if anyone
    pub possession: Option<Possession>,

    /// Annotations currently shown
    pub annotations: AnnotationLayer,

    /// Comment text currently shown
    pub comment: String,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::initial()
    }
}

impl BoardState {
    /// Board in its initial layout, nobody holding the ball.
    pub fn initial() -> Self {
        Self {
            players: initial_player_positions(),
            ball: INITIAL_BALL_POSITION,
            possession: None,
            annotations: AnnotationLayer::default(),
            comment: String::new(),
        }
    }

    /// Position of a player.
    #[inline]
    pub fn player(&self, index: PlayerIndex) -> Position {
        self.players[index.get()]
    }

    /// Move a player.
    #[inline]
    pub fn set_player(&mut self, index: PlayerIndex, position: Position) {
        self.players[index.get()] = position;
    }

    /// Position of any token.
    pub fn token_position(&self, key: TokenKey) -> Position {
        match key {
            TokenKey::Ball => self.ball,
            TokenKey::Player(index) => self.player(index),
        }
    }

    /// Move any token.
    pub fn set_token_position(&mut self, key: TokenKey, position: Position) {
        match key {
            TokenKey::Ball => self.ball = position,
            TokenKey::Player(index) => self.set_player(index, position),
        }
    }

    /// Current ball holder.
    #[inline]
    pub fn possessor(&self) -> Option<PlayerIndex> {
        self.possession.map(|p| p.player)
    }

    /// Current ball offset from its holder.
    #[inline]
    pub fn possession_offset(&self) -> Option<Vec2> {
        self.possession.map(|p| p.offset)
    }

    /// Re-glue the ball to its holder, if any.
    pub fn pin_ball_to_possessor(&mut self) {
        if let Some(possession) = self.possession {
            self.ball = possession.ball_position(self.player(possession.player));
        }
    }

    /// Compute hash of token positions and possession.
    ///
    /// Annotations and comment are not part of the hash: they are discrete
    /// cuts copied from steps, never interpolated.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(|hasher| {
            hasher.update_u32(self.players.len() as u32);
            for position in &self.players {
                hasher.update_vec2(*position);
            }
            hasher.update_vec2(self.ball);
            match self.possession {
                Some(possession) => {
                    hasher.update_u8(1);
                    hasher.update_u8(possession.player.0);
                    hasher.update_vec2(possession.offset);
                }
                None => hasher.update_u8(0),
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
