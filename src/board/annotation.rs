//! Annotation Overlay
//!
//! Free-form drawings on top of the court: comment boxes, strokes and "T"
//! orientation markers. Each step owns its own list; replay swaps the whole
//! list in when it enters a step.

use serde::{Serialize, Deserialize};

use crate::board::state::{BoardState, PlayerIndex};
use crate::core::clock::Millis;
use crate::core::vec2::{Position, Vec2};

/// Default text for a new comment box.
pub const DEFAULT_COMMENT_TEXT: &str = "Comment...";

/// Default comment font size.
pub const DEFAULT_COMMENT_FONT_SIZE: f64 = 14.0;

/// Default comment box width.
pub const DEFAULT_COMMENT_WIDTH: f64 = 140.0;

/// Comment placement relative to an anchored player.
pub const PLAYER_ANCHOR_OFFSET: Vec2 = Vec2::new(50.0, -10.0);

/// Comment placement relative to an anchored ball.
pub const BALL_ANCHOR_OFFSET: Vec2 = Vec2::new(30.0, -10.0);

/// Unique annotation identifier, derived from creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out strictly increasing ids from a millisecond clock.
///
/// Two annotations created in the same millisecond still get distinct ids.
#[derive(Clone, Debug, Default)]
pub struct AnnotationIds {
    last: u64,
}

impl AnnotationIds {
    /// Next id for an annotation created at `now`.
    pub fn next(&mut self, now: Millis) -> AnnotationId {
        let id = now.max(self.last.saturating_add(1));
        self.last = id;
        AnnotationId(id)
    }

    /// Make sure future ids stay above every id in `layer`.
    pub fn observe(&mut self, layer: &AnnotationLayer) {
        if let Some(max) = layer.iter().map(|a| a.id().0).max() {
            self.last = self.last.max(max);
        }
    }
}

/// What a comment box is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// Placed next to a player
    Player(PlayerIndex),
    /// Placed next to the ball
    Ball,
}

/// Kind of freehand stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    /// Movement arrow
    Arrow,
    /// Screen (pick) marker
    Screen,
    /// Plain line
    Line,
}

/// Text box with its own position and width.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentBox {
    /// Unique id
    pub id: AnnotationId,
    /// Top-left corner
    pub position: Position,
    /// Text content
    pub text: String,
    /// Font size
    pub font_size: f64,
    /// Box width
    pub width: f64,
    /// Token the box was placed against, if any
    pub anchor: Option<Anchor>,
}

/// Freehand stroke through raw points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Unique id
    pub id: AnnotationId,
    /// Stroke kind
    pub kind: StrokeKind,
    /// Raw pointer samples, in drawing order
    pub points: Vec<Position>,
}

/// "T" marker showing which way a player faces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationMarker {
    /// Unique id
    pub id: AnnotationId,
    /// Marker position
    pub position: Position,
    /// Rotation in degrees
    pub rotation: f64,
}

/// One annotation on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    /// Text box
    Comment(CommentBox),
    /// Arrow, screen or line
    Stroke(Stroke),
    /// "T" orientation marker
    Orientation(OrientationMarker),
}

impl Annotation {
    /// Annotation id.
    pub fn id(&self) -> AnnotationId {
        match self {
            Annotation::Comment(c) => c.id,
            Annotation::Stroke(s) => s.id,
            Annotation::Orientation(o) => o.id,
        }
    }

    /// Move the annotation so its reference point lands on `position`.
    /// Strokes are translated as a whole, keyed on their first point.
    pub fn move_to(&mut self, position: Position) {
        match self {
            Annotation::Comment(c) => c.position = position,
            Annotation::Orientation(o) => o.position = position,
            Annotation::Stroke(s) => {
                if let Some(first) = s.points.first().copied() {
                    let delta = position - first;
                    for point in &mut s.points {
                        *point = *point + delta;
                    }
                }
            }
        }
    }
}

/// An annotation before it has an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationDraft {
    /// Comment box at a point, or next to a token when anchored
    Comment {
        /// Where to put the box when not anchored
        position: Position,
        /// Text, defaults to `DEFAULT_COMMENT_TEXT` when empty
        text: String,
        /// Optional token anchor
        anchor: Option<Anchor>,
    },
    /// Stroke through points
    Stroke {
        /// Stroke kind
        kind: StrokeKind,
        /// Points in drawing order
        points: Vec<Position>,
    },
    /// Orientation marker
    Orientation {
        /// Marker position
        position: Position,
        /// Rotation in degrees
        rotation: f64,
    },
}

impl AnnotationDraft {
    /// Turn the draft into an annotation, resolving anchors against `board`.
    pub fn into_annotation(self, id: AnnotationId, board: &BoardState) -> Annotation {
        match self {
            AnnotationDraft::Comment { position, text, anchor } => {
                let position = match anchor {
                    Some(Anchor::Player(index)) => board.player(index) + PLAYER_ANCHOR_OFFSET,
                    Some(Anchor::Ball) => board.ball + BALL_ANCHOR_OFFSET,
                    None => position,
                };
                let text = if text.is_empty() {
                    DEFAULT_COMMENT_TEXT.to_string()
                } else {
                    text
                };
                Annotation::Comment(CommentBox {
                    id,
                    position,
                    text,
                    font_size: DEFAULT_COMMENT_FONT_SIZE,
                    width: DEFAULT_COMMENT_WIDTH,
                    anchor,
                })
            }
            AnnotationDraft::Stroke { kind, points } => {
                Annotation::Stroke(Stroke { id, kind, points })
            }
            AnnotationDraft::Orientation { position, rotation } => {
                Annotation::Orientation(OrientationMarker { id, position, rotation })
            }
        }
    }
}

/// Errors from annotation edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    /// No annotation with this id
    #[error("annotation {0} not found")]
    NotFound(AnnotationId),

    /// Only comment boxes carry text
    #[error("annotation {0} has no text")]
    NotEditable(AnnotationId),
}

/// Ordered list of annotations shown on the board.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationLayer {
    items: Vec<Annotation>,
}

impl AnnotationLayer {
    /// Wrap an existing list.
    pub fn from_vec(items: Vec<Annotation>) -> Self {
        Self { items }
    }

    /// Annotations in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    /// As a slice.
    pub fn as_slice(&self) -> &[Annotation] {
        &self.items
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No annotations?
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id() == id)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Result<&mut Annotation, AnnotationError> {
        self.items
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(AnnotationError::NotFound(id))
    }

    /// Append an annotation.
    pub fn push(&mut self, annotation: Annotation) {
        self.items.push(annotation);
    }

    /// Replace the text of a comment box.
    pub fn update_text(&mut self, id: AnnotationId, text: impl Into<String>) -> Result<(), AnnotationError> {
        match self.get_mut(id)? {
            Annotation::Comment(comment) => {
                comment.text = text.into();
                Ok(())
            }
            _ => Err(AnnotationError::NotEditable(id)),
        }
    }

    /// Move an annotation.
    pub fn move_to(&mut self, id: AnnotationId, position: Position) -> Result<(), AnnotationError> {
        self.get_mut(id)?.move_to(position);
        Ok(())
    }

    /// Remove by id.
    pub fn remove(&mut self, id: AnnotationId) -> Result<Annotation, AnnotationError> {
        let pos = self
            .items
            .iter()
            .position(|a| a.id() == id)
            .ok_or(AnnotationError::NotFound(id))?;
        Ok(self.items.remove(pos))
    }

    /// Remove the most recently added annotation.
    pub fn erase_last(&mut self) -> Option<Annotation> {
        self.items.pop()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Owned copy of the list, for a step snapshot.
    pub fn to_vec(&self) -> Vec<Annotation> {
        self.items.clone()
    }
}
