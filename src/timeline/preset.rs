//! Built-in Preset System
//!
//! A read-only demo play shipped with the board. It lives outside the
//! [`TimelineStore`](crate::timeline::store::TimelineStore), so playing it
//! never touches the user's systems.

use crate::board::state::{initial_player_positions, PathMap};
use crate::core::clock::Millis;
use crate::core::vec2::Position;
use crate::timeline::step::Step;
use crate::timeline::store::{System, SystemId};

/// Id of the built-in system.
pub const PRESET_SYSTEM_ID: &str = "preset";

/// Label of the built-in system.
pub const PRESET_SYSTEM_LABEL: &str = "Preset System";

/// Commit time stamped on the preset's steps.
pub const PRESET_TIME: Millis = 1_745_004_451_259;

/// Offense lined up along y = 100, ball at the top of the key.
fn opening_set() -> Step {
    let mut players = initial_player_positions();
    for (i, player) in players.iter_mut().take(5).enumerate() {
        *player = Position::new(100.0 + 80.0 * i as f64, 100.0);
    }
    Step {
        time: PRESET_TIME,
        players,
        ball: Position::new(400.0, 250.0),
        possession: None,
        comment: String::new(),
        annotations: Vec::new(),
        paths: PathMap::new(),
    }
}

/// The built-in demo play.
pub fn preset_system() -> System {
    let mut system = System::new(SystemId::new(PRESET_SYSTEM_ID), PRESET_SYSTEM_LABEL);
    system.steps.push(opening_set());
    system
}
