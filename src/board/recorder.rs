//! Path Recording
//!
//! Accumulates the polyline each token follows while it is dragged, between
//! two step commits. Samples are throttled by time and distance, and stored
//! points never sit closer than `min_separation` to their predecessor.
//!
//! The ball only keeps its start and latest point: passes are modelled as
//! straight hand-offs, not freehand drags.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::board::state::{PathMap, TokenKey};
use crate::core::clock::Millis;
use crate::core::vec2::Position;

/// Sampling thresholds for the recorder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// A sample is accepted once this much time has passed since the last one
    pub min_sample_interval_ms: Millis,
    /// A sample is accepted once it is this far from the last one; also the
    /// minimum spacing between stored path points
    pub min_separation: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_sample_interval_ms: 30,
            min_separation: 8.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Track {
    path: Vec<Position>,
    last_sample: Option<Position>,
    last_sample_at: Option<Millis>,
}

/// Per-token path accumulator.
#[derive(Clone, Debug, Default)]
pub struct PathRecorder {
    config: RecorderConfig,
    tracks: BTreeMap<TokenKey, Track>,
}

impl PathRecorder {
    /// Create a recorder with the given thresholds.
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
        }
    }

    /// Active thresholds.
    pub fn config(&self) -> RecorderConfig {
        self.config
    }

    /// Start (or resume) tracking a token from `start`.
    ///
    /// A second drag of the same token in one authoring interval extends
    /// its existing path. The ball keeps the start of its first drag.
    pub fn begin_track(&mut self, key: TokenKey, start: Position) {
        let min_separation = self.config.min_separation;
        let track = self.tracks.entry(key).or_default();

        match track.path.last() {
            None => track.path.push(start),
            Some(_) if key.is_ball() => {}
            Some(last) => {
                if last.distance(start) >= min_separation {
                    track.path.push(start);
                }
            }
        }
        track.last_sample = Some(start);
    }

    /// Offer a drag sample. Returns whether it was accepted.
    ///
    /// Accepted when more than `min_sample_interval_ms` passed since the last
    /// accepted sample, or it lies more than `min_separation` away from it.
    /// A rejected sample changes nothing. An accepted sample only extends the
    /// stored path when it keeps the minimum spacing.
    pub fn record_sample(&mut self, key: TokenKey, position: Position, now: Millis) -> bool {
        let config = self.config;
        let track = self.tracks.entry(key).or_default();

        let accepted = match (track.last_sample, track.last_sample_at) {
            (Some(last), Some(at)) => {
                now.saturating_sub(at) > config.min_sample_interval_ms
                    || last.distance(position) > config.min_separation
            }
            _ => true,
        };

        if !accepted {
            trace!(%key, "sample rejected");
            return false;
        }

        track.last_sample = Some(position);
        track.last_sample_at = Some(now);

        if key.is_ball() {
            set_ball_end(track, position, config.min_separation);
        } else {
            match track.path.last() {
                Some(last) if last.distance(position) < config.min_separation => {}
                _ => track.path.push(position),
            }
        }

        true
    }

    /// Finish a drag with the token's final resting position.
    ///
    /// Makes the path end where the token actually stopped, even when the
    /// last pointer move was throttled away. For a player the final point is
    /// appended when far enough from the last stored point, otherwise it
    /// replaces that point as long as spacing to its predecessor holds. The
    /// ball's end point is simply replaced.
    pub fn end_track(&mut self, key: TokenKey, final_position: Position) {
        let min_separation = self.config.min_separation;
        let Some(track) = self.tracks.get_mut(&key) else {
            return;
        };
        if key.is_ball() {
            set_ball_end(track, final_position, min_separation);
            return;
        }

        let len = track.path.len();
        let Some(last) = track.path.last().copied() else {
            return;
        };
        if last == final_position {
            return;
        }

        if last.distance(final_position) >= min_separation {
            track.path.push(final_position);
        } else if len >= 2 && track.path[len - 2].distance(final_position) >= min_separation {
            track.path[len - 1] = final_position;
        }
    }

    /// Path recorded so far for a token. Empty if never tracked.
    pub fn current_path(&self, key: TokenKey) -> &[Position] {
        self.tracks
            .get(&key)
            .map(|t| t.path.as_slice())
            .unwrap_or(&[])
    }

    /// Is anything recorded?
    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(|t| t.path.is_empty())
    }

    /// Copy of all non-empty paths.
    pub fn paths(&self) -> PathMap {
        self.tracks
            .iter()
            .filter(|(_, t)| !t.path.is_empty())
            .map(|(key, t)| (*key, t.path.clone()))
            .collect()
    }

    /// Take all non-empty paths and clear the recorder.
    pub fn take_paths(&mut self) -> PathMap {
        let paths = self.paths();
        self.clear_all();
        paths
    }

    /// Forget every track.
    pub fn clear_all(&mut self) {
        self.tracks.clear();
    }
}

/// Reset a ball path to `[start, end]`, or `[start]` for a short drag.
fn set_ball_end(track: &mut Track, end: Position, min_separation: f64) {
    let start = track.path.first().copied().unwrap_or(end);
    track.path.clear();
    track.path.push(start);
    if start.distance(end) >= min_separation {
        track.path.push(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    fn player(i: usize) -> TokenKey {
        TokenKey::player(i).unwrap()
    }

    fn assert_spacing(path: &[Position], min: f64) {
        for w in path.windows(2) {
            assert!(w[0].distance(w[1]) >= min, "points {:?} and {:?} too close", w[0], w[1]);
        }
    }

    #[test]
    fn test_time_or_distance_acceptance() {
        let mut rec = PathRecorder::default();
        let key = player(3);
        rec.begin_track(key, p(0.0, 0.0));

        assert!(rec.record_sample(key, p(20.0, 0.0), 1_000));
        // 10ms later, 2 units away: rejected
        assert!(!rec.record_sample(key, p(22.0, 0.0), 1_010));
        // 10ms later, 12 units away: accepted by distance
        assert!(rec.record_sample(key, p(32.0, 0.0), 1_020));
        // 40ms later, 1 unit away: accepted by time but not stored
        assert!(rec.record_sample(key, p(33.0, 0.0), 1_060));

        assert_eq!(rec.current_path(key), &[p(0.0, 0.0), p(20.0, 0.0), p(32.0, 0.0)]);
    }

    #[test]
    fn test_rejected_sample_does_not_mutate() {
        let mut rec = PathRecorder::default();
        let key = player(0);
        rec.begin_track(key, p(0.0, 0.0));
        assert!(rec.record_sample(key, p(50.0, 0.0), 100));
        let before = rec.paths();
        assert!(!rec.record_sample(key, p(51.0, 0.0), 105));
        assert_eq!(rec.paths(), before);
        // The rejected sample did not reset the throttle baseline.
        assert!(!rec.record_sample(key, p(52.0, 0.0), 120));
        assert!(rec.record_sample(key, p(52.0, 0.0), 131));
    }

    #[test]
    fn test_ball_keeps_only_endpoints() {
        let mut rec = PathRecorder::default();
        rec.begin_track(TokenKey::Ball, p(100.0, 100.0));
        for (i, x) in [120.0, 160.0, 220.0, 300.0].iter().enumerate() {
            assert!(rec.record_sample(TokenKey::Ball, p(*x, 100.0), 100 + i as u64 * 50));
        }
        assert_eq!(rec.current_path(TokenKey::Ball), &[p(100.0, 100.0), p(300.0, 100.0)]);

        // A second drag keeps the original start point.
        rec.begin_track(TokenKey::Ball, p(300.0, 100.0));
        assert!(rec.record_sample(TokenKey::Ball, p(300.0, 200.0), 1_000));
        assert_eq!(rec.current_path(TokenKey::Ball), &[p(100.0, 100.0), p(300.0, 200.0)]);
    }

    #[test]
    fn test_ball_release_point_survives_throttle() {
        let mut rec = PathRecorder::default();
        rec.begin_track(TokenKey::Ball, p(501.0, 250.0));
        assert!(rec.record_sample(TokenKey::Ball, p(300.0, 250.0), 40));
        // 10ms and 6 units later: throttled, but the ball still lands here.
        assert!(!rec.record_sample(TokenKey::Ball, p(306.0, 250.0), 50));
        rec.end_track(TokenKey::Ball, p(306.0, 250.0));
        assert_eq!(rec.current_path(TokenKey::Ball), &[p(501.0, 250.0), p(306.0, 250.0)]);

        // Released back near the start: a static ball.
        rec.begin_track(TokenKey::Ball, p(306.0, 250.0));
        rec.end_track(TokenKey::Ball, p(504.0, 250.0));
        assert_eq!(rec.current_path(TokenKey::Ball), &[p(501.0, 250.0)]);
    }

    #[test]
    fn test_ball_short_drag_stays_single_point() {
        let mut rec = PathRecorder::default();
        rec.begin_track(TokenKey::Ball, p(0.0, 0.0));
        assert!(rec.record_sample(TokenKey::Ball, p(3.0, 0.0), 100));
        assert_eq!(rec.current_path(TokenKey::Ball), &[p(0.0, 0.0)]);
    }

    #[test]
    fn test_second_drag_extends_path() {
        let mut rec = PathRecorder::default();
        let key = player(1);
        rec.begin_track(key, p(0.0, 0.0));
        rec.record_sample(key, p(40.0, 0.0), 100);
        rec.end_track(key, p(40.0, 0.0));

        rec.begin_track(key, p(40.0, 0.0));
        rec.record_sample(key, p(40.0, 40.0), 500);
        assert_eq!(rec.current_path(key), &[p(0.0, 0.0), p(40.0, 0.0), p(40.0, 40.0)]);
    }

    #[test]
    fn test_end_track_lands_on_final_position() {
        let mut rec = PathRecorder::default();
        let key = player(2);
        rec.begin_track(key, p(0.0, 0.0));
        rec.record_sample(key, p(20.0, 0.0), 100);
        // Accepted by time but too close to store
        rec.record_sample(key, p(25.0, 0.0), 200);
        rec.end_track(key, p(25.0, 0.0));
        assert_eq!(rec.current_path(key), &[p(0.0, 0.0), p(25.0, 0.0)]);
        assert_spacing(rec.current_path(key), 8.0);
    }

    #[test]
    fn test_spacing_invariant_on_jittery_drag() {
        let mut rec = PathRecorder::default();
        let key = player(4);
        rec.begin_track(key, p(0.0, 0.0));
        let mut x = 0.0;
        for t in 0..200u64 {
            x += if t % 3 == 0 { 9.0 } else { 1.5 };
            rec.record_sample(key, p(x, (t % 5) as f64), t * 31);
        }
        rec.end_track(key, p(x, 0.0));
        assert_spacing(rec.current_path(key), 8.0);
    }

    #[test]
    fn test_take_paths_clears() {
        let mut rec = PathRecorder::default();
        rec.begin_track(player(0), p(0.0, 0.0));
        rec.record_sample(player(0), p(30.0, 0.0), 100);
        let paths = rec.take_paths();
        assert_eq!(paths.len(), 1);
        assert!(rec.is_empty());
        assert!(rec.current_path(player(0)).is_empty());
    }
}
