//! Polyline Geometry
//!
//! Pure helpers for recorded paths: total length and positioning at a
//! fractional progress, either by sample index or by arclength.

use super::vec2::Position;

/// Total length of a polyline. Zero for fewer than two points.
pub fn path_length(path: &[Position]) -> f64 {
    path.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point at fraction `t` of the path's arclength.
///
/// Equal increments of `t` cover equal distances regardless of how densely
/// the path was sampled. `t` is clamped to `[0, 1]`. Returns `None` for an
/// empty path; a single-point path always yields that point.
pub fn point_at_progress(path: &[Position], t: f64) -> Option<Position> {
    let first = *path.first()?;
    if path.len() < 2 {
        return Some(first);
    }

    let (i, frac) = locate_at_progress(path, t)?;
    if frac <= 0.0 {
        Some(path[i])
    } else if frac >= 1.0 {
        Some(path[i + 1])
    } else {
        Some(path[i].lerp(path[i + 1], frac))
    }
}

/// Segment holding fraction `t` of the path's arclength.
///
/// Returns `(i, frac)`: the point lies `frac` of the way from `path[i]` to
/// `path[i + 1]`. `None` for paths with fewer than two points. Zero-length
/// segments are skipped over with `frac = 0`.
pub fn locate_at_progress(path: &[Position], t: f64) -> Option<(usize, f64)> {
    if path.len() < 2 {
        return None;
    }
    let last_segment = path.len() - 2;

    let t = clamp_unit(t);
    if t <= 0.0 {
        return Some((0, 0.0));
    }
    if t >= 1.0 {
        return Some((last_segment, 1.0));
    }

    let mut target = t * path_length(path);
    for (i, w) in path.windows(2).enumerate() {
        let seg_len = w[0].distance(w[1]);
        if target <= seg_len {
            let frac = if seg_len == 0.0 { 0.0 } else { target / seg_len };
            return Some((i, frac));
        }
        target -= seg_len;
    }

    Some((last_segment, 1.0))
}

/// Point at fraction `t` of the path's sample indices.
///
/// The two samples bracketing `t * (len - 1)` are linearly interpolated, so
/// speed follows the sampling density. Used for player movement, which was
/// recorded at roughly constant time intervals.
pub fn point_at_index_progress(path: &[Position], t: f64) -> Option<Position> {
    let first = *path.first()?;
    if path.len() < 2 {
        return Some(first);
    }

    let pos = clamp_unit(t) * (path.len() - 1) as f64;
    let i = (pos.floor() as usize).min(path.len() - 1);
    let next = (i + 1).min(path.len() - 1);
    let frac = pos - i as f64;

    Some(path[i].lerp(path[next], frac))
}

#[inline]
fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}
