//! Scroll-offset keyframe tracks.
//!
//! A track maps scroll offsets to values for one property of one element.
//! Thresholds and values are resolved to pixels once per rescan; per frame
//! only [`KeyframeTrack::sample`] runs.
//!
//! # Bracketing
//!
//! - Exactly two control points are used as (start, end) regardless of the
//!   offset.
//! - With more points, consecutive declared pairs are scanned and the first
//!   pair whose threshold range encloses the offset wins. When none encloses
//!   it, the pair with the endpoint nearest to the offset is used (earliest
//!   pair on ties), which clamps to the track's ends for monotonic tracks.
//!
//! Thresholds may ascend or descend; clamping is symmetric.

use crate::anchor::Axis;
use crate::easing::Easing;

/// One `(scroll offset, value)` control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub offset: f64,
    pub value: f64,
}

impl ControlPoint {
    pub const fn new(offset: f64, value: f64) -> Self {
        Self { offset, value }
    }
}

/// The keyframes driving one property.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    /// Property name, e.g. `x`, `rotation`, `opacity`.
    pub property: String,
    /// Scroll axis the thresholds were resolved on.
    pub axis: Axis,
    /// Control points in declaration order (at least two).
    pub points: Vec<ControlPoint>,
    pub easing: Option<Easing>,
}

impl KeyframeTrack {
    /// Build a track. Returns `None` for fewer than two points.
    pub fn new(
        property: impl Into<String>,
        axis: Axis,
        points: Vec<ControlPoint>,
        easing: Option<Easing>,
    ) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self {
            property: property.into(),
            axis,
            points,
            easing,
        })
    }

    /// The active `(start, end)` pair for `offset`.
    pub fn bracket(&self, offset: f64) -> (ControlPoint, ControlPoint) {
        if self.points.len() == 2 {
            return (self.points[0], self.points[1]);
        }

        let pairs = || self.points.windows(2).map(|w| (w[0], w[1]));

        if let Some(pair) = pairs().find(|(a, b)| {
            let (lo, hi) = ordered(a.offset, b.offset);
            offset >= lo && offset <= hi
        }) {
            return pair;
        }

        let mut best = (self.points[0], self.points[1]);
        let mut best_distance = f64::INFINITY;
        for (a, b) in pairs() {
            let distance = (a.offset - offset).abs().min((b.offset - offset).abs());
            if distance < best_distance {
                best_distance = distance;
                best = (a, b);
            }
        }
        best
    }

    /// Normalised progress of `offset` through the active pair, in `[0, 1]`.
    pub fn progress(&self, offset: f64) -> f64 {
        let (start, end) = self.bracket(offset);
        progress_between(start.offset, end.offset, offset)
    }

    /// Resolved value at `offset`.
    pub fn sample(&self, offset: f64) -> f64 {
        let (start, end) = self.bracket(offset);
        let p = progress_between(start.offset, end.offset, offset);
        let delta = end.value - start.value;
        match self.easing {
            Some(easing) => easing.apply(p, start.value, delta, 1.0),
            None => start.value + p * delta,
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Clamp `offset` into the pair's range and normalise.
///
/// Equal thresholds give a step: 0 before the threshold, 1 at or past it.
pub fn progress_between(start: f64, end: f64, offset: f64) -> f64 {
    let span = end - start;
    if span == 0.0 || !span.is_finite() {
        return if offset >= start { 1.0 } else { 0.0 };
    }
    let (lo, hi) = ordered(start, end);
    let clamped = offset.clamp(lo, hi);
    ((clamped - start) / span).clamp(0.0, 1.0)
}
