//! Easing functions looked up by name.
//!
//! Every curve is exposed through the classic `(p, start, delta, duration)`
//! signature via [`Easing::apply`]; [`Easing::evaluate`] gives the bare
//! `[0, 1] -> value` shape. Supported names:
//! - `linear`
//! - `easeIn*`, `easeOut*`, `easeInOut*` for Quad, Cubic, Quart, Quint, Sine,
//!   Expo, Circ and Back
//! - CSS keywords `ease`, `ease-in`, `ease-out`, `ease-in-out`
//! - `cubic-bezier(x1, y1, x2, y2)`
//!
//! ```
//! use glide_core::easing::Easing;
//!
//! let ease = Easing::from_name("easeOutQuad").unwrap();
//! let value = ease.apply(0.5, 100.0, 50.0, 1.0); // 100 + 50 * 0.75
//! assert!((value - 137.5).abs() < 1e-9);
//! ```

use std::f64::consts::PI;
use std::str::FromStr;

use crate::error::{GlideError, Result};

/// Power/shape family of a Penner curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Quad,
    Cubic,
    Quart,
    Quint,
    Sine,
    Expo,
    Circ,
    Back,
}

/// Which end of the curve accelerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaseKind {
    In,
    Out,
    InOut,
}

/// A resolved easing function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    Penner(Curve, EaseKind),
    /// Custom cubic bezier curve with control points (x1, y1), (x2, y2).
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl Default for Easing {
    fn default() -> Self {
        Self::Linear
    }
}

impl Easing {
    /// Look up an easing by its configuration name.
    pub fn from_name(name: &str) -> Result<Self> {
        let unknown = || GlideError::UnknownEasing(name.to_string());
        let trimmed = name.trim();

        if let Some(args) = trimmed
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let v = args
                .split(',')
                .map(|p| p.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| unknown())?;
            if v.len() != 4 || !(0.0..=1.0).contains(&v[0]) || !(0.0..=1.0).contains(&v[2]) {
                return Err(unknown());
            }
            return Ok(Self::CubicBezier {
                x1: v[0],
                y1: v[1],
                x2: v[2],
                y2: v[3],
            });
        }

        match trimmed {
            "linear" => return Ok(Self::Linear),
            "ease" => return Ok(Self::bezier(0.25, 0.1, 0.25, 1.0)),
            "ease-in" => return Ok(Self::bezier(0.42, 0.0, 1.0, 1.0)),
            "ease-out" => return Ok(Self::bezier(0.0, 0.0, 0.58, 1.0)),
            "ease-in-out" => return Ok(Self::bezier(0.42, 0.0, 0.58, 1.0)),
            _ => {}
        }

        let (kind, curve) = if let Some(rest) = trimmed.strip_prefix("easeInOut") {
            (EaseKind::InOut, rest)
        } else if let Some(rest) = trimmed.strip_prefix("easeIn") {
            (EaseKind::In, rest)
        } else if let Some(rest) = trimmed.strip_prefix("easeOut") {
            (EaseKind::Out, rest)
        } else {
            return Err(unknown());
        };

        let curve = match curve {
            "Quad" => Curve::Quad,
            "Cubic" => Curve::Cubic,
            "Quart" => Curve::Quart,
            "Quint" => Curve::Quint,
            "Sine" => Curve::Sine,
            "Expo" => Curve::Expo,
            "Circ" => Curve::Circ,
            "Back" => Curve::Back,
            _ => return Err(unknown()),
        };
        Ok(Self::Penner(curve, kind))
    }

    fn bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::CubicBezier { x1, y1, x2, y2 }
    }

    /// Evaluate the curve at progress `t` (clamped to `[0, 1]`).
    ///
    /// Output may leave `[0, 1]` for overshooting curves (Back, some beziers).
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Penner(curve, kind) => match kind {
                EaseKind::In => ease_in(*curve, t),
                EaseKind::Out => 1.0 - ease_in(*curve, 1.0 - t),
                EaseKind::InOut => {
                    if t < 0.5 {
                        ease_in(*curve, t * 2.0) / 2.0
                    } else {
                        1.0 - ease_in(*curve, (1.0 - t) * 2.0) / 2.0
                    }
                }
            },
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
        }
    }

    /// `(p, start, delta, duration) -> value`.
    pub fn apply(&self, p: f64, start: f64, delta: f64, duration: f64) -> f64 {
        let t = if duration > 0.0 { p / duration } else { 1.0 };
        start + delta * self.evaluate(t)
    }
}

impl FromStr for Easing {
    type Err = GlideError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

fn ease_in(curve: Curve, t: f64) -> f64 {
    match curve {
        Curve::Quad => t * t,
        Curve::Cubic => t * t * t,
        Curve::Quart => t.powi(4),
        Curve::Quint => t.powi(5),
        Curve::Sine => 1.0 - (t * PI / 2.0).cos(),
        Curve::Expo => {
            if t <= 0.0 {
                0.0
            } else {
                2.0_f64.powf(10.0 * (t - 1.0))
            }
        }
        Curve::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        Curve::Back => {
            const S: f64 = 1.70158;
            t * t * ((S + 1.0) * t - S)
        }
    }
}

/// Evaluate a cubic bezier curve at progress x.
///
/// Newton-Raphson finds the curve parameter for x, then y is read at it.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_component(y1, y2, t)
}

fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_component(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }

        let dx = bezier_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// One coordinate of the curve: 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_component(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

/// d/dt = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_derivative(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    const ALL_NAMES: [&str; 29] = [
        "linear",
        "ease",
        "ease-in",
        "ease-out",
        "ease-in-out",
        "easeInQuad",
        "easeOutQuad",
        "easeInOutQuad",
        "easeInCubic",
        "easeOutCubic",
        "easeInOutCubic",
        "easeInQuart",
        "easeOutQuart",
        "easeInOutQuart",
        "easeInQuint",
        "easeOutQuint",
        "easeInOutQuint",
        "easeInSine",
        "easeOutSine",
        "easeInOutSine",
        "easeInExpo",
        "easeOutExpo",
        "easeInOutExpo",
        "easeInCirc",
        "easeOutCirc",
        "easeInOutCirc",
        "easeInBack",
        "easeOutBack",
        "easeInOutBack",
    ];

    #[test]
    fn test_boundaries() {
        for name in ALL_NAMES {
            let ease = Easing::from_name(name).unwrap();
            assert!(approx_eq(ease.evaluate(0.0), 0.0), "{name} at 0");
            assert!(approx_eq(ease.evaluate(1.0), 1.0), "{name} at 1");
        }
    }

    #[test]
    fn test_quad_values() {
        let ease_in = Easing::from_name("easeInQuad").unwrap();
        let ease_out = Easing::from_name("easeOutQuad").unwrap();
        let in_out = Easing::from_name("easeInOutQuad").unwrap();
        assert!(approx_eq(ease_in.evaluate(0.5), 0.25));
        assert!(approx_eq(ease_out.evaluate(0.5), 0.75));
        assert!(approx_eq(in_out.evaluate(0.5), 0.5));
        assert!(approx_eq(in_out.evaluate(0.25), 0.125));
    }

    #[test]
    fn test_apply_signature() {
        let ease = Easing::from_name("easeInQuad").unwrap();
        assert!(approx_eq(ease.apply(0.5, 10.0, 40.0, 1.0), 20.0));
        assert!(approx_eq(ease.apply(1.0, 10.0, 40.0, 1.0), 50.0));
        assert!(approx_eq(Easing::Linear.apply(0.3, 0.0, -100.0, 1.0), -30.0));
    }

    #[test]
    fn test_css_keywords_match_bezier_shape() {
        let ease = Easing::from_name("ease").unwrap();
        let mid = ease.evaluate(0.5);
        assert!(mid > 0.7 && mid < 0.9, "CSS ease mid-point should be ~0.8, got {mid}");
        let in_out = Easing::from_name("ease-in-out").unwrap();
        assert!(approx_eq(in_out.evaluate(0.5), 0.5));
    }

    #[test]
    fn test_custom_bezier() {
        let linear = Easing::from_name("cubic-bezier(0, 0, 1, 1)").unwrap();
        assert!(approx_eq(linear.evaluate(0.5), 0.5));
        assert!(Easing::from_name("cubic-bezier(1.5, 0, 0.5, 1)").is_err());
        assert!(Easing::from_name("cubic-bezier(0, 0, 1)").is_err());
    }

    #[test]
    fn test_back_overshoots() {
        let ease = Easing::from_name("easeInBack").unwrap();
        assert!(ease.evaluate(0.2) < 0.0);
    }

    #[test]
    fn test_unknown_names() {
        for bad in ["", "bounce", "easeInWobble", "easeQuad"] {
            assert!(matches!(Easing::from_name(bad), Err(GlideError::UnknownEasing(_))), "{bad}");
        }
    }

    #[test]
    fn test_monotonic_non_back_curves() {
        for name in ALL_NAMES.iter().filter(|n| !n.contains("Back")) {
            let ease = Easing::from_name(name).unwrap();
            let mut prev = ease.evaluate(0.0);
            for i in 1..=20 {
                let v = ease.evaluate(i as f64 / 20.0);
                assert!(v + 1e-9 >= prev, "{name} not monotonic at step {i}");
                prev = v;
            }
        }
    }
}
