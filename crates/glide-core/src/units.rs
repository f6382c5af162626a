//! Conversion of declared keyframe values into pixels.
//!
//! Numbers are already pixels. Strings are `<number><unit>` where the unit is
//! `px`, `vh`, `vw` or `%`; `%` and any unrecognised or missing unit are
//! relative to the element's own client size (height for `y`, width for
//! everything else).

use serde::{Deserialize, Serialize};

use crate::dom::Size;
use crate::error::{GlideError, Result};

/// A value as written in the animation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredValue {
    Number(f64),
    Text(String),
}

impl From<f64> for DeclaredValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DeclaredValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Geometry a unit is resolved against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitBasis {
    /// The element's client size.
    pub element: Size,
    /// The scroll context's viewport size.
    pub viewport: Size,
}

/// Resolve `value` for `property` into pixels.
///
/// A string whose numeric prefix does not parse, or any non-finite result,
/// is reported as [`GlideError::InvalidUnitValue`] rather than producing NaN.
pub fn resolve(property: &str, value: &DeclaredValue, basis: &UnitBasis) -> Result<f64> {
    let invalid = || GlideError::InvalidUnitValue {
        property: property.to_string(),
        value: match value {
            DeclaredValue::Number(n) => n.to_string(),
            DeclaredValue::Text(s) => s.clone(),
        },
    };

    let px = match value {
        DeclaredValue::Number(n) => *n,
        DeclaredValue::Text(text) => {
            let (number, unit) = split_unit(text.trim()).ok_or_else(invalid)?;
            let number: f64 = number.parse().map_err(|_| invalid())?;
            match unit {
                "px" => number,
                "vh" => number / 100.0 * basis.viewport.height,
                "vw" => number / 100.0 * basis.viewport.width,
                _ => relative_to_self(property, number, basis.element),
            }
        }
    };

    if px.is_finite() { Ok(px) } else { Err(invalid()) }
}

fn relative_to_self(property: &str, percent: f64, element: Size) -> f64 {
    match property {
        "y" => percent / 100.0 * element.height,
        _ => percent / 100.0 * element.width,
    }
}

/// Split `"-12.5vh"` into `("-12.5", "vh")`.
fn split_unit(text: &str) -> Option<(&str, &str)> {
    let end = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    // An exponent marker directly followed by a unit letter belongs to the unit ("1em").
    let (mut number, mut unit) = text.split_at(end);
    if let Some(stripped) = number.strip_suffix(['e', 'E']) {
        number = stripped;
        unit = &text[stripped.len()..];
    }
    if number.is_empty() {
        return None;
    }
    Some((number, unit.trim()))
}
