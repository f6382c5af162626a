//! Trigger expressions: where an element anchor meets a screen anchor.
//!
//! A trigger `top_bottom` fires when the element's top edge reaches the
//! bottom of the viewport. Resolving it against a measured rect yields the
//! scroll offset at which that happens:
//!
//! ```text
//! offset = rect.top + fraction(elem) * rect.height - fraction(screen) * viewport.height
//! ```
//!
//! Horizontal anchors (`left`, `hcenter`, `right`) use the X extent instead.

use std::fmt;
use std::str::FromStr;

use crate::dom::{Rect, Size};
use crate::error::{GlideError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// A named reference point on an element or on the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Top,
    Center,
    Bottom,
    Left,
    HCenter,
    Right,
}

impl Anchor {
    pub fn axis(self) -> Axis {
        match self {
            Self::Top | Self::Center | Self::Bottom => Axis::Vertical,
            Self::Left | Self::HCenter | Self::Right => Axis::Horizontal,
        }
    }

    /// Position along the anchor's axis as a fraction of the extent.
    pub fn fraction(self) -> f64 {
        match self {
            Self::Top | Self::Left => 0.0,
            Self::Center | Self::HCenter => 0.5,
            Self::Bottom | Self::Right => 1.0,
        }
    }

    fn token(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::HCenter => "hcenter",
            Self::Right => "right",
        }
    }
}

impl FromStr for Anchor {
    type Err = GlideError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "hcenter" => Ok(Self::HCenter),
            "right" => Ok(Self::Right),
            other => Err(GlideError::UnknownAnchor(other.to_string())),
        }
    }
}

/// An `ELEM × SCREEN` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub element: Anchor,
    pub screen: Anchor,
}

impl Trigger {
    pub fn new(element: Anchor, screen: Anchor) -> Result<Self> {
        if element.axis() != screen.axis() {
            return Err(GlideError::MismatchedAnchorAxes(format!(
                "{}_{}",
                element.token(),
                screen.token()
            )));
        }
        Ok(Self { element, screen })
    }

    /// Parse `"ELEM_SCREEN"`. Anything other than exactly two tokens is an error.
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split('_').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(GlideError::MalformedTrigger(expression.to_string()));
        }
        Self::from_pair(parts[0], parts[1])
    }

    /// Build from two separate tokens, as in the array form of `when`.
    pub fn from_pair(element: &str, screen: &str) -> Result<Self> {
        Self::new(element.parse()?, screen.parse()?)
    }

    pub fn axis(&self) -> Axis {
        self.element.axis()
    }

    /// Scroll offset at which the two anchors coincide.
    ///
    /// `rect` is measured in the scroll context's content space and
    /// `viewport` is that context's visible size.
    pub fn resolve(&self, rect: &Rect, viewport: Size) -> f64 {
        let (start, extent, screen_extent) = match self.axis() {
            Axis::Vertical => (rect.top, rect.height, viewport.height),
            Axis::Horizontal => (rect.left, rect.width, viewport.width),
        };
        let element_position = start + self.element.fraction() * extent;
        let screen_position = self.screen.fraction() * screen_extent;
        element_position - screen_position
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.element.token(), self.screen.token())
    }
}
