//! Inertial smooth-scroll integrator.
//!
//! The scroller keeps a signed `offset` (0 at the start of the content,
//! negative as the user moves forward) and a `target`. Input moves the
//! target; each frame [`InertialScroller::tick`] eases the offset toward it:
//!
//! ```text
//! offset = offset + (target - offset) * smoothing
//! ```
//!
//! The target is always clamped to `[-(content - viewport), 0]`, so the
//! offset never leaves the content bounds.

use glide_config::{ScrollMode, ScrollSettings};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dom::{Point, Rect, Size};

/// Where a delta came from; selects the input multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaSource {
    /// Pixel-mode wheel or trackpad.
    #[default]
    Wheel,
    /// Line-mode wheel (Firefox `deltaMode == 1`).
    Line,
    /// Touch drag.
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    /// `offset == target`, no frame needed.
    #[default]
    Idle,
    /// Easing toward the target; the frame loop is armed.
    Settling,
}

/// Result of one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// The offset moved by more than the settle epsilon; re-arm.
    Moved(f64),
    /// The offset reached the target and the scroller is idle.
    Settled(f64),
}

#[derive(Debug, Clone)]
pub struct InertialScroller {
    mode: ScrollMode,
    smoothing: f64,
    scrub_smoothing: f64,
    epsilon: f64,
    wheel_multiplier: f64,
    touch_multiplier: f64,
    line_multiplier: f64,

    offset: f64,
    target: f64,
    last: f64,
    /// Content and viewport extent along the primary axis.
    content: f64,
    viewport: f64,

    state: ScrollState,
    frozen: bool,
    scrubbing: bool,
}

impl InertialScroller {
    pub fn new(settings: &ScrollSettings) -> Self {
        Self {
            mode: settings.mode,
            smoothing: settings.smoothing,
            scrub_smoothing: settings.scrub_smoothing,
            epsilon: settings.settle_epsilon,
            wheel_multiplier: settings.wheel_multiplier,
            touch_multiplier: settings.touch_multiplier,
            line_multiplier: settings.line_multiplier,
            offset: 0.0,
            target: 0.0,
            last: 0.0,
            content: 0.0,
            viewport: 0.0,
            state: ScrollState::Idle,
            frozen: false,
            scrubbing: false,
        }
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    /// Signed offset; 0 at the start, negative when scrolled.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Scrolled distance (`-offset`).
    pub fn distance(&self) -> f64 {
        -self.offset
    }

    /// The scrolled distance as a point on the primary axis.
    pub fn position(&self) -> Point {
        match self.mode {
            ScrollMode::Vertical => Point::new(0.0, self.distance()),
            ScrollMode::Horizontal => Point::new(self.distance(), 0.0),
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// Most negative reachable offset.
    pub fn min_offset(&self) -> f64 {
        -(self.content - self.viewport).max(0.0)
    }

    /// Update content and viewport dimensions and re-clamp.
    pub fn set_bounds(&mut self, content: Size, viewport: Size) {
        (self.content, self.viewport) = match self.mode {
            ScrollMode::Vertical => (content.height, viewport.height),
            ScrollMode::Horizontal => (content.width, viewport.width),
        };
        self.target = self.clamp(self.target);
        self.offset = self.clamp(self.offset);
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_offset(), 0.0)
    }

    /// Apply one input delta. Positive deltas move forward (down or right).
    ///
    /// Returns `false` when the scroller is frozen.
    pub fn on_delta(&mut self, delta: f64, source: DeltaSource) -> bool {
        if self.frozen {
            return false;
        }
        let multiplier = match source {
            DeltaSource::Wheel => self.wheel_multiplier,
            DeltaSource::Line => self.line_multiplier,
            DeltaSource::Touch => self.touch_multiplier,
        };
        self.target = self.clamp(self.target - delta * multiplier);
        self.state = ScrollState::Settling;
        true
    }

    /// One frame of exponential smoothing.
    pub fn tick(&mut self) -> Tick {
        let coefficient = if self.scrubbing {
            self.scrub_smoothing
        } else {
            self.smoothing
        };
        self.offset += (self.target - self.offset) * coefficient;

        let moved = (self.offset - self.last).abs() > self.epsilon;
        if moved {
            self.last = self.offset;
            self.state = ScrollState::Settling;
            trace!(offset = self.offset, target = self.target, "inertial tick");
            return Tick::Moved(self.offset);
        }

        self.offset = self.target;
        self.last = self.target;
        self.state = ScrollState::Idle;
        Tick::Settled(self.offset)
    }

    /// Ease toward `distance` from the start of the content.
    pub fn scroll_to(&mut self, distance: f64) {
        self.target = self.clamp(-distance);
        self.state = ScrollState::Settling;
    }

    /// Ease toward a content-space rect, `offset` pixels past its start.
    pub fn scroll_to_rect(&mut self, rect: &Rect, offset: f64) {
        let start = match self.mode {
            ScrollMode::Vertical => rect.top,
            ScrollMode::Horizontal => rect.left,
        };
        self.scroll_to(start + offset);
    }

    /// Jump to `distance` without easing.
    pub fn set_scroll(&mut self, distance: f64) {
        let value = self.clamp(-distance);
        self.offset = value;
        self.target = value;
        self.last = value;
        self.state = ScrollState::Idle;
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    pub fn begin_scrub(&mut self) {
        self.scrubbing = true;
    }

    /// Map a pointer coordinate over the viewport onto the content.
    pub fn scrub_to(&mut self, pointer: f64) {
        if self.viewport <= 0.0 {
            return;
        }
        self.scroll_to(pointer / self.viewport * self.content);
    }

    pub fn end_scrub(&mut self) {
        self.scrubbing = false;
    }

    /// Normalised position in `[0, 1]` for an external scrollbar.
    pub fn thumb_progress(&self) -> f64 {
        let range = self.content - self.viewport;
        if range <= 0.0 {
            return 0.0;
        }
        (-self.offset / range).clamp(0.0, 1.0)
    }

    /// Thumb length as a fraction of the track.
    pub fn thumb_size(&self) -> f64 {
        if self.content <= 0.0 {
            return 1.0;
        }
        (self.viewport / self.content).clamp(0.0, 1.0)
    }

    /// Thumb translation in percent of the viewport.
    pub fn thumb_translate(&self) -> f64 {
        self.thumb_progress() * (100.0 - self.thumb_size() * 100.0)
    }
}
