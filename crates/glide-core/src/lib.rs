//! Scroll-driven transform animation engine.
//!
//! Elements opt in through a binding attribute naming an animation; the
//! engine compiles each animation into keyframe tracks whose thresholds are
//! scroll offsets, and on every frame turns the current offset of each
//! scroll context into CSS payloads written through the [`dom::Document`]
//! seam. Contexts can be driven by native scrolling or by the
//! [`inertial::InertialScroller`].

pub mod anchor;
pub mod animations;
pub mod cache;
pub mod dom;
pub mod easing;
pub mod engine;
pub mod error;
pub mod headless;
pub mod inertial;
pub mod keyframes;
pub mod matrix;
pub mod persist;
pub mod registry;
pub mod scheduler;
pub mod synth;
pub mod units;

pub use animations::AnimationSet;
pub use dom::{Document, NodeId, Point, Rect, Size};
pub use engine::{Engine, FrameOutcome};
pub use error::{GlideError, Result};
pub use glide_config::{GlideConfig, ScrollMode};
pub use inertial::{DeltaSource, InertialScroller};
pub use registry::{ContextId, ScrollDriver};
pub use scheduler::{FrameHandle, FrameHost};
