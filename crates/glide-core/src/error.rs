//! Error types for the glide engine.

use thiserror::Error;

/// Errors raised while binding animations or driving scroll contexts.
///
/// Configuration errors surface at bind time (during a rescan) so that a
/// malformed declaration never reaches the style output.
#[derive(Debug, Error)]
pub enum GlideError {
    #[error("malformed trigger `{0}` (expects ELEM_SCREEN, e.g. `top_bottom`)")]
    MalformedTrigger(String),

    #[error("unknown anchor `{0}`")]
    UnknownAnchor(String),

    #[error("trigger `{0}` mixes a vertical and a horizontal anchor")]
    MismatchedAnchorAxes(String),

    #[error("invalid value `{value}` for property `{property}`")]
    InvalidUnitValue { property: String, value: String },

    #[error("property `{property}` of animation `{animation}` needs at least two keyframes")]
    IncompleteTrack { animation: String, property: String },

    #[error("unknown easing `{0}`")]
    UnknownEasing(String),

    #[error("`{0}` is not a matrix")]
    MalformedMatrix(String),

    #[error("unknown scroll context {0}")]
    UnknownContext(u32),

    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, GlideError>;
