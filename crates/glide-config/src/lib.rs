//! Glide configuration system
//!
//! This crate provides centralized configuration management for the glide
//! scroll engine, loading settings from `glide.toml` with environment
//! variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the glide engine
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GlideConfig {
    /// Inertial scrolling settings
    pub scroll: ScrollSettings,
    /// DOM binding attribute and class names
    pub binding: BindingSettings,
    /// Frame scheduling settings
    pub frame: FrameSettings,
}

/// Primary axis driven by an inertial scroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMode {
    #[default]
    Vertical,
    Horizontal,
}

impl ScrollMode {
    /// Parse a mode name as used in config files and environment variables.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "vertical" | "v" => Some(Self::Vertical),
            "horizontal" | "h" => Some(Self::Horizontal),
            _ => None,
        }
    }
}

/// Inertial scroll integrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollSettings {
    /// Drive the document root with the inertial scroller instead of
    /// native scrolling
    pub smooth: bool,
    /// Axis the smooth scroller moves along
    pub mode: ScrollMode,
    /// Exponential smoothing coefficient applied each frame
    pub smoothing: f64,
    /// Smoothing coefficient used while the user drags the scrollbar thumb
    pub scrub_smoothing: f64,
    /// Per-frame movement below which the scroller settles
    pub settle_epsilon: f64,
    /// Multiplier for mouse wheel deltas
    pub wheel_multiplier: f64,
    /// Multiplier for touch drag deltas
    pub touch_multiplier: f64,
    /// Multiplier for line-mode wheel deltas (Firefox style)
    pub line_multiplier: f64,
    /// Persist scroll offsets per page for the session
    pub persist: bool,
    /// Viewports ahead of a section before it is culled
    pub cull_lead_viewports: f64,
    /// Viewports behind a section before it is culled
    pub cull_trail_viewports: f64,
}

/// Attribute and class names used to discover bound nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BindingSettings {
    /// Attribute holding an element's animation id
    pub animation_attribute: String,
    /// Boolean-style attribute marking a nested scroll root
    pub scroll_root_attribute: String,
    /// Attribute marking a top-level section for the smooth scroller
    pub section_attribute: String,
    /// Class that opts a section out of translation
    pub sticky_class: String,
    /// Class toggled on sections inside the culling window
    pub visible_class: String,
    /// Class added to sections while they sleep outside the culling window
    pub inactive_class: String,
}

/// Frame scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FrameSettings {
    /// Optional frame-rate cap; `None` runs on every host frame
    pub target_fps: Option<u32>,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            smooth: true,
            mode: ScrollMode::Vertical,
            smoothing: 0.1,
            scrub_smoothing: 0.05,
            settle_epsilon: 0.01,
            wheel_multiplier: 0.4,
            touch_multiplier: 2.0,
            line_multiplier: 75.0,
            persist: true,
            cull_lead_viewports: 1.0,
            cull_trail_viewports: 2.0,
        }
    }
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            animation_attribute: "data-animation".to_string(),
            scroll_root_attribute: "data-scroll-root".to_string(),
            section_attribute: "data-scroll-section".to_string(),
            sticky_class: "js-sticky".to_string(),
            visible_class: "section-visible".to_string(),
            inactive_class: "inactive".to_string(),
        }
    }
}

impl GlideConfig {
    /// Load configuration from a TOML file
    ///
    /// # Returns
    /// * `Ok(GlideConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from `glide.toml` in the current directory
    /// or return default configuration if the file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("glide.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(mode) = std::env::var("GLIDE_SCROLL_MODE") {
            if let Some(mode) = ScrollMode::parse(&mode) {
                self.scroll.mode = mode;
            }
        }
        if let Ok(val) = std::env::var("GLIDE_SMOOTHING") {
            if let Ok(smoothing) = val.parse::<f64>() {
                self.scroll.smoothing = smoothing;
            }
        }
        if let Ok(val) = std::env::var("GLIDE_SMOOTH") {
            self.scroll.smooth = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("GLIDE_PERSIST") {
            self.scroll.persist = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("GLIDE_TARGET_FPS") {
            self.frame.target_fps = val.parse::<u32>().ok().filter(|fps| *fps > 0);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from glide.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }

    /// Clamp numeric settings into the ranges the integrator can work with.
    pub fn sanitized(mut self) -> Self {
        self.scroll.smoothing = sanitize_coefficient(self.scroll.smoothing, 0.1);
        self.scroll.scrub_smoothing = sanitize_coefficient(self.scroll.scrub_smoothing, 0.05);
        if !(self.scroll.settle_epsilon.is_finite() && self.scroll.settle_epsilon > 0.0) {
            self.scroll.settle_epsilon = 0.01;
        }
        self
    }
}

fn sanitize_coefficient(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        value
    } else {
        fallback
    }
}
