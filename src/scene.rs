//! Scene files for the headless simulator.
//!
//! A scene is a JSON document holding a page layout, the animation set bound
//! to it and a script of input steps to replay against the engine.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glide_core::headless::SceneDocument;
use glide_core::{AnimationSet, DeltaSource};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    /// Page URL used to key persisted scroll offsets.
    #[serde(default = "default_url")]
    pub url: String,
    pub document: SceneDocument,
    #[serde(default)]
    pub animations: AnimationSet,
    #[serde(default)]
    pub script: Vec<Step>,
}

fn default_url() -> String {
    "about:blank".to_string()
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Which scroll root a step targets: a context index or an element id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Context(u32),
    Element(String),
}

impl Default for Target {
    fn default() -> Self {
        Self::Context(0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Wheel or touch input on an inertial context.
    Wheel {
        #[serde(default)]
        target: Target,
        delta: f64,
        #[serde(default)]
        source: DeltaSource,
    },
    /// Set a native scroll offset and dispatch the scroll event.
    Scroll {
        #[serde(default)]
        target: Target,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    ScrollTo {
        #[serde(default)]
        target: Target,
        distance: f64,
    },
    /// Ease to the element with the given `id` attribute.
    ScrollToElement {
        #[serde(default)]
        target: Target,
        element: String,
        #[serde(default)]
        offset: f64,
    },
    SetScroll {
        #[serde(default)]
        target: Target,
        distance: f64,
    },
    Resize {
        width: f64,
        height: f64,
    },
    /// Drag the scrollbar thumb through each pointer position.
    Scrub {
        #[serde(default)]
        target: Target,
        pointers: Vec<f64>,
    },
    Freeze {
        #[serde(default)]
        target: Target,
    },
    Unfreeze {
        #[serde(default)]
        target: Target,
    },
    Rescan,
    /// Fire pending frames, at most `limit` of them.
    Frames {
        #[serde(default)]
        limit: Option<usize>,
    },
}
