//! Declarative animation configuration.
//!
//! An [`AnimationSet`] maps an animation id (the value of the binding
//! attribute) to either a flat list of property-trigger records applied to
//! the bound element itself, or a group whose children are selected under it.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "hero": [
//!     { "when": "top_bottom", "y": "20vh", "opacity": 0 },
//!     { "when": "top_top", "y": 0, "opacity": 1 }
//!   ],
//!   "img_parallax": {
//!     "ease": "easeOutQuad",
//!     "force3d": true,
//!     "children": [
//!       { "selector": ".parallax", "props": [
//!         { "when": ["left", "right"], "scaleX": 0, "rotation": 0 },
//!         { "when": ["right", "left"], "scaleX": 4, "rotation": 360 }
//!       ] }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::anchor::Trigger;
use crate::dom::Rect;
use crate::easing::Easing;
use crate::error::{GlideError, Result};
use crate::keyframes::{ControlPoint, KeyframeTrack};
use crate::units::{self, DeclaredValue, UnitBasis};

/// All animations known to the engine, keyed by animation id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationSet(pub BTreeMap<String, AnimationDef>);

impl AnimationSet {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, id: &str) -> Option<&AnimationDef> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, def: AnimationDef) {
        self.0.insert(id.into(), def);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimationDef {
    /// Records applied to the bound element itself.
    Flat(Vec<PropertyTrigger>),
    /// Records applied to children selected under the bound element.
    Group(AnimationGroup),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationGroup {
    /// Easing applied to every track unless a record overrides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<String>,
    /// Write `matrix3d(...)` transforms.
    #[serde(default)]
    pub force3d: bool,
    pub children: Vec<ChildAnimation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildAnimation {
    pub selector: String,
    pub props: Vec<PropertyTrigger>,
}

/// One keyframe record: a trigger plus the property values at that trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTrigger {
    pub when: When,
    /// Easing for the properties declared in this record. When several
    /// records declaring the same property carry one, the last wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, DeclaredValue>,
}

/// `"top_bottom"` or `["top", "bottom"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum When {
    Expression(String),
    Pair([String; 2]),
}

impl When {
    pub fn trigger(&self) -> Result<Trigger> {
        match self {
            Self::Expression(expr) => Trigger::parse(expr),
            Self::Pair([element, screen]) => Trigger::from_pair(element, screen),
        }
    }
}

/// Everything needed to turn records into pixel-space tracks for one element.
#[derive(Debug, Clone, Copy)]
pub struct BindGeometry {
    /// Element rect in its scroll context's content space.
    pub rect: Rect,
    pub basis: UnitBasis,
}

/// Compile keyframe records into one track per declared property.
///
/// An empty record list compiles to no tracks. Malformed triggers, unit
/// values or easing names, and properties declared only once, are errors.
pub fn compile_tracks(
    animation_id: &str,
    records: &[PropertyTrigger],
    default_ease: Option<&str>,
    geometry: &BindGeometry,
) -> Result<Vec<KeyframeTrack>> {
    struct Pending {
        axis: crate::anchor::Axis,
        points: Vec<ControlPoint>,
        ease: Option<String>,
    }

    let mut pending: BTreeMap<&str, Pending> = BTreeMap::new();

    for record in records {
        let trigger = record.when.trigger()?;
        let threshold = trigger.resolve(&geometry.rect, geometry.basis.viewport);

        for (property, declared) in &record.values {
            let value = units::resolve(property, declared, &geometry.basis)?;
            let entry = pending.entry(property.as_str()).or_insert_with(|| Pending {
                axis: trigger.axis(),
                points: Vec::new(),
                ease: None,
            });
            if entry.axis != trigger.axis() {
                return Err(GlideError::MismatchedAnchorAxes(trigger.to_string()));
            }
            entry.points.push(ControlPoint::new(threshold, value));
            if let Some(ease) = &record.ease {
                entry.ease = Some(ease.clone());
            }
        }
    }

    pending
        .into_iter()
        .map(|(property, p)| {
            let easing = p
                .ease
                .as_deref()
                .or(default_ease)
                .map(Easing::from_name)
                .transpose()?;
            KeyframeTrack::new(property, p.axis, p.points, easing).ok_or_else(|| {
                GlideError::IncompleteTrack {
                    animation: animation_id.to_string(),
                    property: property.to_string(),
                }
            })
        })
        .collect()
}
