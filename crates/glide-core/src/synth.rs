//! Turning resolved property values into a style payload.
//!
//! Transform properties (`x`, `y`, `z`, `rotation`, `scaleX`, `scaleY`,
//! `scaleZ`) are folded into a single `transform` entry; any other property
//! passes through as a plain number. Rotation is declared in degrees.
//!
//! The modes do not agree on the direction of `rotation`. The list forms
//! emit `rotate(deg)`, which turns clockwise on screen. [`TransformMode::Matrix3d`]
//! builds [`Matrix3d::rotate_z`], which stores `-sin` in slot 1 of the
//! column-major array and therefore turns the same angle counter-clockwise.
//! Animations that must look the same on 3D and 2D elements should not rely
//! on a signed `rotation`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::matrix::{InitialTransform, Matrix3d, css_number};

/// Property names consumed by the transform string.
pub const TRANSFORM_PROPERTIES: [&str; 7] =
    ["x", "y", "z", "rotation", "scaleX", "scaleY", "scaleZ"];

pub fn is_transform_property(name: &str) -> bool {
    TRANSFORM_PROPERTIES.contains(&name)
}

/// How an element's transform is written. Chosen once at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    /// Node inside an SVG subtree (not the root): plain 2D transform list.
    SvgLeaf,
    /// `matrix3d(...)` composed on top of the captured initial matrix.
    Matrix3d,
    /// 2D transform list, followed by the initial affine state if any.
    Affine2d,
}

impl TransformMode {
    pub fn select(is_svg_leaf: bool, force_3d: bool, initial: &InitialTransform) -> Self {
        if is_svg_leaf {
            Self::SvgLeaf
        } else if force_3d || initial.is_3d() {
            Self::Matrix3d
        } else {
            Self::Affine2d
        }
    }
}

/// Property values resolved for one element in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedValues(BTreeMap<String, f64>);

impl ResolvedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, property: impl Into<String>, value: f64) {
        self.0.insert(property.into(), value);
    }

    pub fn get(&self, property: &str) -> Option<f64> {
        self.0.get(property).copied()
    }

    fn or(&self, property: &str, default: f64) -> f64 {
        self.get(property).unwrap_or(default)
    }

    fn has_transform(&self) -> bool {
        TRANSFORM_PROPERTIES.iter().any(|p| self.0.contains_key(*p))
    }
}

impl FromIterator<(String, f64)> for ResolvedValues {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// CSS property name to value, ordered so that comparisons and
/// serialization are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransformPayload(BTreeMap<String, String>);

impl TransformPayload {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.0.insert(property.into(), value.into());
    }
}

/// Build the payload for one element.
pub fn synthesize(
    mode: TransformMode,
    initial: &InitialTransform,
    values: &ResolvedValues,
) -> TransformPayload {
    let mut payload = TransformPayload::default();

    for (property, value) in &values.0 {
        if !is_transform_property(property) {
            payload.insert(property.clone(), css_number(*value));
        }
    }

    if values.has_transform() {
        let transform = match mode {
            TransformMode::SvgLeaf => transform_list(values),
            TransformMode::Affine2d => compose_affine(initial, values),
            TransformMode::Matrix3d => compose_matrix(initial, values),
        };
        payload.insert("transform", transform);
    }

    payload
}

/// `translate(x, y) rotate(deg) scale(sx, sy)` with neutral defaults.
fn transform_list(values: &ResolvedValues) -> String {
    format_list(
        values.or("x", 0.0),
        values.or("y", 0.0),
        values.or("rotation", 0.0),
        values.or("scaleX", 1.0),
        values.or("scaleY", 1.0),
    )
}

fn format_list(x: f64, y: f64, rotation_deg: f64, sx: f64, sy: f64) -> String {
    format!(
        "translate({}px, {}px) rotate({}deg) scale({}, {})",
        css_number(x),
        css_number(y),
        css_number(rotation_deg),
        css_number(sx),
        css_number(sy)
    )
}

fn compose_affine(initial: &InitialTransform, values: &ResolvedValues) -> String {
    let animated = transform_list(values);
    let InitialTransform::Affine(affine) = initial else {
        return animated;
    };
    if affine.is_identity(1e-9) {
        return animated;
    }

    let parts = affine.decompose();
    let initial_list = format_list(
        parts.translate_x,
        parts.translate_y,
        parts.rotation.to_degrees(),
        parts.scale_x,
        parts.scale_y,
    );
    format!("{animated} {initial_list}")
}

fn compose_matrix(initial: &InitialTransform, values: &ResolvedValues) -> String {
    Matrix3d::compose_all(&[
        initial.to_matrix3d(),
        Matrix3d::translate(values.or("x", 0.0), values.or("y", 0.0), values.or("z", 0.0)),
        Matrix3d::rotate_z(values.or("rotation", 0.0).to_radians()),
        Matrix3d::scale(
            values.or("scaleX", 1.0),
            values.or("scaleY", 1.0),
            values.or("scaleZ", 1.0),
        ),
    ])
    .to_css()
}
