//! 4x4 and 2D affine transform matrices in CSS layout.
//!
//! `Matrix3d` stores its 16 values in the order CSS `matrix3d()` expects
//! (column-major, translation in slots 12..14). `Affine2d` is the six-value
//! form produced by a computed `matrix(a, b, c, d, e, f)` style.
//!
//! Composition follows the same convention as CSS transform lists:
//! `translate.then(&rotate).then(&scale)` applies the scale first.

use serde::{Deserialize, Serialize};

use crate::error::{GlideError, Result};

/// A 4x4 transform matrix in CSS `matrix3d()` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix3d(pub [f64; 16]);

impl Default for Matrix3d {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3d {
    /// The identity matrix.
    pub const fn identity() -> Self {
        Self([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Translation by `(x, y, z)` pixels.
    pub fn translate(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::identity();
        m.0[12] = x;
        m.0[13] = y;
        m.0[14] = z;
        m
    }

    /// Non-uniform scale.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Self::identity();
        m.0[0] = sx;
        m.0[5] = sy;
        m.0[10] = sz;
        m
    }

    /// Rotation about the Z axis by `angle` radians.
    ///
    /// Slot 1 holds `-sin(angle)`, so [`Affine2d::decompose`] recovers the
    /// angle as `atan2(-b, a)`.
    pub fn rotate_z(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let mut m = Self::identity();
        m.0[0] = cos;
        m.0[1] = -sin;
        m.0[4] = sin;
        m.0[5] = cos;
        m
    }

    /// Compose this matrix with another.
    ///
    /// The resulting transform applies `other` first, then `self`.
    pub fn then(&self, other: &Self) -> Self {
        let a = &self.0;
        let b = &other.0;
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = (0..4).map(|k| b[row * 4 + k] * a[k * 4 + col]).sum();
            }
        }
        Self(out)
    }

    /// Fold a list of matrices left to right with [`Matrix3d::then`].
    ///
    /// An empty slice yields the identity.
    pub fn compose_all(matrices: &[Matrix3d]) -> Self {
        matrices
            .iter()
            .fold(Self::identity(), |acc, m| acc.then(m))
    }

    /// Check whether every slot is within `epsilon` of the identity.
    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.0
            .iter()
            .zip(Self::identity().0.iter())
            .all(|(v, i)| (v - i).abs() < epsilon)
    }

    /// The 2D affine part of this matrix.
    pub fn to_affine(&self) -> Affine2d {
        Affine2d {
            a: self.0[0],
            b: self.0[1],
            c: self.0[4],
            d: self.0[5],
            tx: self.0[12],
            ty: self.0[13],
        }
    }

    /// Serialize as a CSS `matrix3d(...)` string.
    pub fn to_css(&self) -> String {
        let values: Vec<String> = self.0.iter().map(|v| css_number(*v)).collect();
        format!("matrix3d({})", values.join(","))
    }

    /// Parse a CSS `matrix3d(...)` string.
    pub fn parse(input: &str) -> Result<Self> {
        let values = parse_function(input, "matrix3d", 16)?;
        let mut out = [0.0; 16];
        out.copy_from_slice(&values);
        Ok(Self(out))
    }
}

/// A 2D affine transform, `matrix(a, b, c, d, tx, ty)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine2d {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Affine2d {
    fn default() -> Self {
        Self::identity()
    }
}

/// Scale/rotation/translation recovered from an [`Affine2d`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParts {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
}

impl Affine2d {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Parse a CSS `matrix(a, b, c, d, e, f)` string.
    pub fn parse(input: &str) -> Result<Self> {
        let v = parse_function(input, "matrix", 6)?;
        Ok(Self {
            a: v[0],
            b: v[1],
            c: v[2],
            d: v[3],
            tx: v[4],
            ty: v[5],
        })
    }

    /// Check if this is approximately an identity transform.
    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.a - 1.0).abs() < epsilon
            && self.b.abs() < epsilon
            && self.c.abs() < epsilon
            && (self.d - 1.0).abs() < epsilon
            && self.tx.abs() < epsilon
            && self.ty.abs() < epsilon
    }

    /// Embed this transform in a 4x4 matrix (Z untouched).
    pub fn to_matrix3d(&self) -> Matrix3d {
        let mut m = Matrix3d::identity();
        m.0[0] = self.a;
        m.0[1] = self.b;
        m.0[4] = self.c;
        m.0[5] = self.d;
        m.0[12] = self.tx;
        m.0[13] = self.ty;
        m
    }

    /// Decompose into scale, rotation and translation.
    ///
    /// `scale_x = sign(a)·√(a²+b²)`, `scale_y = sign(d)·√(c²+d²)`,
    /// `rotation = atan2(-b, a)`. Skew is not recovered. A zero `a` or `d`
    /// counts as positive.
    pub fn decompose(&self) -> AffineParts {
        AffineParts {
            translate_x: self.tx,
            translate_y: self.ty,
            scale_x: sign(self.a) * self.a.hypot(self.b),
            scale_y: sign(self.d) * self.c.hypot(self.d),
            rotation: (-self.b).atan2(self.a),
        }
    }
}

/// The transform an element carried before any animation was applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InitialTransform {
    #[default]
    Identity,
    Affine(Affine2d),
    Matrix(Matrix3d),
}

impl InitialTransform {
    /// Parse a computed `transform` value: `none`, `matrix(...)` or `matrix3d(...)`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::Identity);
        }
        if trimmed.to_ascii_lowercase().starts_with("matrix3d") {
            return Ok(Self::Matrix(Matrix3d::parse(trimmed)?));
        }
        Ok(Self::Affine(Affine2d::parse(trimmed)?))
    }

    /// The 4x4 form of this transform.
    pub fn to_matrix3d(&self) -> Matrix3d {
        match self {
            Self::Identity => Matrix3d::identity(),
            Self::Affine(affine) => affine.to_matrix3d(),
            Self::Matrix(m) => *m,
        }
    }

    pub fn is_3d(&self) -> bool {
        matches!(self, Self::Matrix(_))
    }
}

fn sign(v: f64) -> f64 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

fn parse_function(input: &str, name: &str, arity: usize) -> Result<Vec<f64>> {
    let malformed = || GlideError::MalformedMatrix(input.to_string());
    let trimmed = input.trim();
    let open = trimmed.find('(').ok_or_else(malformed)?;
    if !trimmed[..open].trim().eq_ignore_ascii_case(name) || !trimmed.ends_with(')') {
        return Err(malformed());
    }

    let body = &trimmed[open + 1..trimmed.len() - 1];
    let values = body
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;

    if values.len() != arity || values.iter().any(|v| !v.is_finite()) {
        return Err(malformed());
    }
    Ok(values)
}

/// Format a number for CSS output: at most four decimals, no trailing zeros,
/// never `-0`.
pub fn css_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.4}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
