// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform for placing quads.
//!
//! Quads only ever need a translation composed with a rotation about z, plus
//! a way to hand the result to a GPU as `f32`. This type covers that, and the
//! look-at/perspective helpers in `actfield_render` build on it, without a
//! full linear-algebra crate.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column*, matching WGSL `mat4x4<f32>` layout once
/// converted with [`to_cols_f32`](Self::to_cols_f32).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four columns.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Creates a pure translation.
    #[inline]
    #[must_use]
    pub const fn from_translation(t: [f64; 3]) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [t[0], t[1], t[2], 1.0],
            ],
        }
    }

    /// Creates a rotation about the z axis (radians, counter-clockwise).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        #[cfg(feature = "std")]
        let (s, c) = radians.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// The model matrix of a quad: rotate about z, then translate.
    #[inline]
    #[must_use]
    pub fn quad_model(translation: [f64; 3], rotation_z: f64) -> Self {
        Self::from_translation(translation) * Self::from_rotation_z(rotation_z)
    }

    /// The translation column.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> [f64; 3] {
        let t = self.cols[3];
        [t[0], t[1], t[2]]
    }

    /// Applies the transform to a point (w = 1).
    #[must_use]
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let c = &self.cols;
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = c[0][i] * p[0] + c[1][i] * p[1] + c[2][i] * p[2] + c[3][i];
        }
        out
    }

    /// Flattens to sixteen `f32` values, column by column.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "GPU uniforms are single precision"
    )]
    pub fn to_cols_f32(&self) -> [f32; 16] {
        let mut out = [0.0_f32; 16];
        for (j, col) in self.cols.iter().enumerate() {
            for (i, v) in col.iter().enumerate() {
                out[j * 4 + i] = *v as f32;
            }
        }
        out
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < EPS)
    }

    #[test]
    fn identity_is_default() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn quad_model_rotates_then_translates() {
        let m = Transform3d::quad_model([10.0, 0.0, 5.0], -core::f64::consts::FRAC_PI_2);
        // The quad's local +x edge ends up pointing down -y.
        let p = m.transform_point([1.0, 0.0, 0.0]);
        assert!(close(p, [10.0, -1.0, 5.0]), "got {p:?}");
        assert!(close(m.translation(), [10.0, 0.0, 5.0]));
    }

    #[test]
    fn multiply_composes_translations() {
        let a = Transform3d::from_translation([1.0, 2.0, 3.0]);
        let b = Transform3d::from_translation([4.0, 5.0, 6.0]);
        assert!(close((a * b).translation(), [5.0, 7.0, 9.0]));
    }

    #[test]
    fn f32_columns_are_column_major() {
        let m = Transform3d::from_translation([1.0, 2.0, 3.0]);
        let f = m.to_cols_f32();
        assert_eq!(&f[12..16], &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(f[0], 1.0);
        assert_eq!(f[5], 1.0);
    }
}
