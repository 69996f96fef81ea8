// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Perspective camera orbiting a target point.

use actfield_core::transform::Transform3d;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: Vec3) -> Vec3 {
    let len = dot(v, v).sqrt();
    if len == 0.0 {
        v
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

/// A right-handed perspective camera looking at `target` from `eye`.
///
/// Projection maps depth to `0..1`, as wgpu expects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    /// Camera position.
    pub eye: Vec3,
    /// Point the camera looks at and orbits around.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Width over height of the viewport.
    pub aspect: f64,
    /// Near clip distance.
    pub near: f64,
    /// Far clip distance.
    pub far: f64,
}

impl OrbitCamera {
    /// Looking at the origin from above and in front of the field.
    pub const DEFAULT: Self = Self {
        eye: [5.0, 16.0, 26.0],
        target: [0.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
        fov_y: core::f64::consts::FRAC_PI_4,
        aspect: 1.0,
        near: 0.1,
        far: 1000.0,
    };

    /// The default camera with the aspect ratio of a `width` × `height`
    /// viewport.
    #[must_use]
    pub fn with_viewport(width: u32, height: u32) -> Self {
        let mut camera = Self::DEFAULT;
        camera.set_viewport(width, height);
        camera
    }

    /// Updates the aspect ratio. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = f64::from(width) / f64::from(height);
        }
    }

    /// Distance from the eye to the target.
    #[must_use]
    pub fn distance(&self) -> f64 {
        let d = sub(self.eye, self.target);
        dot(d, d).sqrt()
    }

    /// Rotates the eye about the up axis through the target.
    ///
    /// Assumes `up` is the y axis.
    pub fn orbit(&mut self, yaw: f64) {
        let d = sub(self.eye, self.target);
        let (s, c) = (yaw.sin(), yaw.cos());
        self.eye = [
            self.target[0] + d[0] * c + d[2] * s,
            self.eye[1],
            self.target[2] - d[0] * s + d[2] * c,
        ];
    }

    /// Moves the eye toward (`factor < 1`) or away from the target.
    ///
    /// Non-positive factors are ignored.
    pub fn zoom(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let d = sub(self.eye, self.target);
        self.eye = [
            self.target[0] + d[0] * factor,
            self.target[1] + d[1] * factor,
            self.target[2] + d[2] * factor,
        ];
    }

    /// World-to-view transform.
    #[must_use]
    pub fn view(&self) -> Transform3d {
        let f = normalize(sub(self.target, self.eye));
        let s = normalize(cross(f, self.up));
        let u = cross(s, f);
        Transform3d::from_cols(
            [s[0], u[0], -f[0], 0.0],
            [s[1], u[1], -f[1], 0.0],
            [s[2], u[2], -f[2], 0.0],
            [-dot(s, self.eye), -dot(u, self.eye), dot(f, self.eye), 1.0],
        )
    }

    /// View-to-clip transform.
    #[must_use]
    pub fn projection(&self) -> Transform3d {
        let h = 1.0 / (self.fov_y * 0.5).tan();
        let w = h / self.aspect;
        let r = self.far / (self.near - self.far);
        Transform3d::from_cols(
            [w, 0.0, 0.0, 0.0],
            [0.0, h, 0.0, 0.0],
            [0.0, 0.0, r, -1.0],
            [0.0, 0.0, r * self.near, 0.0],
        )
    }

    /// Window position of a world point in a `width` × `height` viewport,
    /// top-left origin.
    ///
    /// Returns `None` for points behind the eye.
    #[must_use]
    pub fn project(&self, world: [f64; 3], width: u32, height: u32) -> Option<kurbo::Point> {
        let c = (self.projection() * self.view()).cols;
        let clip: [f64; 4] = core::array::from_fn(|r| {
            c[0][r] * world[0] + c[1][r] * world[1] + c[2][r] * world[2] + c[3][r]
        });
        if clip[3] <= 0.0 {
            return None;
        }
        let (x, y) = (clip[0] / clip[3], clip[1] / clip[3]);
        Some(kurbo::Point::new(
            (x * 0.5 + 0.5) * f64::from(width),
            (0.5 - y * 0.5) * f64::from(height),
        ))
    }

    /// Combined world-to-clip transform as column-major `f32`.
    #[must_use]
    pub fn view_projection(&self) -> [f32; 16] {
        (self.projection() * self.view()).to_cols_f32()
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::DEFAULT
    }
}
