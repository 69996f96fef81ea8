// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-space edits on a single channel.
//!
//! The free functions are total: out-of-range coordinates are clamped and
//! resampling is nearest-neighbor. [`Transformation`] packages one call with
//! its parameters so the editor can store, replay, and describe it.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::slice::SliceBuffer;

/// Half-open pixel rectangle `[x1, x2) × [y1, y2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left column (inclusive).
    pub x1: u32,
    /// Top row (inclusive).
    pub y1: u32,
    /// Right column (exclusive).
    pub x2: u32,
    /// Bottom row (exclusive).
    pub y2: u32,
}

impl PixelRect {
    /// Creates a rectangle from its corners.
    #[inline]
    #[must_use]
    pub const fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A `size × size` square with its top-left corner at `(x, y)`.
    #[inline]
    #[must_use]
    pub const fn square(x: u32, y: u32, size: u32) -> Self {
        Self::new(x, y, x.saturating_add(size), y.saturating_add(size))
    }
}

/// Sets every element to `value`.
pub fn fill(buffer: &mut [f32], value: f32) {
    buffer.fill(value);
}

/// Replaces each element inside `rect` with `f(element)`.
///
/// The grid height is `buffer.len() / width`. Rows and columns beyond the grid
/// are skipped, so a partially out-of-range rectangle only touches the part
/// that overlaps.
pub fn rect_fill(buffer: &mut [f32], width: u32, rect: PixelRect, mut f: impl FnMut(f32) -> f32) {
    if width == 0 {
        return;
    }
    let w = width as usize;
    let h = buffer.len() / w;
    let x2 = (rect.x2 as usize).min(w);
    let y2 = (rect.y2 as usize).min(h);
    let x1 = rect.x1 as usize;
    for y in (rect.y1 as usize)..y2 {
        if x1 >= x2 {
            break;
        }
        for v in &mut buffer[y * w + x1..y * w + x2] {
            *v = f(*v);
        }
    }
}

/// Rotates about the grid center by `radians`, nearest-neighbor.
///
/// Each source pixel is mapped forward onto the rounded destination
/// coordinate. Destinations that no source lands on stay zero, and sources
/// that land outside the grid are dropped.
///
/// # Panics
///
/// Panics if `buffer.len() != width * height`.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "rounded coordinates are range-checked before the cast"
)]
pub fn rotate(buffer: &[f32], width: u32, height: u32, radians: f64) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    assert_eq!(buffer.len(), w * h, "rotate: buffer is not {width}x{height}");
    let cx = (f64::from(width) - 1.0) / 2.0;
    let cy = (f64::from(height) - 1.0) / 2.0;
    let (s, c) = (radians.sin(), radians.cos());
    let (wf, hf) = (f64::from(width), f64::from(height));

    let mut out = vec![0.0; buffer.len()];
    for y in 0..h {
        let dy = y as f64 - cy;
        for x in 0..w {
            let dx = x as f64 - cx;
            let xp = (dx * c - dy * s + cx).round();
            let yp = (dx * s + dy * c + cy).round();
            if xp >= 0.0 && yp >= 0.0 && xp < wf && yp < hf {
                out[yp as usize * w + xp as usize] = buffer[y * w + x];
            }
        }
    }
    out
}

/// Scales about the grid center by `factor`, nearest-neighbor.
///
/// Output pixel `(x, y)` samples `round((x - cx) * factor + cx)` (likewise for
/// y). Samples outside the grid are clamped to the nearest edge. A factor
/// below 1 magnifies, above 1 shrinks.
///
/// # Panics
///
/// Panics if `buffer.len() != width * height`.
#[must_use]
pub fn scale(buffer: &[f32], width: u32, height: u32, factor: f64) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    assert_eq!(buffer.len(), w * h, "scale: buffer is not {width}x{height}");
    let cx = (f64::from(width) - 1.0) / 2.0;
    let cy = (f64::from(height) - 1.0) / 2.0;

    let mut out = vec![0.0; buffer.len()];
    for y in 0..h {
        let sy = clamp_index((y as f64 - cy) * factor + cy, h);
        for x in 0..w {
            let sx = clamp_index((x as f64 - cx) * factor + cx, w);
            out[y * w + x] = buffer[sy * w + sx];
        }
    }
    out
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped into [0, len - 1] before the cast"
)]
fn clamp_index(v: f64, len: usize) -> usize {
    let v = v.round();
    let last = len.saturating_sub(1);
    if v.is_nan() || v <= 0.0 {
        0
    } else if v >= last as f64 {
        last
    } else {
        v as usize
    }
}

/// What a rectangle edit does to each covered element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RectOp {
    /// Replace with a constant.
    Set(f32),
    /// Add a signed offset (brush strokes).
    Offset(f32),
}

impl RectOp {
    /// Applies the operation to one element.
    #[inline]
    #[must_use]
    pub fn apply(self, v: f32) -> f32 {
        match self {
            Self::Set(c) => c,
            Self::Offset(d) => v + d,
        }
    }
}

/// Discriminant of a [`Transformation`], for tracing and recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformationKind {
    /// [`Transformation::Fill`].
    Fill,
    /// [`Transformation::FillRect`].
    FillRect,
    /// [`Transformation::Rotate`].
    Rotate,
    /// [`Transformation::Scale`].
    Scale,
}

/// One replayable edit with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transformation {
    /// Uniform fill.
    Fill {
        /// New value of every element.
        value: f32,
    },
    /// Rectangle edit, clamped to the grid.
    FillRect {
        /// Covered pixels.
        rect: PixelRect,
        /// Per-element operation.
        op: RectOp,
    },
    /// Rotation about the center.
    Rotate {
        /// Angle in radians.
        radians: f64,
    },
    /// Centered scale.
    Scale {
        /// Sampling factor; see [`scale`].
        factor: f64,
    },
}

impl Transformation {
    /// The variant without its payload.
    #[must_use]
    pub const fn kind(&self) -> TransformationKind {
        match self {
            Self::Fill { .. } => TransformationKind::Fill,
            Self::FillRect { .. } => TransformationKind::FillRect,
            Self::Rotate { .. } => TransformationKind::Rotate,
            Self::Scale { .. } => TransformationKind::Scale,
        }
    }

    /// Applies the edit to `buffer` in place.
    pub fn apply(&self, buffer: &mut SliceBuffer) {
        let (w, h) = (buffer.width(), buffer.height());
        match *self {
            Self::Fill { value } => fill(buffer.as_mut_slice(), value),
            Self::FillRect { rect, op } => rect_fill(buffer.as_mut_slice(), w, rect, |v| op.apply(v)),
            Self::Rotate { radians } => {
                let out = rotate(buffer.as_slice(), w, h, radians);
                buffer.copy_from(&out);
            }
            Self::Scale { factor } => {
                let out = scale(buffer.as_slice(), w, h, factor);
                buffer.copy_from(&out);
            }
        }
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Fill { value } => write!(f, "Filling entire image with {value:.2}"),
            Self::FillRect {
                op: RectOp::Set(value),
                ..
            } => write!(f, "Drawing a rectangle with colour {value:.2}"),
            Self::FillRect {
                op: RectOp::Offset(delta),
                ..
            } => write!(f, "Brushing a rectangle by {delta:+.2}"),
            Self::Rotate { radians } => write!(f, "Rotating by {:.0} degrees", radians.to_degrees()),
            Self::Scale { factor } => write!(f, "Scaling by a factor of {factor:.2}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use core::f64::consts::{FRAC_PI_2, PI};

    fn ramp(w: u32, h: u32) -> Vec<f32> {
        (0..w * h).map(|i| i as f32 + 1.0).collect()
    }

    #[test]
    fn fill_overwrites_everything() {
        let mut b = ramp(3, 3);
        fill(&mut b, 0.25);
        assert!(b.iter().all(|&v| v == 0.25));
    }

    #[test]
    fn rect_fill_clamps_to_width() {
        let mut b = vec![0.0; 4 * 3];
        rect_fill(&mut b, 4, PixelRect::new(2, 1, 10, 2), |_| 1.0);
        let expected = [
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, //
            0.0, 0.0, 0.0, 0.0,
        ];
        assert_eq!(b, expected);
    }

    #[test]
    fn rect_fill_clamps_to_height_and_applies_fn() {
        let mut b = vec![0.5; 2 * 2];
        rect_fill(&mut b, 2, PixelRect::new(0, 1, 2, 99), |v| v + 0.1);
        assert_eq!(b[0], 0.5);
        assert_eq!(b[1], 0.5);
        assert!((b[2] - 0.6).abs() < 1e-6);
        assert!((b[3] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn rect_fill_fully_outside_is_noop() {
        let mut b = ramp(3, 3);
        let before = b.clone();
        rect_fill(&mut b, 3, PixelRect::new(5, 5, 9, 9), |_| 0.0);
        assert_eq!(b, before);
        rect_fill(&mut b, 3, PixelRect::new(2, 0, 1, 3), |_| 0.0);
        assert_eq!(b, before, "inverted rect touches nothing");
    }

    #[test]
    fn quarter_turn_on_two_by_two() {
        let out = rotate(&[1.0, 2.0, 3.0, 4.0], 2, 2, FRAC_PI_2);
        assert_eq!(out, [3.0, 1.0, 4.0, 2.0]);
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        for n in [1_u32, 2, 3, 4, 5, 8] {
            let b = ramp(n, n);
            let mut out = b.clone();
            for _ in 0..4 {
                out = rotate(&out, n, n, FRAC_PI_2);
            }
            assert_eq!(out, b, "{n}x{n}");
        }
    }

    #[test]
    fn half_turn_reflects_through_center() {
        let b = ramp(3, 3);
        let out = rotate(&b, 3, 3, PI);
        let mut expected = b.clone();
        expected.reverse();
        assert_eq!(out, expected);
    }

    #[test]
    fn non_square_quarter_turn_zero_fills() {
        let out = rotate(&[7.0, 8.0, 9.0], 3, 1, FRAC_PI_2);
        assert_eq!(out, [0.0, 8.0, 0.0]);
    }

    #[test]
    fn scale_one_is_identity() {
        for (w, h) in [(1, 1), (4, 3), (5, 5), (6, 2)] {
            let b = ramp(w, h);
            assert_eq!(scale(&b, w, h, 1.0), b, "{w}x{h}");
        }
    }

    #[test]
    fn scale_clamps_at_edges() {
        let b = ramp(3, 1);
        // Factor 2 samples at -1, 1, 3, clamped to 0, 1, 2.
        assert_eq!(scale(&b, 3, 1, 2.0), [1.0, 2.0, 3.0]);
        // Factor 10 pushes everything but the center onto the edges.
        assert_eq!(scale(&b, 3, 1, 10.0), [1.0, 2.0, 3.0]);
        // Factor 0 samples only the center.
        assert_eq!(scale(&b, 3, 1, 0.0), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn transformation_apply_matches_free_functions() {
        let mut b = SliceBuffer::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        Transformation::Rotate { radians: FRAC_PI_2 }.apply(&mut b);
        assert_eq!(b.as_slice(), &[3.0, 1.0, 4.0, 2.0]);
        Transformation::FillRect {
            rect: PixelRect::square(0, 0, 1),
            op: RectOp::Offset(-1.0),
        }
        .apply(&mut b);
        assert_eq!(b.as_slice(), &[2.0, 1.0, 4.0, 2.0]);
        Transformation::Fill { value: 0.0 }.apply(&mut b);
        assert_eq!(b.as_slice(), &[0.0; 4]);
    }

    #[test]
    fn descriptions_are_human_readable() {
        assert_eq!(
            Transformation::Fill { value: 0.5 }.to_string(),
            "Filling entire image with 0.50"
        );
        assert_eq!(
            Transformation::FillRect {
                rect: PixelRect::new(0, 0, 1, 1),
                op: RectOp::Set(1.0),
            }
            .to_string(),
            "Drawing a rectangle with colour 1.00"
        );
        assert_eq!(
            Transformation::FillRect {
                rect: PixelRect::new(0, 0, 1, 1),
                op: RectOp::Offset(-0.1),
            }
            .to_string(),
            "Brushing a rectangle by -0.10"
        );
        assert_eq!(
            Transformation::Rotate { radians: FRAC_PI_2 }.to_string(),
            "Rotating by 90 degrees"
        );
        assert_eq!(
            Transformation::Scale { factor: 0.5 }.to_string(),
            "Scaling by a factor of 0.50"
        );
    }
}
