// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-channel numeric storage.
//!
//! A [`SliceBuffer`] holds one channel of a layer's output: a `width × height`
//! grid of `f32` intensities in row-major order. Values conventionally lie in
//! `[0, 1]`, but nothing here enforces that; conversion to 8-bit pixels clamps.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Error returned when a value count does not match a declared shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A flat buffer does not hold `width * height` values.
    #[error("{width}x{height} grid needs {expected} values, got {actual}")]
    GridLength {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// `width * height`.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
    /// A stacked tensor does not hold `channels * width * height` values.
    #[error("{channels} channels of {width}x{height} need {expected} values, got {actual}")]
    TensorLength {
        /// Declared channel count.
        channels: u32,
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// `channels * width * height`.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
    /// One channel of a stack has a different shape from the first.
    #[error("channel {index} is {actual_width}x{actual_height}, expected {width}x{height}")]
    ChannelShape {
        /// Offending channel.
        index: usize,
        /// Width of channel 0.
        width: u32,
        /// Height of channel 0.
        height: u32,
        /// Width of the offending channel.
        actual_width: u32,
        /// Height of the offending channel.
        actual_height: u32,
    },
}

/// One channel of activation data.
///
/// The length of the backing storage always equals `width * height`; every
/// constructor and mutator upholds this.
#[derive(Clone, PartialEq)]
pub struct SliceBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl SliceBuffer {
    /// Creates a zero-filled buffer.
    #[must_use]
    pub fn zeros(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Creates a buffer with every element set to `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; grid_len(width, height)],
        }
    }

    /// Wraps existing row-major data.
    ///
    /// Returns [`ShapeError::GridLength`] if `data.len() != width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self, ShapeError> {
        let expected = grid_len(width, height);
        if data.len() != expected {
            return Err(ShapeError::GridLength {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in elements.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in elements.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of elements (`width * height`).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `other` has the same width and height.
    #[inline]
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Row-major view of the values.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable row-major view of the values.
    ///
    /// The slice cannot change length, so the shape invariant holds.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the value at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Overwrites every value with `data`.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != self.len()`.
    pub fn copy_from(&mut self, data: &[f32]) {
        assert_eq!(
            data.len(),
            self.data.len(),
            "replacement data length does not match {}x{} buffer",
            self.width,
            self.height
        );
        self.data.copy_from_slice(data);
    }

    /// Consumes the buffer, returning its row-major values.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Renders the buffer as 8-bit greyscale RGBA.
    ///
    /// Each value maps to `floor(255 * clamp(v, 0, 1))`; alpha is opaque.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for &v in &self.data {
            let g = grey_level(v);
            out.extend_from_slice(&[g, g, g, 255]);
        }
        out
    }
}

impl fmt::Debug for SliceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Maps an intensity to an 8-bit level. NaN maps to 0.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to [0, 255] before the flooring cast"
)]
pub fn grey_level(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[inline]
fn grid_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = SliceBuffer::from_vec(3, 2, vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::GridLength {
                width: 3,
                height: 2,
                expected: 6,
                actual: 5,
            }
        );
    }

    #[test]
    fn get_is_row_major_and_bounded() {
        let b = SliceBuffer::from_vec(2, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(b.get(1, 0), Some(0.2));
        assert_eq!(b.get(0, 1), Some(0.3));
        assert_eq!(b.get(2, 0), None);
        assert_eq!(b.get(0, 2), None);
    }

    #[test]
    #[should_panic(expected = "replacement data length")]
    fn copy_from_checks_length() {
        let mut b = SliceBuffer::zeros(2, 2);
        b.copy_from(&[1.0, 2.0]);
    }

    #[test]
    fn rgba_conversion_clamps_and_floors() {
        let b = SliceBuffer::from_vec(4, 1, vec![-0.5, 0.5, 1.5, f32::NAN]).unwrap();
        let px = b.to_rgba8();
        assert_eq!(&px[0..4], &[0, 0, 0, 255]);
        assert_eq!(&px[4..8], &[127, 127, 127, 255]);
        assert_eq!(&px[8..12], &[255, 255, 255, 255]);
        assert_eq!(&px[12..16], &[0, 0, 0, 255]);
    }
}
