// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Picking ids, their colour encoding, and texture keys.
//!
//! Every quad in one registry generation has a dense linear index. Its
//! [`PickId`] is `linear + 1`, so that a cleared id target (all zero) reads as
//! "no hit". The id is split into three bytes, least significant first, and
//! those bytes become the red, green and blue channels of the quad's id colour.

use core::fmt;

/// Largest raw id representable in three 8-bit colour channels.
pub const MAX_RAW_ID: u32 = (1 << 24) - 1;

/// A picking id: a quad's linear index plus one.
///
/// The raw value is never 0 and never exceeds [`MAX_RAW_ID`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PickId(u32);

impl PickId {
    /// Creates the id for linear index `linear`.
    ///
    /// # Panics
    ///
    /// Panics if `linear + 1` does not fit in 24 bits.
    #[inline]
    #[must_use]
    pub const fn from_linear(linear: u32) -> Self {
        assert!(linear < MAX_RAW_ID, "linear index exceeds 24-bit id space");
        Self(linear + 1)
    }

    /// Wraps a raw id, returning `None` for 0 or values beyond 24 bits.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == 0 || raw > MAX_RAW_ID {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The raw id (`linear + 1`).
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The zero-based linear index.
    #[inline]
    #[must_use]
    pub const fn linear(self) -> u32 {
        self.0 - 1
    }

    /// The id as three bytes, least significant first.
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 3] {
        let b = self.0.to_le_bytes();
        [b[0], b[1], b[2]]
    }

    /// The id colour with each byte normalized to `[0, 1]`.
    #[must_use]
    pub fn color(self) -> [f32; 3] {
        self.to_bytes().map(|b| f32::from(b) / 255.0)
    }

    /// Decodes the red, green and blue bytes of an id-target pixel.
    ///
    /// Returns `None` for the background colour.
    #[inline]
    #[must_use]
    pub const fn decode(rgb: [u8; 3]) -> Option<Self> {
        Self::from_raw(u32::from_le_bytes([rgb[0], rgb[1], rgb[2], 0]))
    }
}

impl fmt::Debug for PickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PickId({})", self.0)
    }
}

/// An opaque handle to a backend texture holding one channel.
///
/// Keys are issued by a [`TextureUpdater`](crate::backend::TextureUpdater)
/// and passed through the render plan without interpretation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureKey(pub u64);

impl fmt::Debug for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureKey({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_background() {
        assert_eq!(PickId::decode([0, 0, 0]), None);
        assert_eq!(PickId::from_raw(0), None);
    }

    #[test]
    fn first_quad_encodes_as_one() {
        let id = PickId::from_linear(0);
        assert_eq!(id.raw(), 1);
        assert_eq!(id.to_bytes(), [1, 0, 0]);
    }

    #[test]
    fn bytes_are_little_endian() {
        let id = PickId::from_linear(0x01_02_02);
        assert_eq!(id.raw(), 0x01_02_03);
        assert_eq!(id.to_bytes(), [0x03, 0x02, 0x01]);
    }

    #[test]
    fn decode_inverts_encode() {
        // Sample across the full 24-bit range rather than every id.
        let mut linear = 0_u32;
        while linear < MAX_RAW_ID {
            let id = PickId::from_linear(linear);
            assert_eq!(PickId::decode(id.to_bytes()), Some(id), "linear {linear}");
            linear += 4099;
        }
        let last = PickId::from_linear(MAX_RAW_ID - 1);
        assert_eq!(PickId::decode(last.to_bytes()), Some(last));
    }

    #[test]
    fn color_matches_bytes() {
        let id = PickId::from_linear(254);
        let c = id.color();
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], 0.0);
        assert_eq!(c[2], 0.0);
        let id = PickId::from_linear(255);
        assert_eq!(id.color(), [0.0, 1.0 / 255.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "24-bit id space")]
    fn linear_overflow_panics() {
        let _ = PickId::from_linear(MAX_RAW_ID);
    }
}
