// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2D surfaces the editor paints into.

use alloc::vec::Vec;

use crate::slice::{SliceBuffer, grey_level};

/// A 2D raster surface showing the channel under edit.
///
/// Painted synchronously after every edit so feedback never waits on a frame.
pub trait DisplaySurface {
    /// Replaces the surface contents with `width × height` RGBA8 pixels.
    fn present(&mut self, width: u32, height: u32, rgba: &[u8]);

    /// Hides or blanks the surface.
    fn clear(&mut self) {}
}

/// Paints a channel as greyscale.
pub fn present_buffer(display: &mut dyn DisplaySurface, buffer: &SliceBuffer) {
    display.present(buffer.width(), buffer.height(), &buffer.to_rgba8());
}

/// Composes a generator output layer into RGBA8.
///
/// Values are taken to lie in `[-1, 1]` and are mapped to `[0, 255]`. Three or
/// more channels become RGB from the first three; fewer become greyscale from
/// the first. Returns `None` when `channels` is empty or shapes differ.
#[must_use]
pub fn output_rgba(channels: &[SliceBuffer]) -> Option<(u32, u32, Vec<u8>)> {
    let first = channels.first()?;
    if channels.iter().any(|c| !c.same_shape(first)) {
        return None;
    }
    let level = |v: f32| grey_level(v * 0.5 + 0.5);
    let mut out = Vec::with_capacity(first.len() * 4);
    if channels.len() >= 3 {
        let (r, g, b) = (channels[0].as_slice(), channels[1].as_slice(), channels[2].as_slice());
        for i in 0..first.len() {
            out.extend_from_slice(&[level(r[i]), level(g[i]), level(b[i]), 255]);
        }
    } else {
        for &v in first.as_slice() {
            let l = level(v);
            out.extend_from_slice(&[l, l, l, 255]);
        }
    }
    Some((first.width(), first.height(), out))
}

/// An in-memory [`DisplaySurface`].
#[derive(Clone, Debug, Default)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    presents: u64,
}

impl Canvas {
    /// Creates a blank canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Width of the last presented image.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the last presented image.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixels of the last presented image.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of `present` calls so far.
    #[must_use]
    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// Whether the canvas is blank (never presented, or cleared).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The RGBA value at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

impl DisplaySurface for Canvas {
    fn present(&mut self, width: u32, height: u32, rgba: &[u8]) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.extend_from_slice(rgba);
        self.presents += 1;
    }

    fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn canvas_keeps_last_image() {
        let mut canvas = Canvas::new();
        let b = SliceBuffer::from_vec(2, 1, vec![0.0, 1.0]).unwrap();
        present_buffer(&mut canvas, &b);
        assert_eq!(canvas.presents(), 1);
        assert_eq!(canvas.pixel(1, 0), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(2, 0), None);
        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn output_maps_signed_range() {
        let r = SliceBuffer::from_vec(1, 1, vec![1.0]).unwrap();
        let g = SliceBuffer::from_vec(1, 1, vec![-1.0]).unwrap();
        let b = SliceBuffer::from_vec(1, 1, vec![0.0]).unwrap();
        let (w, h, px) = output_rgba(&[r.clone(), g, b]).unwrap();
        assert_eq!((w, h), (1, 1));
        assert_eq!(px, [255, 0, 127, 255]);

        let (_, _, grey) = output_rgba(&[r]).unwrap();
        assert_eq!(grey, [255, 255, 255, 255]);
        assert!(output_rgba(&[]).is_none());
    }
}
