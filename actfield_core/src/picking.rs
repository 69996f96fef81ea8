// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover hit resolution from an id target.
//!
//! The backend draws every quad in its flat id colour into an off-screen
//! target cleared to zero. Each frame the [`Picker`] maps the cursor to a
//! device pixel, asks the [`PickSource`] to read that pixel back on the next
//! pass, and decodes whatever readback has completed most recently.
//!
//! Readbacks are asynchronous, so a sample may describe an older pass. Samples
//! more than [`PickConfig::max_latency`] passes behind, or rendered for a
//! different registry generation, are discarded rather than trusted.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use crate::backend::PickSource;
use crate::id::PickId;

/// Where row 0 of the id target lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelOrigin {
    /// Row 0 is the top row (wgpu, Vulkan, Metal, D3D).
    #[default]
    TopLeft,
    /// Row 0 is the bottom row (OpenGL).
    BottomLeft,
}

/// Picking parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickConfig {
    /// Row origin of the id target.
    pub origin: PixelOrigin,
    /// Oldest acceptable sample, in passes behind the latest submission.
    pub max_latency: u64,
}

impl PickConfig {
    /// Top-left origin, samples at most one pass old.
    pub const DEFAULT: Self = Self {
        origin: PixelOrigin::TopLeft,
        max_latency: 1,
    };

    /// Bottom-left origin, for GL-style targets.
    pub const GL: Self = Self {
        origin: PixelOrigin::BottomLeft,
        max_latency: 1,
    };
}

impl Default for PickConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The cursor in client (logical) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    /// Cursor position, origin top-left.
    pub position: Point,
    /// Size of the client area the position is relative to.
    pub client: Size,
}

impl Pointer {
    /// Creates a pointer at `(x, y)` in a `width × height` client area.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            position: Point::new(x, y),
            client: Size::new(width, height),
        }
    }
}

/// One completed id-target readback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PickSample {
    /// Pass number the pixel was rendered in (1-based).
    pub pass: u64,
    /// Registry generation the pass was rendered for.
    pub generation: u32,
    /// Device pixel column.
    pub x: u32,
    /// Device pixel row.
    pub y: u32,
    /// The pixel.
    pub rgba: [u8; 4],
}

/// Resolves hover hits from id-target samples.
#[derive(Clone, Debug, Default)]
pub struct Picker {
    config: PickConfig,
    last: Option<PickSample>,
}

impl Picker {
    /// Creates a picker.
    #[must_use]
    pub fn new(config: PickConfig) -> Self {
        Self { config, last: None }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &PickConfig {
        &self.config
    }

    /// The sample used by the most recent resolution, accepted or not.
    #[must_use]
    pub fn last_sample(&self) -> Option<&PickSample> {
        self.last.as_ref()
    }

    /// Maps the cursor to a device pixel of a `target` sized id target.
    ///
    /// Returns `None` outside the client area or when either size is empty.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "values are floored and bounds-checked against the target size"
    )]
    pub fn device_pixel(&self, pointer: &Pointer, target: (u32, u32)) -> Option<(u32, u32)> {
        let (tw, th) = target;
        let Pointer { position, client } = *pointer;
        if tw == 0 || th == 0 || client.width <= 0.0 || client.height <= 0.0 {
            return None;
        }
        if !(0.0..client.width).contains(&position.x) || !(0.0..client.height).contains(&position.y) {
            return None;
        }
        let x = (position.x * f64::from(tw) / client.width).floor();
        let y = (position.y * f64::from(th) / client.height).floor();
        let (x, y) = ((x as u32).min(tw - 1), (y as u32).min(th - 1));
        Some(match self.config.origin {
            PixelOrigin::TopLeft => (x, y),
            PixelOrigin::BottomLeft => (x, th - 1 - y),
        })
    }

    /// Requests the pixel under `pointer` and decodes the latest readback.
    ///
    /// `max_id` is the largest raw id of the current registry and
    /// `generation` its generation. With no pointer, nothing is requested and
    /// the result is `None`.
    pub fn resolve_hit(
        &mut self,
        pointer: Option<&Pointer>,
        source: &mut dyn PickSource,
        max_id: u32,
        generation: u32,
    ) -> Option<PickId> {
        let pointer = pointer?;
        let (x, y) = self.device_pixel(pointer, source.target_size())?;
        source.request_pixel(x, y);
        let sample = source.latest_sample()?;
        self.last = Some(sample);
        self.accept(&sample, source.submitted_passes(), max_id, generation)
    }

    /// Decodes `sample` if it is recent enough and from `generation`.
    #[must_use]
    pub fn accept(
        &self,
        sample: &PickSample,
        submitted: u64,
        max_id: u32,
        generation: u32,
    ) -> Option<PickId> {
        if sample.generation != generation {
            return None;
        }
        if submitted.saturating_sub(sample.pass) > self.config.max_latency {
            return None;
        }
        let [r, g, b, _] = sample.rgba;
        PickId::decode([r, g, b]).filter(|id| id.raw() <= max_id)
    }
}

/// A CPU id target.
///
/// Headless runs and tests paint id rectangles here in place of a GPU pass;
/// [`submit`](Self::submit) plays the role of a finished readback.
#[derive(Clone, Debug)]
pub struct IdTarget {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
    generation: u32,
    requested: Option<(u32, u32)>,
    submitted: u64,
    latest: Option<PickSample>,
}

impl IdTarget {
    /// Creates a `width × height` target cleared to id 0.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
            generation: 0,
            requested: None,
            submitted: 0,
            latest: None,
        }
    }

    /// Clears every pixel to id 0 and starts drawing for `generation`.
    pub fn clear(&mut self, generation: u32) {
        self.pixels.fill([0; 4]);
        self.generation = generation;
    }

    /// Paints `id` over the pixel rectangle `[x0, x1) × [y0, y1)`, clamped.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, id: PickId) {
        let [r, g, b] = id.to_bytes();
        let (x1, y1) = (x1.min(self.width), y1.min(self.height));
        for y in y0..y1 {
            let row = y as usize * self.width as usize;
            for x in x0..x1 {
                self.pixels[row + x as usize] = [r, g, b, 255];
            }
        }
    }

    /// The pixel at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Finishes a pass, reading back the requested pixel.
    pub fn submit(&mut self) {
        self.submitted += 1;
        if let Some((x, y)) = self.requested
            && let Some(rgba) = self.pixel(x, y)
        {
            self.latest = Some(PickSample {
                pass: self.submitted,
                generation: self.generation,
                x,
                y,
                rgba,
            });
        }
    }
}

impl PickSource for IdTarget {
    fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn request_pixel(&mut self, x: u32, y: u32) {
        self.requested = Some((x, y));
    }

    fn latest_sample(&mut self) -> Option<PickSample> {
        self.latest
    }

    fn submitted_passes(&self) -> u64 {
        self.submitted
    }
}
