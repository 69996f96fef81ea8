// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edit staging for the committed channel.
//!
//! Opening a selection takes a snapshot of its channel and a live working
//! copy. Each [`Transformation`] mutates the live copy, is appended to the
//! pending list, and repaints the display surface at once. Nothing reaches the
//! registry until the session commits; cancelling restores the snapshot.
//!
//! Replaying the pending list on a copy of the snapshot reproduces the live
//! copy exactly, because both run the same transformations in the same order.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use alloc::string::String;
use alloc::vec::Vec;
use core::f64::consts::FRAC_PI_2;
use core::fmt::Write as _;

use crate::display::{DisplaySurface, present_buffer};
use crate::registry::Selection;
use crate::slice::SliceBuffer;
use crate::transformation::{PixelRect, RectOp, Transformation};

/// Parameters of the editing helpers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditorConfig {
    /// Initial brush side in pixels.
    pub brush_size: u32,
    /// Inclusive bounds of the brush side.
    pub brush_size_range: (u32, u32),
    /// Amount one brush stroke adds or removes.
    pub brush_step: f32,
    /// Side of the centered rectangle relative to the channel width.
    pub rect_fraction: f64,
    /// Number of grey levels offered for fills.
    pub palette_levels: u32,
    /// Angle of one rotation step.
    pub rotate_radians: f64,
    /// Inclusive bounds of the scale slider.
    pub scale_range: (f64, f64),
    /// Whether helpers apply to every channel of the layer by default.
    pub broadcast_by_default: bool,
}

impl EditorConfig {
    /// The stock configuration.
    pub const DEFAULT: Self = Self {
        brush_size: 3,
        brush_size_range: (1, 12),
        brush_step: 0.1,
        rect_fraction: 0.6,
        palette_levels: 10,
        rotate_radians: FRAC_PI_2,
        scale_range: (0.5, 2.0),
        broadcast_by_default: true,
    };
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One staged edit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingTransformation {
    /// The edit and its parameters.
    pub transformation: Transformation,
    /// Replay against every channel of the layer, not just the selected one.
    pub broadcast: bool,
}

/// Whether a channel is open for editing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditorState {
    /// No channel is open.
    Idle,
    /// A channel is open.
    Editing,
}

#[derive(Clone, Debug)]
struct EditTarget {
    selection: Selection,
    snapshot: SliceBuffer,
    live: SliceBuffer,
}

/// Edit staging engine.
#[derive(Clone, Debug)]
pub struct Editor {
    config: EditorConfig,
    target: Option<EditTarget>,
    pending: Vec<PendingTransformation>,
    broadcast: bool,
    brush_size: u32,
    scale_factor: f64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::DEFAULT)
    }
}

impl Editor {
    /// Creates an idle editor.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            target: None,
            pending: Vec::new(),
            broadcast: config.broadcast_by_default,
            brush_size: config.brush_size,
            scale_factor: 1.0,
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EditorState {
        if self.target.is_some() {
            EditorState::Editing
        } else {
            EditorState::Idle
        }
    }

    /// The open selection.
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.target.as_ref().map(|t| &t.selection)
    }

    /// The channel as it was when opened.
    #[must_use]
    pub fn snapshot(&self) -> Option<&SliceBuffer> {
        self.target.as_ref().map(|t| &t.snapshot)
    }

    /// The working copy with every pending edit applied.
    #[must_use]
    pub fn live(&self) -> Option<&SliceBuffer> {
        self.target.as_ref().map(|t| &t.live)
    }

    /// Staged edits in applied order.
    #[must_use]
    pub fn pending(&self) -> &[PendingTransformation] {
        &self.pending
    }

    /// Default broadcast flag used by the helpers.
    #[must_use]
    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    /// Brush side in pixels.
    #[must_use]
    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Factor [`scale`](Self::scale) applies.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Opens `selection` for editing with its current channel data.
    ///
    /// Re-opening the open selection only repaints. Opening another one
    /// discards pending edits.
    pub fn open(&mut self, selection: Selection, buffer: &SliceBuffer, display: &mut dyn DisplaySurface) {
        if let Some(target) = &self.target
            && target.selection == selection
        {
            present_buffer(display, &target.live);
            return;
        }
        self.pending.clear();
        let target = EditTarget {
            selection,
            snapshot: buffer.clone(),
            live: buffer.clone(),
        };
        present_buffer(display, &target.live);
        self.target = Some(target);
    }

    /// Closes the editor, dropping pending edits.
    pub fn close(&mut self) {
        self.target = None;
        self.pending.clear();
    }

    /// Applies `transformation` to the live copy and stages it.
    ///
    /// Returns `None` and does nothing when no channel is open.
    pub fn apply(
        &mut self,
        transformation: Transformation,
        broadcast: bool,
        display: &mut dyn DisplaySurface,
    ) -> Option<PendingTransformation> {
        let target = self.target.as_mut()?;
        transformation.apply(&mut target.live);
        present_buffer(display, &target.live);
        let record = PendingTransformation {
            transformation,
            broadcast,
        };
        self.pending.push(record);
        Some(record)
    }

    /// Fills the channel with `value`.
    pub fn fill(&mut self, value: f32, display: &mut dyn DisplaySurface) -> Option<PendingTransformation> {
        self.apply(Transformation::Fill { value }, self.broadcast, display)
    }

    /// Fills the channel with grey level `index` of the palette.
    pub fn fill_palette(&mut self, index: u32, display: &mut dyn DisplaySurface) -> Option<PendingTransformation> {
        let value = palette_level(index, self.config.palette_levels);
        self.fill(value, display)
    }

    /// Draws a centered square of `value`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "side is a floored fraction of the width"
    )]
    pub fn fill_centered_rect(&mut self, value: f32, display: &mut dyn DisplaySurface) -> Option<PendingTransformation> {
        let (w, h) = {
            let live = self.live()?;
            (live.width(), live.height())
        };
        let side = (f64::from(w) * self.config.rect_fraction).floor() as u32;
        let x1 = w.saturating_sub(side) / 2;
        let y1 = h.saturating_sub(side) / 2;
        let rect = PixelRect::new(x1, y1, x1 + side, y1 + side);
        let t = Transformation::FillRect {
            rect,
            op: RectOp::Set(value),
        };
        self.apply(t, self.broadcast, display)
    }

    /// Brushes a `brush_size` square at `(x, y)`, darkening when `lower`.
    pub fn brush(&mut self, x: u32, y: u32, lower: bool, display: &mut dyn DisplaySurface) -> Option<PendingTransformation> {
        let step = self.config.brush_step;
        let t = Transformation::FillRect {
            rect: PixelRect::square(x, y, self.brush_size),
            op: RectOp::Offset(if lower { -step } else { step }),
        };
        self.apply(t, self.broadcast, display)
    }

    /// Rotates by the configured step.
    pub fn rotate_quarter(&mut self, display: &mut dyn DisplaySurface) -> Option<PendingTransformation> {
        let t = Transformation::Rotate {
            radians: self.config.rotate_radians,
        };
        self.apply(t, self.broadcast, display)
    }

    /// Scales by the factor set from the slider.
    pub fn scale(&mut self, display: &mut dyn DisplaySurface) -> Option<PendingTransformation> {
        let t = Transformation::Scale {
            factor: self.scale_factor,
        };
        self.apply(t, self.broadcast, display)
    }

    /// Sets the scale factor from a slider position.
    ///
    /// The slider is a zoom level; the sampling factor is its reciprocal.
    pub fn set_scale_slider(&mut self, slider: f64) {
        let (lo, hi) = self.config.scale_range;
        let slider = if slider.is_nan() { 1.0 } else { slider.clamp(lo, hi) };
        self.scale_factor = 1.0 / slider;
    }

    /// Sets the brush side, clamped to the configured range.
    pub fn set_brush_size(&mut self, size: u32) {
        let (lo, hi) = self.config.brush_size_range;
        self.brush_size = size.clamp(lo, hi);
    }

    /// Sets the default broadcast flag.
    pub fn set_broadcast(&mut self, broadcast: bool) {
        self.broadcast = broadcast;
    }

    /// Discards pending edits and restores the snapshot.
    ///
    /// The channel stays open. Returns how many edits were discarded.
    pub fn cancel(&mut self, display: &mut dyn DisplaySurface) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        if let Some(target) = &mut self.target {
            target.live.clone_from(&target.snapshot);
            present_buffer(display, &target.live);
        }
        discarded
    }

    /// Replays every pending edit onto `buffer`, ignoring broadcast.
    pub fn replay_onto(&self, buffer: &mut SliceBuffer) {
        for record in &self.pending {
            record.transformation.apply(buffer);
        }
    }

    /// Replays pending edits onto a whole layer.
    ///
    /// Broadcast records touch every channel; others only the selected one.
    /// Does nothing when no channel is open.
    pub fn apply_to_layer(&self, channels: &mut [SliceBuffer]) {
        let Some(selected) = self.selection().map(|s| s.channel) else {
            return;
        };
        for record in &self.pending {
            if record.broadcast {
                for channel in channels.iter_mut() {
                    record.transformation.apply(channel);
                }
            } else if let Some(channel) = channels.get_mut(selected) {
                record.transformation.apply(channel);
            }
        }
    }

    /// Human-readable list of pending edits, one per line.
    #[must_use]
    pub fn describe_pending(&self) -> String {
        let mut out = String::from("Pending Transformations:\n");
        for record in &self.pending {
            let suffix = if record.broadcast { " stack" } else { "" };
            let _ = writeln!(out, "{}{suffix}", record.transformation);
        }
        out
    }
}

/// The grey levels offered for fills: `floor(255 * i / (levels - 1)) / 255`.
#[must_use]
pub fn palette(levels: u32) -> Vec<f32> {
    (0..levels).map(|i| palette_level(i, levels)).collect()
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "level is in [0, 255]"
)]
fn palette_level(index: u32, levels: u32) -> f32 {
    if levels < 2 {
        return 0.0;
    }
    let i = index.min(levels - 1);
    let byte = (255.0 * f64::from(i) / f64::from(levels - 1)).floor() as u8;
    f32::from(byte) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Canvas;
    use crate::id::PickId;
    use alloc::vec;

    fn selection(channel: usize) -> Selection {
        Selection {
            id: PickId::from_linear(channel as u32),
            layer: 0,
            channel,
            generation: 1,
        }
    }

    fn ramp(w: u32, h: u32) -> SliceBuffer {
        let data = (0..w * h).map(|i| i as f32 / (w * h) as f32).collect();
        SliceBuffer::from_vec(w, h, data).unwrap()
    }

    #[test]
    fn edits_without_selection_are_ignored() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        assert!(editor.fill(0.5, &mut canvas).is_none());
        assert!(editor.pending().is_empty());
        assert_eq!(canvas.presents(), 0);
        assert_eq!(editor.state(), EditorState::Idle);
    }

    #[test]
    fn apply_updates_live_and_repaints() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        editor.open(selection(0), &SliceBuffer::zeros(4, 4), &mut canvas);
        assert_eq!(canvas.presents(), 1);
        editor.fill(1.0, &mut canvas);
        assert_eq!(canvas.presents(), 2);
        assert_eq!(canvas.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(editor.live().and_then(|b| b.get(3, 3)), Some(1.0));
        assert_eq!(editor.snapshot().and_then(|b| b.get(3, 3)), Some(0.0));
    }

    #[test]
    fn replay_reproduces_live_exactly() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        let original = ramp(8, 6);
        editor.open(selection(0), &original, &mut canvas);
        editor.brush(1, 1, false, &mut canvas);
        editor.rotate_quarter(&mut canvas);
        editor.set_scale_slider(2.0);
        editor.scale(&mut canvas);
        editor.fill_centered_rect(0.25, &mut canvas);
        editor.brush(5, 2, true, &mut canvas);

        let mut replayed = original.clone();
        editor.replay_onto(&mut replayed);
        assert_eq!(Some(&replayed), editor.live());
    }

    #[test]
    fn broadcast_applies_to_every_channel() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        editor.open(selection(1), &SliceBuffer::zeros(2, 2), &mut canvas);
        editor.apply(Transformation::Fill { value: 0.5 }, true, &mut canvas);
        editor.apply(Transformation::Fill { value: 0.75 }, false, &mut canvas);

        let mut layer = vec![SliceBuffer::zeros(2, 2); 3];
        editor.apply_to_layer(&mut layer);
        assert_eq!(layer[0].get(0, 0), Some(0.5));
        assert_eq!(layer[1].get(0, 0), Some(0.75));
        assert_eq!(layer[2].get(0, 0), Some(0.5));
    }

    #[test]
    fn cancel_restores_snapshot() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        let original = ramp(4, 4);
        editor.open(selection(0), &original, &mut canvas);
        editor.fill(0.0, &mut canvas);
        editor.rotate_quarter(&mut canvas);
        assert_eq!(editor.cancel(&mut canvas), 2);
        assert!(editor.pending().is_empty());
        assert_eq!(editor.live(), Some(&original));
        assert_eq!(canvas.pixels(), original.to_rgba8().as_slice());
        assert_eq!(editor.state(), EditorState::Editing);
    }

    #[test]
    fn reopening_keeps_pending_and_switching_drops_it() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        editor.open(selection(0), &SliceBuffer::zeros(2, 2), &mut canvas);
        editor.fill(0.5, &mut canvas);
        editor.open(selection(0), &SliceBuffer::zeros(2, 2), &mut canvas);
        assert_eq!(editor.pending().len(), 1);
        editor.open(selection(1), &SliceBuffer::zeros(2, 2), &mut canvas);
        assert!(editor.pending().is_empty());
    }

    #[test]
    fn centered_rect_uses_sixty_percent() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        editor.open(selection(0), &SliceBuffer::zeros(10, 10), &mut canvas);
        let record = editor.fill_centered_rect(1.0, &mut canvas).unwrap();
        assert_eq!(
            record.transformation,
            Transformation::FillRect {
                rect: PixelRect::new(2, 2, 8, 8),
                op: RectOp::Set(1.0),
            }
        );
    }

    #[test]
    fn slider_and_brush_are_clamped() {
        let mut editor = Editor::default();
        editor.set_scale_slider(4.0);
        assert_eq!(editor.scale_factor(), 0.5);
        editor.set_scale_slider(0.5);
        assert_eq!(editor.scale_factor(), 2.0);
        editor.set_brush_size(40);
        assert_eq!(editor.brush_size(), 12);
        editor.set_brush_size(0);
        assert_eq!(editor.brush_size(), 1);
    }

    #[test]
    fn palette_has_ten_levels() {
        let p = palette(10);
        assert_eq!(p.len(), 10);
        assert_eq!(p[0], 0.0);
        assert_eq!(p[1], 28.0 / 255.0);
        assert_eq!(p[9], 1.0);
    }

    #[test]
    fn describe_lists_records() {
        let mut editor = Editor::default();
        let mut canvas = Canvas::new();
        editor.open(selection(0), &SliceBuffer::zeros(4, 4), &mut canvas);
        editor.fill(0.5, &mut canvas);
        editor.set_broadcast(false);
        editor.rotate_quarter(&mut canvas);
        assert_eq!(
            editor.describe_pending(),
            "Pending Transformations:\n\
             Filling entire image with 0.50 stack\n\
             Rotating by 90 degrees\n"
        );
    }
}
