// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-channel textured quads and their placement.
//!
//! Every channel of every spatial layer becomes one [`Quad`]. Layers are laid
//! out along x, centered on the origin; channels of one layer are stacked
//! along z, front to back. A hovered quad pops up along y over a few frames
//! and is tinted.

use core::f64::consts::FRAC_PI_2;

use crate::animate::{Animation, Easing};
use crate::backend::TextureUpdater;
use crate::id::{PickId, TextureKey};
use crate::slice::SliceBuffer;
use crate::transform::Transform3d;

/// Placement and hover-feedback parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldLayout {
    /// Distance between neighbouring layers along x.
    pub layer_spacing: f64,
    /// Distance between neighbouring channels along z.
    pub channel_spacing: f64,
    /// z of channel 0.
    pub z_origin: f64,
    /// How far a hovered quad rises along y.
    pub pop_height: f64,
    /// Frames the pop takes.
    pub pop_frames: usize,
    /// Easing of the pop.
    pub pop_easing: Easing,
    /// Rotation about z applied to every quad at rest.
    pub rest_rotation: f64,
    /// Tint multiplied into an idle quad.
    pub idle_tint: [f32; 3],
    /// Tint multiplied into a hovered quad.
    pub hover_tint: [f32; 3],
}

impl FieldLayout {
    /// The stock layout.
    pub const DEFAULT: Self = Self {
        layer_spacing: 3.0,
        channel_spacing: 0.5,
        z_origin: 5.0,
        pop_height: 0.8,
        pop_frames: 3,
        pop_easing: Easing::Linear,
        rest_rotation: -FRAC_PI_2,
        idle_tint: [1.0, 1.0, 1.0],
        hover_tint: [0.3, 0.5, 0.0],
    };
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What a hover update changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct HoverUpdate {
    pub(crate) moved: bool,
    pub(crate) tint_changed: bool,
}

/// One channel rendered as a textured quad.
#[derive(Clone, Debug)]
pub struct Quad {
    id: PickId,
    layer_index: usize,
    channel: usize,
    buffer: SliceBuffer,
    texture: TextureKey,
    rest: [f64; 3],
    pop: Animation<[f64; 3]>,
    translation: [f64; 3],
    rotation: f64,
    tint: [f32; 3],
    hovered: bool,
}

impl Quad {
    /// Picking id.
    #[must_use]
    pub fn id(&self) -> PickId {
        self.id
    }

    /// Position of the owning layer among spatial layers.
    #[must_use]
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    /// Channel index within the layer.
    #[must_use]
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// The channel data currently shown.
    #[must_use]
    pub fn buffer(&self) -> &SliceBuffer {
        &self.buffer
    }

    /// Backend texture holding [`buffer`](Self::buffer).
    #[must_use]
    pub fn texture(&self) -> TextureKey {
        self.texture
    }

    /// Rest position.
    #[must_use]
    pub fn rest(&self) -> [f64; 3] {
        self.rest
    }

    /// Current position, including any pop offset.
    #[must_use]
    pub fn translation(&self) -> [f64; 3] {
        self.translation
    }

    /// Rotation about z in radians.
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Current tint.
    #[must_use]
    pub fn tint(&self) -> [f32; 3] {
        self.tint
    }

    /// Whether the quad is hovered.
    #[must_use]
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Cursor position of the pop animation.
    #[must_use]
    pub fn pop_frame(&self) -> usize {
        self.pop.cursor()
    }

    /// Model transform: translation after rotation.
    #[must_use]
    pub fn model(&self) -> Transform3d {
        Transform3d::quad_model(self.translation, self.rotation)
    }

    /// Advances the pop one frame toward hovered or back toward rest.
    pub(crate) fn set_hovered(&mut self, hovered: bool, layout: &FieldLayout) -> HoverUpdate {
        let before = self.translation;
        self.translation = if hovered {
            self.pop.step()
        } else {
            self.pop.reverse()
        };
        let tint_changed = hovered != self.hovered;
        if tint_changed {
            self.hovered = hovered;
            self.tint = if hovered {
                layout.hover_tint
            } else {
                layout.idle_tint
            };
        }
        HoverUpdate {
            moved: before != self.translation,
            tint_changed,
        }
    }

    /// Frees the quad's texture.
    pub fn release(self, textures: &mut dyn TextureUpdater) {
        textures.release_texture(self.texture);
    }
}

/// Builds quads from channel buffers.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuadFactory {
    layout: FieldLayout,
}

impl QuadFactory {
    /// Creates a factory with `layout`.
    #[must_use]
    pub fn new(layout: FieldLayout) -> Self {
        Self { layout }
    }

    /// The layout in use.
    #[must_use]
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Rest position of a channel.
    ///
    /// Layers are centered on x = 0; channel 0 sits at `z_origin` and each
    /// further channel is `channel_spacing` behind it.
    #[must_use]
    pub fn rest_position(&self, channel_index: usize, layer_index: usize, total_layers: usize) -> [f64; 3] {
        let spacing = self.layout.layer_spacing;
        let span = total_layers.saturating_sub(1) as f64 * spacing;
        [
            layer_index as f64 * spacing - span / 2.0,
            0.0,
            self.layout.z_origin - channel_index as f64 * self.layout.channel_spacing,
        ]
    }

    /// Creates the quad for one channel and uploads its texture.
    ///
    /// The id is `channel_index + id_offset` as a linear index.
    ///
    /// # Panics
    ///
    /// Panics if the id does not fit in 24 bits.
    pub fn generate(
        &self,
        buffer: SliceBuffer,
        channel_index: usize,
        layer_index: usize,
        total_layers: usize,
        id_offset: u32,
        textures: &mut dyn TextureUpdater,
    ) -> Quad {
        let linear = u32::try_from(channel_index)
            .ok()
            .and_then(|c| c.checked_add(id_offset))
            .unwrap_or(u32::MAX);
        let id = PickId::from_linear(linear);
        let rest = self.rest_position(channel_index, layer_index, total_layers);
        let popped = [rest[0], rest[1] + self.layout.pop_height, rest[2]];
        let pop = Animation::new(
            "pop",
            rest,
            popped,
            self.layout.pop_frames,
            self.layout.pop_easing,
        );
        let texture = textures.create_texture(&buffer);
        Quad {
            id,
            layer_index,
            channel: channel_index,
            buffer,
            texture,
            rest,
            translation: pop.current(),
            pop,
            rotation: self.layout.rest_rotation,
            tint: self.layout.idle_tint,
            hovered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessTextures;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rest_positions_center_layers() {
        let f = QuadFactory::default();
        assert_eq!(f.rest_position(0, 0, 3), [-3.0, 0.0, 5.0]);
        assert_eq!(f.rest_position(0, 1, 3), [0.0, 0.0, 5.0]);
        assert_eq!(f.rest_position(2, 2, 3), [3.0, 0.0, 4.0]);
        assert_eq!(f.rest_position(0, 0, 1), [0.0, 0.0, 5.0]);
    }

    #[test]
    fn generate_uploads_and_assigns_id() {
        let mut tex = HeadlessTextures::new();
        let f = QuadFactory::default();
        let q = f.generate(SliceBuffer::zeros(4, 4), 2, 1, 2, 10, &mut tex);
        assert_eq!(q.id(), PickId::from_linear(12));
        assert_eq!(q.channel(), 2);
        assert_eq!(tex.live(), 1);
        assert!(tex.get(q.texture()).is_some());
        assert_eq!(q.translation(), q.rest());
        assert!(approx(q.rotation(), -FRAC_PI_2));
        assert_eq!(q.tint(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn hover_pops_up_and_eases_back() {
        let mut tex = HeadlessTextures::new();
        let layout = FieldLayout::DEFAULT;
        let f = QuadFactory::new(layout);
        let mut q = f.generate(SliceBuffer::zeros(1, 1), 0, 0, 1, 0, &mut tex);

        let first = q.set_hovered(true, &layout);
        assert!(first.moved && first.tint_changed);
        assert_eq!(q.tint(), layout.hover_tint);
        q.set_hovered(true, &layout);
        q.set_hovered(true, &layout);
        assert!(approx(q.translation()[1], 0.8));
        assert!(!q.set_hovered(true, &layout).moved);

        let back = q.set_hovered(false, &layout);
        assert!(back.moved && back.tint_changed);
        assert!(approx(q.translation()[1], 0.8 * 2.0 / 3.0));
        q.set_hovered(false, &layout);
        q.set_hovered(false, &layout);
        assert_eq!(q.translation(), q.rest());
        assert_eq!(q.set_hovered(false, &layout), HoverUpdate::default());
    }
}
