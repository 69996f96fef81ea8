// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quads grouped by network layer, and the id ↔ selection mapping.
//!
//! A [`LayerRegistry`] is one *generation* of the field: it is built from a
//! forward pass's outputs and replaced wholesale when the model runs again.
//! Only spatial layers take part; flat layers are skipped, so slot indices and
//! network indices differ in general.
//!
//! Linear ids are dense across the whole registry, assigned layer by layer in
//! slot order, channel by channel within a layer. Mapping an id back to a
//! selection is a cumulative walk over the layers' channel counts.
//!
//! Quad changes are tracked per linear id with [`understory_dirty`] and
//! drained by [`evaluate`](LayerRegistry::evaluate).

use alloc::string::String;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::backend::TextureUpdater;
use crate::dirty;
use crate::forward::{ChannelStack, LayerData, LayerOutput};
use crate::id::{MAX_RAW_ID, PickId};
use crate::quad::{FieldLayout, Quad, QuadFactory};
use crate::slice::SliceBuffer;

/// A channel of a specific registry generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    /// Picking id of the channel's quad.
    pub id: PickId,
    /// Slot index of the layer in the registry.
    pub layer: usize,
    /// Channel index within the layer.
    pub channel: usize,
    /// Registry generation the selection was made in.
    pub generation: u32,
}

/// The set of changes produced by a single [`LayerRegistry::evaluate`] call.
///
/// Lists hold linear ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldChanges {
    /// Quads whose translation changed.
    pub transforms: Vec<u32>,
    /// Quads whose tint changed.
    pub tints: Vec<u32>,
    /// The registry is new; everything must be rebuilt.
    pub regenerated: bool,
}

impl FieldChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.tints.clear();
        self.regenerated = false;
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.regenerated
            && self.transforms.is_empty()
            && self.tints.is_empty()
    }
}

/// One spatial network layer and its quads.
#[derive(Clone, Debug)]
pub struct Layer {
    name: String,
    network_index: usize,
    width: u32,
    height: u32,
    id_offset: u32,
    quads: Vec<Quad>,
}

impl Layer {
    /// Layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the network's layer sequence.
    #[must_use]
    pub fn network_index(&self) -> usize {
        self.network_index
    }

    /// Channel width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Channel height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Linear id of channel 0.
    #[must_use]
    pub fn id_offset(&self) -> u32 {
        self.id_offset
    }

    /// Number of channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.quads.len()
    }

    /// The quads, one per channel.
    #[must_use]
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Copies the channel data out as a stack.
    #[must_use]
    pub fn to_stack(&self) -> ChannelStack {
        let channels = self.quads.iter().map(|q| q.buffer().clone()).collect();
        ChannelStack::from_parts(self.width, self.height, channels)
    }
}

/// All quads of one forward-pass generation.
#[derive(Debug)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    generation: u32,
    total: u32,
    network_len: usize,
    dirty: DirtyTracker<u32>,
    regenerated: bool,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerRegistry {
    /// Creates an empty registry at generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            generation: 0,
            total: 0,
            network_len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            regenerated: false,
        }
    }

    /// Builds a registry from forward-pass outputs.
    ///
    /// Flat and empty layers are skipped. Every remaining channel becomes a
    /// quad with its texture uploaded through `textures`. `network_len` is the
    /// number of layers the network has, spatial or not.
    ///
    /// # Panics
    ///
    /// Panics if the outputs hold more than `2^24 - 1` channels in total.
    pub fn build(
        outputs: Vec<LayerOutput>,
        network_len: usize,
        generation: u32,
        factory: &QuadFactory,
        textures: &mut dyn TextureUpdater,
    ) -> Self {
        let spatial: Vec<(String, usize, ChannelStack)> = outputs
            .into_iter()
            .filter_map(|out| match out.data {
                LayerData::Spatial(stack) if !stack.is_empty() => {
                    Some((out.name, out.network_index, stack))
                }
                _ => None,
            })
            .collect();
        let channels: usize = spatial.iter().map(|(_, _, s)| s.len()).sum();
        assert!(
            channels <= MAX_RAW_ID as usize,
            "{channels} channels exceed the 24-bit id space"
        );

        let total_layers = spatial.len();
        let mut layers = Vec::with_capacity(total_layers);
        let mut id_offset = 0_u32;
        for (layer_index, (name, network_index, stack)) in spatial.into_iter().enumerate() {
            let (width, height) = (stack.width(), stack.height());
            let quads: Vec<Quad> = stack
                .into_channels()
                .into_iter()
                .enumerate()
                .map(|(channel, buffer)| {
                    factory.generate(buffer, channel, layer_index, total_layers, id_offset, textures)
                })
                .collect();
            let offset = id_offset;
            id_offset += u32::try_from(quads.len()).unwrap_or(u32::MAX);
            layers.push(Layer {
                name,
                network_index,
                width,
                height,
                id_offset: offset,
                quads,
            });
        }

        Self {
            layers,
            generation,
            total: id_offset,
            network_len,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            regenerated: true,
        }
    }

    /// Generation number.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of network layers, spatial or not.
    #[must_use]
    pub fn network_len(&self) -> usize {
        self.network_len
    }

    /// Spatial layers in slot order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The layer in `slot`.
    #[must_use]
    pub fn layer(&self, slot: usize) -> Option<&Layer> {
        self.layers.get(slot)
    }

    /// The slot holding network layer `network_index`.
    #[must_use]
    pub fn slot_of(&self, network_index: usize) -> Option<usize> {
        self.layers
            .iter()
            .position(|l| l.network_index == network_index)
    }

    /// Total quads.
    #[must_use]
    pub fn quad_count(&self) -> u32 {
        self.total
    }

    /// Largest raw id in use; 0 when empty.
    #[must_use]
    pub fn max_id(&self) -> u32 {
        self.total
    }

    /// Maps a picked id to its layer and channel.
    ///
    /// Returns `None` past the last quad.
    #[must_use]
    pub fn map_id_to_selection(&self, id: PickId) -> Option<Selection> {
        let mut remaining = id.linear() as usize;
        for (layer, l) in self.layers.iter().enumerate() {
            if remaining < l.quads.len() {
                return Some(Selection {
                    id,
                    layer,
                    channel: remaining,
                    generation: self.generation,
                });
            }
            remaining -= l.quads.len();
        }
        None
    }

    /// The id of a layer's channel.
    #[must_use]
    pub fn id_for(&self, slot: usize, channel: usize) -> Option<PickId> {
        self.layers
            .get(slot)?
            .quads
            .get(channel)
            .map(Quad::id)
    }

    /// Whether `selection` refers to a channel of this generation.
    #[must_use]
    pub fn is_current(&self, selection: &Selection) -> bool {
        selection.generation == self.generation
            && self.id_for(selection.layer, selection.channel) == Some(selection.id)
    }

    /// The channel data of a layer's channel.
    #[must_use]
    pub fn channel_buffer(&self, slot: usize, channel: usize) -> Option<&SliceBuffer> {
        self.layers
            .get(slot)?
            .quads
            .get(channel)
            .map(Quad::buffer)
    }

    /// The quad with `id`.
    #[must_use]
    pub fn quad(&self, id: PickId) -> Option<&Quad> {
        let sel = self.map_id_to_selection(id)?;
        self.layers[sel.layer].quads.get(sel.channel)
    }

    /// Iterates every quad in linear-id order.
    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.layers.iter().flat_map(|l| l.quads.iter())
    }

    /// Steps the hovered quad toward popped and every other quad toward rest.
    pub(crate) fn apply_hover(&mut self, hover: Option<PickId>, layout: &FieldLayout) {
        for quad in self.layers.iter_mut().flat_map(|l| l.quads.iter_mut()) {
            let update = quad.set_hovered(Some(quad.id()) == hover, layout);
            let idx = quad.id().linear();
            if update.moved {
                self.dirty.mark(idx, dirty::TRANSFORM);
            }
            if update.tint_changed {
                self.dirty.mark(idx, dirty::TINT);
            }
        }
    }

    /// Copies the spatial layers out as forward-pass outputs.
    #[must_use]
    pub fn snapshot_outputs(&self) -> Vec<LayerOutput> {
        self.layers
            .iter()
            .map(|l| LayerOutput::spatial(l.name.clone(), l.network_index, l.to_stack()))
            .collect()
    }

    /// Frees every texture.
    pub fn release(self, textures: &mut dyn TextureUpdater) {
        for quad in self.layers.into_iter().flat_map(|l| l.quads) {
            quad.release(textures);
        }
    }

    /// Drains dirty state into a fresh [`FieldChanges`].
    pub fn evaluate(&mut self) -> FieldChanges {
        let mut changes = FieldChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut FieldChanges) {
        changes.clear();
        changes.regenerated = core::mem::take(&mut self.regenerated);

        changes.transforms = self
            .dirty
            .drain(dirty::TRANSFORM)
            .deterministic()
            .run()
            .collect();
        changes.tints = self
            .dirty
            .drain(dirty::TINT)
            .deterministic()
            .run()
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessTextures;
    use alloc::vec;

    fn stack(channels: usize, w: u32, h: u32) -> ChannelStack {
        let bufs = (0..channels)
            .map(|c| SliceBuffer::filled(w, h, c as f32 / 10.0))
            .collect();
        ChannelStack::new(bufs).unwrap()
    }

    fn sample(tex: &mut HeadlessTextures) -> LayerRegistry {
        let outputs = vec![
            LayerOutput::flat("latent", 0, vec![0.0; 8]),
            LayerOutput::spatial("a", 1, stack(2, 4, 4)),
            LayerOutput::spatial("b", 2, stack(3, 8, 8)),
            LayerOutput::spatial("empty", 3, ChannelStack::new(vec![]).unwrap()),
            LayerOutput::spatial("c", 4, stack(1, 16, 16)),
        ];
        LayerRegistry::build(outputs, 5, 7, &QuadFactory::default(), tex)
    }

    #[test]
    fn build_skips_flat_and_empty_layers() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        assert_eq!(reg.layers().len(), 3);
        assert_eq!(reg.max_id(), 6);
        assert_eq!(reg.network_len(), 5);
        assert_eq!(reg.generation(), 7);
        assert_eq!(tex.live(), 6);
        assert_eq!(reg.layer(2).map(Layer::network_index), Some(4));
        assert_eq!(reg.slot_of(2), Some(1));
        assert_eq!(reg.slot_of(0), None);
    }

    #[test]
    fn cumulative_walk_maps_ids() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        let sel = reg.map_id_to_selection(PickId::from_linear(0)).unwrap();
        assert_eq!((sel.layer, sel.channel, sel.generation), (0, 0, 7));
        let sel = reg.map_id_to_selection(PickId::from_linear(4)).unwrap();
        assert_eq!((sel.layer, sel.channel), (1, 2));
        let sel = reg.map_id_to_selection(PickId::from_linear(5)).unwrap();
        assert_eq!((sel.layer, sel.channel), (2, 0));
        assert!(reg.map_id_to_selection(PickId::from_linear(6)).is_none());
    }

    #[test]
    fn ids_round_trip_through_selection() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        for quad in reg.quads() {
            let sel = reg.map_id_to_selection(quad.id()).unwrap();
            assert_eq!(reg.id_for(sel.layer, sel.channel), Some(quad.id()));
            assert!(reg.is_current(&sel));
        }
    }

    #[test]
    fn ids_are_dense_and_colors_distinct() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        let raw: Vec<u32> = reg.quads().map(|q| q.id().raw()).collect();
        let expected: Vec<u32> = (1..=reg.max_id()).collect();
        assert_eq!(raw, expected, "flat and empty layers take no ids");

        let quads: Vec<&Quad> = reg.quads().collect();
        for (i, a) in quads.iter().enumerate() {
            for b in &quads[i + 1..] {
                assert_ne!(a.id().to_bytes(), b.id().to_bytes(), "{:?} vs {:?}", a.id(), b.id());
                assert_ne!(a.id().color(), b.id().color(), "{:?} vs {:?}", a.id(), b.id());
            }
        }
    }

    #[test]
    fn stale_selection_is_not_current() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        let mut sel = reg.map_id_to_selection(PickId::from_linear(1)).unwrap();
        sel.generation = 6;
        assert!(!reg.is_current(&sel));
    }

    #[test]
    fn evaluate_reports_regeneration_once() {
        let mut tex = HeadlessTextures::new();
        let mut reg = sample(&mut tex);
        assert!(reg.evaluate().regenerated);
        assert!(reg.evaluate().is_empty());
    }

    #[test]
    fn hover_marks_dirty() {
        let mut tex = HeadlessTextures::new();
        let mut reg = sample(&mut tex);
        let _ = reg.evaluate();
        let layout = FieldLayout::DEFAULT;

        reg.apply_hover(Some(PickId::from_linear(3)), &layout);
        let changes = reg.evaluate();
        assert_eq!(changes.transforms, [3]);
        assert_eq!(changes.tints, [3]);

        reg.apply_hover(None, &layout);
        let changes = reg.evaluate();
        assert_eq!(changes.transforms, [3]);
        assert_eq!(changes.tints, [3]);
        assert!(reg.evaluate().is_empty(), "settled quads stay clean");
    }

    #[test]
    fn release_frees_textures() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        reg.release(&mut tex);
        assert_eq!(tex.live(), 0);
    }

    #[test]
    fn snapshot_preserves_layers() {
        let mut tex = HeadlessTextures::new();
        let reg = sample(&mut tex);
        let outs = reg.snapshot_outputs();
        assert_eq!(outs.len(), 3);
        assert_eq!(outs[1].network_index, 2);
        assert_eq!(outs[1].stack().map(ChannelStack::len), Some(3));
    }
}
