// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: one draw item per quad of the current generation.

use alloc::vec::Vec;

use actfield_core::backend::Presenter;
use actfield_core::id::{PickId, TextureKey};
use actfield_core::quad::Quad;
use actfield_core::registry::{FieldChanges, LayerRegistry};

/// Draw data for one quad.
///
/// The id pass draws the quad flat in [`id_color`](Self::id_color); the
/// visible pass samples [`texture`](Self::texture) and multiplies by
/// [`tint`](Self::tint).
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// Picking id of the quad.
    pub id: PickId,
    /// Layer slot among spatial layers.
    pub layer: usize,
    /// Channel index within the layer.
    pub channel: usize,
    /// Model transform (column-major 4x4).
    pub model: [f32; 16],
    /// Id colour written by the picking pass.
    pub id_color: [f32; 3],
    /// Tint multiplied into the sampled channel.
    pub tint: [f32; 3],
    /// Backend texture holding the channel data.
    pub texture: TextureKey,
}

impl RenderItem {
    /// Captures the current draw state of `quad`.
    #[must_use]
    pub fn from_quad(quad: &Quad) -> Self {
        Self {
            id: quad.id(),
            layer: quad.layer_index(),
            channel: quad.channel(),
            model: quad.model().to_cols_f32(),
            id_color: quad.id().color(),
            tint: quad.tint(),
            texture: quad.texture(),
        }
    }
}

/// Every quad of one registry generation, indexed by linear id.
///
/// Backends upload [`items`](Self::items) as per-instance data. After the
/// first [`build`](Self::build), [`refresh`](Self::refresh) only touches
/// items the registry reported as changed.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    /// Registry generation the items were built from.
    pub generation: u32,
    /// Draw items; `items[i]` is the quad with linear id `i`.
    pub items: Vec<RenderItem>,
}

impl RenderPlan {
    /// Creates an empty render plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the plan for every quad in `registry`.
    #[must_use]
    pub fn build(registry: &LayerRegistry) -> Self {
        let mut plan = Self::new();
        plan.rebuild(registry);
        plan
    }

    /// Discards all items and rebuilds from `registry`.
    pub fn rebuild(&mut self, registry: &LayerRegistry) {
        self.items.clear();
        self.items.extend(registry.quads().map(RenderItem::from_quad));
        self.generation = registry.generation();
    }

    /// Brings the plan up to date with `changes`.
    ///
    /// A regenerated registry (or one from another generation) is rebuilt
    /// wholesale. Otherwise only the model matrices and tints named in
    /// `changes` are patched. Returns the number of patched items.
    pub fn refresh(&mut self, registry: &LayerRegistry, changes: &FieldChanges) -> usize {
        if changes.regenerated || registry.generation() != self.generation {
            self.rebuild(registry);
            return self.items.len();
        }
        let mut patched = 0;
        for &linear in &changes.transforms {
            if let Some((item, quad)) = self.lookup(registry, linear) {
                item.model = quad.model().to_cols_f32();
                patched += 1;
            }
        }
        for &linear in &changes.tints {
            if let Some((item, quad)) = self.lookup(registry, linear) {
                item.tint = quad.tint();
                patched += 1;
            }
        }
        patched
    }

    fn lookup<'a>(
        &'a mut self,
        registry: &'a LayerRegistry,
        linear: u32,
    ) -> Option<(&'a mut RenderItem, &'a Quad)> {
        let quad = registry.quad(PickId::from_raw(linear.checked_add(1)?)?)?;
        let item = self.items.get_mut(usize::try_from(linear).ok()?)?;
        Some((item, quad))
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.generation = 0;
    }

    /// Number of draw items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the plan draws nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Presenter for RenderPlan {
    fn apply(&mut self, registry: &LayerRegistry, changes: &FieldChanges) {
        self.refresh(registry, changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actfield_core::backend::HeadlessTextures;
    use actfield_core::forward::{ChannelStack, LayerOutput};
    use actfield_core::quad::QuadFactory;
    use actfield_core::slice::SliceBuffer;
    use alloc::vec;

    fn registry(generation: u32, tex: &mut HeadlessTextures) -> LayerRegistry {
        let a = ChannelStack::new(vec![SliceBuffer::zeros(2, 2); 3]).unwrap();
        let b = ChannelStack::new(vec![SliceBuffer::zeros(1, 1); 2]).unwrap();
        LayerRegistry::build(
            vec![
                LayerOutput::spatial("conv1", 0, a),
                LayerOutput::flat("dense", 1, vec![0.0; 4]),
                LayerOutput::spatial("conv2", 2, b),
            ],
            3,
            generation,
            &QuadFactory::default(),
            tex,
        )
    }

    #[test]
    fn build_indexes_items_by_linear_id() {
        let mut tex = HeadlessTextures::new();
        let reg = registry(1, &mut tex);
        let plan = RenderPlan::build(&reg);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.generation, 1);
        for (i, item) in plan.items.iter().enumerate() {
            assert_eq!(item.id.linear() as usize, i, "item {i} out of order");
        }
        let last = &plan.items[4];
        assert_eq!((last.layer, last.channel), (1, 1));
        assert_eq!(last.id_color, PickId::from_linear(4).color());
    }

    #[test]
    fn model_matches_quad_transform() {
        let mut tex = HeadlessTextures::new();
        let reg = registry(1, &mut tex);
        let plan = RenderPlan::build(&reg);
        let quad = reg.quad(PickId::from_linear(2)).unwrap();
        let m = plan.items[2].model;
        assert_eq!(m, quad.model().to_cols_f32());
        assert_eq!(m[15], 1.0);
    }

    #[test]
    fn refresh_patches_only_named_items() {
        let mut tex = HeadlessTextures::new();
        let reg = registry(1, &mut tex);
        let mut plan = RenderPlan::build(&reg);
        plan.items[1].tint = [0.0; 3];
        plan.items[3].tint = [0.0; 3];
        let changes = FieldChanges {
            tints: vec![1],
            ..FieldChanges::default()
        };
        assert_eq!(plan.refresh(&reg, &changes), 1);
        assert_eq!(plan.items[1].tint, [1.0, 1.0, 1.0]);
        assert_eq!(plan.items[3].tint, [0.0; 3], "unchanged items are left alone");
    }

    #[test]
    fn refresh_ignores_unknown_ids() {
        let mut tex = HeadlessTextures::new();
        let reg = registry(1, &mut tex);
        let mut plan = RenderPlan::build(&reg);
        let changes = FieldChanges {
            transforms: vec![99, u32::MAX],
            ..FieldChanges::default()
        };
        assert_eq!(plan.refresh(&reg, &changes), 0);
    }

    #[test]
    fn regeneration_rebuilds() {
        let mut tex = HeadlessTextures::new();
        let mut plan = RenderPlan::new();
        assert!(plan.is_empty());
        let reg = registry(2, &mut tex);
        let changes = FieldChanges {
            regenerated: true,
            ..FieldChanges::default()
        };
        plan.apply(&reg, &changes);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.generation, 2);

        let newer = registry(3, &mut tex);
        plan.refresh(&newer, &FieldChanges::default());
        assert_eq!(plan.generation, 3, "generation mismatch forces a rebuild");
        assert_eq!(plan.items[0].texture, newer.quads().next().unwrap().texture());

        plan.clear();
        assert!(plan.is_empty());
    }
}
