// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for rasterization integrations.
//!
//! The core never talks to a GPU. A rasterization backend provides three
//! capabilities, each as a trait so tests can substitute doubles:
//!
//! - **Textures**: [`TextureUpdater`] creates one texture per channel,
//!   re-uploads it when the channel's buffer is replaced, and frees it when the
//!   quad set is regenerated. The [`QuadFactory`](crate::quad::QuadFactory)
//!   receives it as an argument instead of capturing backend handles.
//!
//! - **Picking**: [`PickSource`] exposes the id target: which pixel to read
//!   on the next picking pass, and the most recent completed readback.
//!
//! - **Presentation**: [`Presenter`] consumes [`FieldChanges`] to patch
//!   whatever per-quad state the backend keeps (uniforms, draw lists).
//!
//! # Frame loop
//!
//! ```rust,ignore
//! fn on_frame(session: &mut Session, backend: &mut Backend) {
//!     // Pick: read last pass's pixel, map to hover, animate.
//!     session.frame(&mut backend.picking, &mut tracer);
//!
//!     // Evaluate: drain dirty channels.
//!     let changes = session.evaluate();
//!
//!     // Present: patch the render plan, draw id pass then visible pass.
//!     plan.apply(session.registry(), &changes);
//!     backend.render(&plan, &camera, target);
//! }
//! ```
//!
//! [`FieldChanges`]: crate::registry::FieldChanges

use alloc::collections::BTreeMap;

use crate::id::TextureKey;
use crate::picking::PickSample;
use crate::registry::{FieldChanges, LayerRegistry};
use crate::slice::SliceBuffer;

/// Uploads channel buffers into backend textures.
pub trait TextureUpdater {
    /// Creates a texture holding `buffer` and returns its key.
    fn create_texture(&mut self, buffer: &SliceBuffer) -> TextureKey;

    /// Replaces the contents of `key` with `buffer`.
    ///
    /// The buffer has the same shape the texture was created with.
    fn update_texture(&mut self, key: TextureKey, buffer: &SliceBuffer);

    /// Frees the texture. The key is not used again.
    fn release_texture(&mut self, key: TextureKey);
}

/// The off-screen id target used for picking.
pub trait PickSource {
    /// Size of the id target in device pixels.
    fn target_size(&self) -> (u32, u32);

    /// Selects the pixel the next picking pass should read back.
    fn request_pixel(&mut self, x: u32, y: u32);

    /// The most recent completed readback, if any.
    ///
    /// Implementations must not block on GPU work here.
    fn latest_sample(&mut self) -> Option<PickSample>;

    /// Number of picking passes submitted so far.
    fn submitted_passes(&self) -> u64;
}

/// Applies evaluated field changes to backend state.
pub trait Presenter {
    /// Applies `changes`, reading current quad state from `registry`.
    fn apply(&mut self, registry: &LayerRegistry, changes: &FieldChanges);
}

/// A [`TextureUpdater`] that keeps channel copies in memory.
///
/// Used by headless runs and tests in place of a GPU.
#[derive(Debug, Default)]
pub struct HeadlessTextures {
    next: u64,
    live: BTreeMap<TextureKey, SliceBuffer>,
    uploads: u64,
}

impl HeadlessTextures {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Total uploads, counting creation.
    #[must_use]
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// The last contents uploaded to `key`.
    #[must_use]
    pub fn get(&self, key: TextureKey) -> Option<&SliceBuffer> {
        self.live.get(&key)
    }
}

impl TextureUpdater for HeadlessTextures {
    fn create_texture(&mut self, buffer: &SliceBuffer) -> TextureKey {
        let key = TextureKey(self.next);
        self.next += 1;
        self.uploads += 1;
        self.live.insert(key, buffer.clone());
        key
    }

    fn update_texture(&mut self, key: TextureKey, buffer: &SliceBuffer) {
        self.uploads += 1;
        if let Some(slot) = self.live.get_mut(&key) {
            slot.clone_from(buffer);
        }
    }

    fn release_texture(&mut self, key: TextureKey) {
        self.live.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_textures_track_lifecycle() {
        let mut tex = HeadlessTextures::new();
        let a = tex.create_texture(&SliceBuffer::zeros(2, 2));
        let b = tex.create_texture(&SliceBuffer::filled(2, 2, 1.0));
        assert_ne!(a, b);
        assert_eq!(tex.live(), 2);

        tex.update_texture(a, &SliceBuffer::filled(2, 2, 0.5));
        assert_eq!(tex.get(a).and_then(|t| t.get(0, 0)), Some(0.5));
        assert_eq!(tex.uploads(), 3);

        tex.release_texture(a);
        assert_eq!(tex.live(), 1);
        assert!(tex.get(a).is_none());
    }
}
