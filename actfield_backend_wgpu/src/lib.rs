// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! wgpu rasterization backend for actfield.
//!
//! This crate implements the backend traits of [`actfield_core`] on top of
//! wgpu:
//!
//! - [`TextureStore`]: one `R32Float` texture per quad
//!   ([`TextureUpdater`](actfield_core::backend::TextureUpdater)).
//! - [`PickingPass`]: the id pass and its non-blocking cursor-pixel readback
//!   ([`PickSource`](actfield_core::backend::PickSource)).
//! - [`QuadPass`]: the visible pass: channel texture times tint.
//! - [`DisplayTexture`]: the editor's RGBA image
//!   ([`DisplaySurface`](actfield_core::display::DisplaySurface)).
//!
//! [`FieldBuffers`] holds the per-instance quad data and camera uniform both
//! passes draw from.
//!
//! ```rust,ignore
//! let ctx = GpuContext::headless_blocking()?;
//! let mut textures = TextureStore::new(&ctx);
//! let mut buffers = FieldBuffers::new(&ctx);
//! let mut picking = PickingPass::new(&ctx, &buffers, 640, 480);
//! let visible = QuadPass::new(&ctx, &textures, &buffers, 640, 480);
//!
//! // per frame
//! buffers.upload(&plan, &camera);
//! picking.render(&buffers, plan.generation);
//! visible.render(&buffers, &textures, &plan);
//! session.frame(&mut picking, &mut tracer);
//! ```

mod picking;
mod quads;
mod shaders;
mod texture;

pub use picking::PickingPass;
pub use quads::{FieldBuffers, QuadInstance, QuadPass};
pub use texture::{DisplayTexture, TextureStore};

/// Errors raised by the wgpu backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No adapter matched the request.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    /// The adapter refused to create a device.
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    /// Polling the device for completed work failed.
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    /// Mapping a readback buffer failed.
    #[error("readback mapping failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    /// The mapping callback was dropped without reporting.
    #[error("readback callback dropped")]
    CallbackDropped,
}

/// A device and its queue.
///
/// Both handles are cheap to clone; every pass keeps its own copy.
#[derive(Clone, Debug)]
pub struct GpuContext {
    /// The logical device.
    pub device: wgpu::Device,
    /// The device's queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Wraps an existing device and queue.
    #[must_use]
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Requests a device without a surface.
    pub async fn headless() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::debug!("using adapter {:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("actfield device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;
        Ok(Self { device, queue })
    }

    /// [`headless`](Self::headless), blocking the calling thread.
    pub fn headless_blocking() -> Result<Self, BackendError> {
        pollster::block_on(Self::headless())
    }
}

/// Rounds `bytes` up to wgpu's buffer-copy row alignment.
pub(crate) fn padded_row(bytes: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    bytes.div_ceil(align) * align
}
