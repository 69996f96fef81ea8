// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Channel textures and the editor display texture.

use std::collections::HashMap;

use actfield_core::backend::TextureUpdater;
use actfield_core::display::DisplaySurface;
use actfield_core::id::TextureKey;
use actfield_core::slice::SliceBuffer;

use crate::GpuContext;

#[derive(Debug)]
struct ChannelTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// One `R32Float` texture per quad, each with its own bind group.
///
/// `R32Float` is not filterable everywhere, so channels are sampled with a
/// nearest, non-filtering sampler.
#[derive(Debug)]
pub struct TextureStore {
    ctx: GpuContext,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: HashMap<TextureKey, ChannelTexture>,
    next_key: u64,
    uploads: u64,
}

impl TextureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("actfield channel texture layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                        count: None,
                    },
                ],
            });
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("actfield channel sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            ctx: ctx.clone(),
            layout,
            sampler,
            textures: HashMap::new(),
            next_key: 0,
            uploads: 0,
        }
    }

    /// Layout of every channel bind group (texture at 0, sampler at 1).
    #[must_use]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// The bind group of a live texture.
    #[must_use]
    pub fn bind_group(&self, key: TextureKey) -> Option<&wgpu::BindGroup> {
        self.textures.get(&key).map(|t| &t.bind_group)
    }

    /// Number of live textures.
    #[must_use]
    pub fn live(&self) -> usize {
        self.textures.len()
    }

    /// Total uploads, including the initial one per texture.
    #[must_use]
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    fn write(&mut self, texture: &wgpu::Texture, buffer: &SliceBuffer) {
        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(buffer.as_slice()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * buffer.width()),
                rows_per_image: Some(buffer.height()),
            },
            wgpu::Extent3d {
                width: buffer.width(),
                height: buffer.height(),
                depth_or_array_layers: 1,
            },
        );
        self.uploads += 1;
    }
}

impl TextureUpdater for TextureStore {
    fn create_texture(&mut self, buffer: &SliceBuffer) -> TextureKey {
        let key = TextureKey(self.next_key);
        self.next_key += 1;
        let (width, height) = (buffer.width().max(1), buffer.height().max(1));
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("actfield channel"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self
            .ctx
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("actfield channel bind group"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
        if !buffer.is_empty() {
            self.write(&texture, buffer);
        }
        self.textures.insert(
            key,
            ChannelTexture {
                texture,
                bind_group,
                width,
                height,
            },
        );
        key
    }

    fn update_texture(&mut self, key: TextureKey, buffer: &SliceBuffer) {
        let Some(entry) = self.textures.get(&key) else {
            log::warn!("update of unknown texture {key:?}");
            return;
        };
        if (entry.width, entry.height) != (buffer.width(), buffer.height()) {
            log::warn!(
                "texture {key:?} is {}x{}, update is {}x{}; skipped",
                entry.width,
                entry.height,
                buffer.width(),
                buffer.height()
            );
            return;
        }
        let texture = entry.texture.clone();
        self.write(&texture, buffer);
    }

    fn release_texture(&mut self, key: TextureKey) {
        if let Some(entry) = self.textures.remove(&key) {
            entry.texture.destroy();
        }
    }
}

/// The editor's RGBA image on the GPU.
///
/// The texture is recreated whenever the presented size changes.
#[derive(Debug)]
pub struct DisplayTexture {
    ctx: GpuContext,
    texture: Option<(wgpu::Texture, u32, u32)>,
    presents: u64,
}

impl DisplayTexture {
    /// Format of the display texture.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates an empty display.
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        Self {
            ctx: ctx.clone(),
            texture: None,
            presents: 0,
        }
    }

    /// The current texture, if anything is shown.
    #[must_use]
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        self.texture.as_ref().map(|(t, _, _)| t)
    }

    /// Size of the current image.
    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.texture.as_ref().map(|&(_, w, h)| (w, h))
    }

    /// Number of images presented.
    #[must_use]
    pub fn presents(&self) -> u64 {
        self.presents
    }

    fn ensure(&mut self, width: u32, height: u32) -> wgpu::Texture {
        if let Some((texture, w, h)) = &self.texture
            && (*w, *h) == (width, height)
        {
            return texture.clone();
        }
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("actfield display"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        if let Some((old, _, _)) = self.texture.replace((texture.clone(), width, height)) {
            old.destroy();
        }
        texture
    }
}

impl DisplaySurface for DisplayTexture {
    fn present(&mut self, width: u32, height: u32, rgba: &[u8]) {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            log::warn!(
                "display image {width}x{height} has {} bytes, expected {expected}",
                rgba.len()
            );
            return;
        }
        let texture = self.ensure(width, height);
        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.presents += 1;
    }

    fn clear(&mut self) {
        if let Some((texture, _, _)) = self.texture.take() {
            texture.destroy();
        }
    }
}
