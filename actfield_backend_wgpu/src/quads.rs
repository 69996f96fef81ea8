// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instance data, camera uniform and the visible quad pass.

use std::sync::mpsc;

use actfield_render::{OrbitCamera, RenderItem, RenderPlan};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::texture::TextureStore;
use crate::{BackendError, GpuContext, padded_row, shaders};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Two triangles covering `[-1, 1]²` in the quad's local xy plane.
const CORNERS: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, -1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
];

/// Per-instance vertex data for one quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadInstance {
    /// Model matrix, column-major.
    pub model: [f32; 16],
    /// Id colour; alpha unused.
    pub id_color: [f32; 4],
    /// Tint; alpha unused.
    pub tint: [f32; 4],
}

impl QuadInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        1 => Float32x4,
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];

    /// Packs a render item.
    #[must_use]
    pub fn from_item(item: &RenderItem) -> Self {
        let [r, g, b] = item.id_color;
        let [tr, tg, tb] = item.tint;
        Self {
            model: item.model,
            id_color: [r, g, b, 1.0],
            tint: [tr, tg, tb, 1.0],
        }
    }

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

const CORNER_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

fn corner_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<[f32; 2]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &CORNER_ATTRIBS,
    }
}

/// Quad corners, per-instance data and the camera uniform.
///
/// Both passes draw from the same buffers; [`upload`](Self::upload) once per
/// frame before rendering either.
#[derive(Debug)]
pub struct FieldBuffers {
    ctx: GpuContext,
    corners: wgpu::Buffer,
    instances: wgpu::Buffer,
    capacity: usize,
    count: u32,
    scratch: Vec<QuadInstance>,
    camera: wgpu::Buffer,
    camera_layout: wgpu::BindGroupLayout,
    camera_group: wgpu::BindGroup,
}

impl FieldBuffers {
    /// Creates buffers with room for a handful of quads; they grow on demand.
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let device = &ctx.device;
        let corners = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("actfield quad corners"),
            contents: bytemuck::cast_slice(&CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let capacity = 64;
        let instances = Self::instance_buffer(device, capacity);
        let camera = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("actfield camera"),
            contents: bytemuck::cast_slice(&OrbitCamera::DEFAULT.view_projection()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("actfield camera layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let camera_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("actfield camera bind group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera.as_entire_binding(),
            }],
        });
        Self {
            ctx: ctx.clone(),
            corners,
            instances,
            capacity,
            count: 0,
            scratch: Vec::new(),
            camera,
            camera_layout,
            camera_group,
        }
    }

    fn instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("actfield quad instances"),
            size: (capacity * size_of::<QuadInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Writes every plan item and the camera matrix.
    pub fn upload(&mut self, plan: &RenderPlan, camera: &OrbitCamera) {
        self.scratch.clear();
        self.scratch
            .extend(plan.items.iter().map(QuadInstance::from_item));
        if self.scratch.len() > self.capacity {
            self.capacity = self.scratch.len().next_power_of_two();
            self.instances.destroy();
            self.instances = Self::instance_buffer(&self.ctx.device, self.capacity);
            log::debug!("instance buffer grown to {} quads", self.capacity);
        }
        if !self.scratch.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.instances, 0, bytemuck::cast_slice(&self.scratch));
        }
        self.count = u32::try_from(self.scratch.len()).unwrap_or(u32::MAX);
        self.ctx.queue.write_buffer(
            &self.camera,
            0,
            bytemuck::cast_slice(&camera.view_projection()),
        );
    }

    /// Instances written by the last upload.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.count
    }

    pub(crate) fn camera_layout(&self) -> &wgpu::BindGroupLayout {
        &self.camera_layout
    }

    pub(crate) fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(0, &self.camera_group, &[]);
        pass.set_vertex_buffer(0, self.corners.slice(..));
        pass.set_vertex_buffer(1, self.instances.slice(..));
    }
}

/// Builds a field pipeline drawing into `format` with a depth test.
pub(crate) fn field_pipeline(
    device: &wgpu::Device,
    label: &str,
    layouts: &[&wgpu::BindGroupLayout],
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shaders::FIELD_WGSL.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[corner_layout(), QuadInstance::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(fragment_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// A color target plus matching depth buffer.
#[derive(Debug)]
pub(crate) struct Target {
    pub(crate) color: wgpu::Texture,
    pub(crate) color_view: wgpu::TextureView,
    pub(crate) depth_view: wgpu::TextureView,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Target {
    pub(crate) fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            width,
            height,
        }
    }

    /// Begins a pass clearing color to transparent black and depth to far.
    pub(crate) fn begin<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        label: &str,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// The visible pass: each quad samples its channel texture and multiplies by
/// its tint.
#[derive(Debug)]
pub struct QuadPass {
    ctx: GpuContext,
    pipeline: wgpu::RenderPipeline,
    target: Target,
}

impl QuadPass {
    /// Format of the visible target.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates the pass and a `width` × `height` off-screen target.
    #[must_use]
    pub fn new(
        ctx: &GpuContext,
        textures: &TextureStore,
        buffers: &FieldBuffers,
        width: u32,
        height: u32,
    ) -> Self {
        let pipeline = field_pipeline(
            &ctx.device,
            "actfield visible pass",
            &[buffers.camera_layout(), textures.bind_group_layout()],
            "fs_visible",
            Self::FORMAT,
        );
        Self {
            ctx: ctx.clone(),
            pipeline,
            target: Target::new(&ctx.device, "actfield visible target", Self::FORMAT, width, height),
        }
    }

    /// Recreates the target at a new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.target = Target::new(
            &self.ctx.device,
            "actfield visible target",
            Self::FORMAT,
            width,
            height,
        );
    }

    /// The rendered image.
    #[must_use]
    pub fn target(&self) -> &wgpu::Texture {
        &self.target.color
    }

    /// Draws every quad of `plan`. Items whose texture is gone are skipped.
    pub fn render(&self, buffers: &FieldBuffers, textures: &TextureStore, plan: &RenderPlan) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("actfield visible pass"),
            });
        {
            let mut pass = self.target.begin(&mut encoder, "actfield visible pass");
            pass.set_pipeline(&self.pipeline);
            buffers.bind(&mut pass);
            let count = buffers.instance_count();
            for (i, item) in (0..count).zip(&plan.items) {
                let Some(group) = textures.bind_group(item.texture) else {
                    continue;
                };
                pass.set_bind_group(1, group, &[]);
                pass.draw(0..6, i..i + 1);
            }
        }
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    /// Copies the visible target back to the CPU as tightly packed RGBA.
    ///
    /// Blocks until the copy completes; meant for headless runs and tests,
    /// not the frame loop.
    pub fn read_pixels(&self) -> Result<Vec<u8>, BackendError> {
        let (width, height) = (self.target.width, self.target.height);
        let row = 4 * width;
        let padded = padded_row(row);
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("actfield visible readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("actfield visible readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.ctx.device.poll(wgpu::PollType::wait_indefinitely())?;
        receiver
            .recv()
            .map_err(|_| BackendError::CallbackDropped)??;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(row as usize * height as usize);
        for chunk in mapped.chunks(padded as usize).take(height as usize) {
            pixels.extend_from_slice(&chunk[..row as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actfield_core::id::{PickId, TextureKey};

    #[test]
    fn instance_packs_item() {
        let item = RenderItem {
            id: PickId::from_linear(0),
            layer: 0,
            channel: 0,
            model: core::array::from_fn(|i| i as f32),
            id_color: [1.0 / 255.0, 0.0, 0.0],
            tint: [0.3, 0.5, 0.0],
            texture: TextureKey(7),
        };
        let inst = QuadInstance::from_item(&item);
        assert_eq!(inst.model[13], 13.0);
        assert_eq!(inst.id_color, [1.0 / 255.0, 0.0, 0.0, 1.0]);
        assert_eq!(inst.tint, [0.3, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn instance_layout_covers_struct() {
        let last = QuadInstance::ATTRIBS[5];
        assert_eq!(last.offset + 16, size_of::<QuadInstance>() as u64);
        assert_eq!(size_of::<QuadInstance>(), 96);
    }
}
