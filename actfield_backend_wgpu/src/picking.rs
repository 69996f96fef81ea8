// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The id pass and its cursor-pixel readback.
//!
//! Every [`render`](PickingPass::render) draws the id target and, if a pixel
//! is requested and a staging slot is free, copies that pixel into the slot
//! and starts mapping it. [`latest_sample`](PickSource::latest_sample) polls
//! the device without waiting and advances whichever slots have finished, so
//! the frame loop never blocks on the GPU; hover lags the cursor by the
//! mapping latency instead.

use std::sync::mpsc;

use actfield_core::backend::PickSource;
use actfield_core::picking::PickSample;

use crate::quads::{FieldBuffers, Target, field_pipeline};
use crate::{BackendError, GpuContext};

/// Staging buffers are one aligned row; only the first four bytes matter.
const STAGING_SIZE: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    pass: u64,
    generation: u32,
    x: u32,
    y: u32,
}

#[derive(Debug)]
enum SlotState {
    Idle,
    Mapping {
        pending: Pending,
        receiver: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
    },
}

#[derive(Debug)]
struct ReadbackSlot {
    buffer: wgpu::Buffer,
    state: SlotState,
}

/// Renders quads flat in their id colours and reads back one pixel.
#[derive(Debug)]
pub struct PickingPass {
    ctx: GpuContext,
    pipeline: wgpu::RenderPipeline,
    target: Target,
    slots: Vec<ReadbackSlot>,
    requested: Option<(u32, u32)>,
    submitted: u64,
    skipped: u64,
    latest: Option<PickSample>,
    error: Option<BackendError>,
}

impl PickingPass {
    /// Format of the id target.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Readbacks that may be in flight at once.
    pub const SLOTS: usize = 2;

    /// Creates the pass and a `width` × `height` id target.
    #[must_use]
    pub fn new(ctx: &GpuContext, buffers: &FieldBuffers, width: u32, height: u32) -> Self {
        let pipeline = field_pipeline(
            &ctx.device,
            "actfield id pass",
            &[buffers.camera_layout()],
            "fs_id",
            Self::FORMAT,
        );
        let slots = (0..Self::SLOTS)
            .map(|_| ReadbackSlot {
                buffer: ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("actfield pick staging"),
                    size: u64::from(STAGING_SIZE),
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                }),
                state: SlotState::Idle,
            })
            .collect();
        Self {
            ctx: ctx.clone(),
            pipeline,
            target: Target::new(&ctx.device, "actfield id target", Self::FORMAT, width, height),
            slots,
            requested: None,
            submitted: 0,
            skipped: 0,
            latest: None,
            error: None,
        }
    }

    /// Recreates the id target at a new size.
    ///
    /// In-flight readbacks still complete; their pixels refer to the old size
    /// and are aged out by the picker's latency guard.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.target = Target::new(
            &self.ctx.device,
            "actfield id target",
            Self::FORMAT,
            width,
            height,
        );
        self.requested = None;
    }

    /// Readbacks skipped because every slot was busy.
    #[must_use]
    pub fn skipped_readbacks(&self) -> u64 {
        self.skipped
    }

    /// Takes the last readback error, if any.
    pub fn take_error(&mut self) -> Option<BackendError> {
        self.error.take()
    }

    /// Draws the id target for registry `generation` and starts reading back
    /// the requested pixel.
    pub fn render(&mut self, buffers: &FieldBuffers, generation: u32) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("actfield id pass"),
            });
        {
            let mut pass = self.target.begin(&mut encoder, "actfield id pass");
            let count = buffers.instance_count();
            if count > 0 {
                pass.set_pipeline(&self.pipeline);
                buffers.bind(&mut pass);
                pass.draw(0..6, 0..count);
            }
        }
        self.submitted += 1;
        let pass = self.submitted;

        let mut started = None;
        if let Some((x, y)) = self.requested
            && x < self.target.width
            && y < self.target.height
        {
            if let Some(index) = self
                .slots
                .iter()
                .position(|s| matches!(s.state, SlotState::Idle))
            {
                encoder.copy_texture_to_buffer(
                    wgpu::TexelCopyTextureInfo {
                        texture: &self.target.color,
                        mip_level: 0,
                        origin: wgpu::Origin3d { x, y, z: 0 },
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::TexelCopyBufferInfo {
                        buffer: &self.slots[index].buffer,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(STAGING_SIZE),
                            rows_per_image: Some(1),
                        },
                    },
                    wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                );
                started = Some((
                    index,
                    Pending {
                        pass,
                        generation,
                        x,
                        y,
                    },
                ));
            } else {
                self.skipped += 1;
                log::debug!("pick readback slots busy, skipping pass {pass}");
            }
        }
        self.ctx.queue.submit(Some(encoder.finish()));

        if let Some((index, pending)) = started {
            let slot = &mut self.slots[index];
            let (sender, receiver) = mpsc::channel();
            slot.buffer
                .slice(..)
                .map_async(wgpu::MapMode::Read, move |result| {
                    let _ = sender.send(result);
                });
            slot.state = SlotState::Mapping { pending, receiver };
        }
    }

    /// Advances finished readbacks without blocking.
    fn poll(&mut self) {
        if let Err(e) = self.ctx.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {e}");
            self.error = Some(BackendError::Poll(e));
        }
        for slot in &mut self.slots {
            let next = match std::mem::replace(&mut slot.state, SlotState::Idle) {
                SlotState::Idle => SlotState::Idle,
                SlotState::Mapping { pending, receiver } => match receiver.try_recv() {
                    Ok(Ok(())) => {
                        let mapped = slot.buffer.slice(..).get_mapped_range();
                        let rgba = [mapped[0], mapped[1], mapped[2], mapped[3]];
                        drop(mapped);
                        slot.buffer.unmap();
                        let sample = PickSample {
                            pass: pending.pass,
                            generation: pending.generation,
                            x: pending.x,
                            y: pending.y,
                            rgba,
                        };
                        if self.latest.is_none_or(|l| l.pass < sample.pass) {
                            self.latest = Some(sample);
                        }
                        SlotState::Idle
                    }
                    Ok(Err(e)) => {
                        log::warn!("pick readback for pass {} failed: {e}", pending.pass);
                        self.error = Some(BackendError::Map(e));
                        SlotState::Idle
                    }
                    Err(mpsc::TryRecvError::Empty) => SlotState::Mapping { pending, receiver },
                    Err(mpsc::TryRecvError::Disconnected) => {
                        self.error = Some(BackendError::CallbackDropped);
                        SlotState::Idle
                    }
                },
            };
            slot.state = next;
        }
    }
}

impl PickSource for PickingPass {
    fn target_size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    fn request_pixel(&mut self, x: u32, y: u32) {
        self.requested = Some((x, y));
    }

    fn latest_sample(&mut self) -> Option<PickSample> {
        self.poll();
        self.latest
    }

    fn submitted_passes(&self) -> u64 {
        self.submitted
    }
}
