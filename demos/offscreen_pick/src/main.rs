// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Off-screen picking against a real GPU.
//!
//! Renders the toy network's field with wgpu, aims the pointer at one quad,
//! and runs frames until the asynchronous id readback reports it. The quad is
//! then opened, edited and committed, and the visible pass is read back to
//! check that something was drawn.

use std::time::Duration;

use actfield_backend_wgpu::{
    DisplayTexture, FieldBuffers, GpuContext, PickingPass, QuadPass, TextureStore,
};
use actfield_core::registry::Selection;
use actfield_core::session::Session;
use actfield_core::trace::Tracer;
use actfield_core::transformation::Transformation;
use actfield_render::{OrbitCamera, RenderPlan};
use kurbo::Size;
use toy_model_common::{INPUT_SIZE, ToyNet, gradient_input};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
/// Frames to wait for a readback before giving up.
const MAX_FRAMES: usize = 120;
/// Layer slot and channel the demo aims at.
const TARGET_SLOT: usize = 1;
const TARGET_CHANNEL: usize = 2;

#[derive(Debug)]
struct Gpu {
    textures: TextureStore,
    display: DisplayTexture,
    buffers: FieldBuffers,
    picking: PickingPass,
    visible: QuadPass,
    camera: OrbitCamera,
    plan: RenderPlan,
}

impl Gpu {
    /// Uploads quad changes and runs both passes, then lets the session
    /// pick against the id target.
    fn frame(&mut self, session: &mut Session, tracer: &mut Tracer<'_>) -> Option<Selection> {
        let changes = session.evaluate();
        self.plan.refresh(session.registry(), &changes);
        self.buffers.upload(&self.plan, &self.camera);
        self.picking.render(&self.buffers, self.plan.generation);
        self.visible.render(&self.buffers, &self.textures, &self.plan);
        let hover = session.frame(&mut self.picking, tracer);
        if let Some(e) = self.picking.take_error() {
            eprintln!("pick readback failed: {e}");
        }
        hover
    }
}

fn main() {
    let ctx = match GpuContext::headless_blocking() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("no GPU available: {e}");
            return;
        }
    };
    let textures = TextureStore::new(&ctx);
    let buffers = FieldBuffers::new(&ctx);
    let mut gpu = Gpu {
        display: DisplayTexture::new(&ctx),
        picking: PickingPass::new(&ctx, &buffers, WIDTH, HEIGHT),
        visible: QuadPass::new(&ctx, &textures, &buffers, WIDTH, HEIGHT),
        camera: OrbitCamera::with_viewport(WIDTH, HEIGHT),
        plan: RenderPlan::new(),
        textures,
        buffers,
    };

    let mut session = Session::default();
    let mut net = ToyNet::new();
    let mut tracer = Tracer::none();
    session
        .regenerate(
            &mut net,
            &gradient_input(INPUT_SIZE),
            &mut gpu.textures,
            &mut gpu.display,
            &mut tracer,
        )
        .expect("toy network runs on its own input");
    println!(
        "Generation {}: {} layers, {} quads, {} textures",
        session.registry().generation(),
        session.registry().layers().len(),
        session.registry().quad_count(),
        gpu.textures.live()
    );

    let Some(target) = session
        .registry()
        .id_for(TARGET_SLOT, TARGET_CHANNEL)
        .and_then(|id| session.registry().quad(id))
    else {
        eprintln!("field has no quad at slot {TARGET_SLOT} channel {TARGET_CHANNEL}");
        return;
    };
    let target_id = target.id();
    let Some(position) = gpu.camera.project(target.translation(), WIDTH, HEIGHT) else {
        eprintln!("target quad is behind the camera");
        return;
    };
    session.pointer_moved(position, Size::new(f64::from(WIDTH), f64::from(HEIGHT)));

    let mut hovered = None;
    for frame in 0..MAX_FRAMES {
        if let Some(hit) = gpu.frame(&mut session, &mut tracer) {
            println!("Frame {frame}: hovering {:?}", hit.id);
            if hit.id == target_id {
                hovered = Some(hit);
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    println!("{} pick readbacks skipped", gpu.picking.skipped_readbacks());
    let Some(hovered) = hovered else {
        eprintln!("pointer at {position:?} never resolved to {target_id:?}");
        return;
    };

    session.pointer_released(&mut gpu.display, &mut tracer);
    session.apply(
        Transformation::Fill { value: 1.0 },
        false,
        &mut gpu.display,
        &mut tracer,
    );
    session.edit(&mut gpu.display, &mut tracer, |editor, display| {
        editor.rotate_quarter(display)
    });
    match session.commit(&mut net, &mut gpu.textures, &mut gpu.display, &mut tracer) {
        Ok(Some(summary)) => println!(
            "Committed {} edits to layer {} channel {}; generation {}",
            summary.records, hovered.layer, hovered.channel, summary.generation
        ),
        Ok(None) => println!("Nothing to commit"),
        Err(e) => eprintln!("Commit failed: {e}"),
    }
    gpu.frame(&mut session, &mut tracer);
    session.show_output(&mut gpu.display);
    println!(
        "Display {:?} after {} presents, {} texture uploads",
        gpu.display.size(),
        gpu.display.presents(),
        gpu.textures.uploads()
    );

    match gpu.visible.read_pixels() {
        Ok(pixels) => {
            let lit = pixels
                .chunks_exact(4)
                .filter(|p| p[0] > 0 || p[1] > 0 || p[2] > 0)
                .count();
            println!("Visible pass: {lit} of {} pixels lit", WIDTH * HEIGHT);
        }
        Err(e) => eprintln!("visible readback failed: {e}"),
    }
}
