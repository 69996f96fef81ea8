// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless editing session that exercises the tracing and diagnostics
//! pipeline.
//!
//! Builds a field from the toy network, hovers and opens a channel through
//! the CPU id target, stages and cancels some edits, commits the rest, and
//! compares the regenerated output against the original one. Events go to
//! both a [`PrettyPrintSink`](actfield_debug::pretty::PrettyPrintSink) on
//! stdout and a [`RecorderSink`](actfield_debug::recorder::RecorderSink), and
//! the recording is exported as a Chrome trace.

use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use actfield_core::backend::HeadlessTextures;
use actfield_core::display::Canvas;
use actfield_core::picking::IdTarget;
use actfield_core::registry::Selection;
use actfield_core::session::Session;
use actfield_core::trace::{FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer};
use actfield_core::transformation::Transformation;
use actfield_debug::Tee;
use actfield_debug::pretty::PrettyPrintSink;
use actfield_debug::recorder::RecorderSink;
use actfield_render::RenderPlan;
use kurbo::Size;
use toy_model_common::{INPUT_SIZE, IdGrid, ToyNet, gradient_input};

const TARGET_WIDTH: u32 = 320;
const TARGET_HEIGHT: u32 = 192;
/// Frames allowed for a hover to resolve after the pointer moves.
const HOVER_FRAMES: usize = 4;
/// Layer slot and channel the demo edits.
const EDIT_SLOT: usize = 2;
const EDIT_CHANNEL: usize = 1;

/// Monotonic nanoseconds since the demo started.
#[derive(Debug)]
struct Clock(Instant);

impl Clock {
    fn now(&self) -> u64 {
        u64::try_from(self.0.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Everything the frame loop draws into.
#[derive(Debug)]
struct Headless {
    textures: HeadlessTextures,
    canvas: Canvas,
    target: IdTarget,
    plan: RenderPlan,
}

fn main() {
    let clock = Clock(Instant::now());

    // -- sinks -------------------------------------------------------------
    let mut sink = Tee::new(
        PrettyPrintSink::new(Box::new(std::io::stdout())),
        RecorderSink::new(),
    );

    // -- session -----------------------------------------------------------
    let mut session = Session::default();
    let mut net = ToyNet::new();
    let mut out = Headless {
        textures: HeadlessTextures::new(),
        canvas: Canvas::new(),
        target: IdTarget::new(TARGET_WIDTH, TARGET_HEIGHT),
        plan: RenderPlan::new(),
    };

    {
        let mut tracer = Tracer::new(&mut sink);

        // 1. Build the field.
        session
            .regenerate(
                &mut net,
                &gradient_input(INPUT_SIZE),
                &mut out.textures,
                &mut out.canvas,
                &mut tracer,
            )
            .expect("toy network runs on its own input");
        run_frame(&mut session, &mut out, &mut tracer, &clock);

        // 2. Hover a channel and open it.
        let grid = IdGrid::for_registry(session.registry(), TARGET_WIDTH, TARGET_HEIGHT);
        session.pointer_moved(
            grid.center(EDIT_SLOT, EDIT_CHANNEL),
            Size::new(f64::from(TARGET_WIDTH), f64::from(TARGET_HEIGHT)),
        );
        let hovered = (0..HOVER_FRAMES)
            .find_map(|_| run_frame(&mut session, &mut out, &mut tracer, &clock));
        let Some(hovered) = hovered else {
            eprintln!("hover never resolved");
            return;
        };
        println!(
            "Hovering layer {} channel {} ({:?})",
            hovered.layer, hovered.channel, hovered.id
        );
        session.pointer_released(&mut out.canvas, &mut tracer);

        // 3. Stage edits, then throw them away.
        timed(&mut tracer, &clock, session.frame_index(), PhaseKind::Edit, |tracer| {
            session.apply(
                Transformation::Fill { value: 0.5 },
                false,
                &mut out.canvas,
                tracer,
            );
            session.edit(&mut out.canvas, tracer, |editor, display| {
                editor.fill_centered_rect(-1.0, display)
            });
        });
        println!("Pending before cancel:\n{}", session.editor().describe_pending());
        session.cancel(&mut out.canvas, &mut tracer);

        // 4. Stage the edits that get committed.
        session.set_broadcast(false);
        session.set_scale_slider(1.5);
        timed(&mut tracer, &clock, session.frame_index(), PhaseKind::Edit, |tracer| {
            session.edit(&mut out.canvas, tracer, |editor, display| {
                editor.rotate_quarter(display)
            });
            session.edit(&mut out.canvas, tracer, |editor, display| editor.scale(display));
            session.edit(&mut out.canvas, tracer, |editor, display| {
                editor.brush(2, 2, false, display)
            });
            session.apply(
                Transformation::Fill { value: -0.25 },
                true,
                &mut out.canvas,
                tracer,
            );
        });

        // 5. Commit and show the regenerated output.
        let committed = timed(
            &mut tracer,
            &clock,
            session.frame_index(),
            PhaseKind::Inference,
            |tracer| session.commit(&mut net, &mut out.textures, &mut out.canvas, tracer),
        );
        match committed {
            Ok(Some(summary)) => println!(
                "Committed {} edits at layer {}; generation {} with {} downstream layers",
                summary.records, summary.network_index, summary.generation, summary.layers_emitted
            ),
            Ok(None) => println!("Nothing to commit"),
            Err(e) => eprintln!("Commit failed: {e}"),
        }
        for _ in 0..HOVER_FRAMES {
            run_frame(&mut session, &mut out, &mut tracer, &clock);
        }
        if session.show_base_output(&mut out.canvas) {
            let base = out.canvas.pixels().to_vec();
            session.show_output(&mut out.canvas);
            let changed = base
                .chunks_exact(4)
                .zip(out.canvas.pixels().chunks_exact(4))
                .filter(|(a, b)| a != b)
                .count();
            println!(
                "Output image {}x{}: {changed} pixels differ from the base, {} presents",
                out.canvas.width(),
                out.canvas.height(),
                out.canvas.presents()
            );
        }

        // 6. Close the reopened channel.
        session.close_editor(&mut out.canvas, &mut tracer);
        println!("Session {:?}", session.state());
    }

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    actfield_debug::chrome::export(sink.b.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");
    println!(
        "Wrote {path} ({} frames, {} live textures, {} uploads)",
        session.frame_index(),
        out.textures.live(),
        out.textures.uploads()
    );
}

/// One frame: id pass, hover, animation and render-plan refresh.
fn run_frame(
    session: &mut Session,
    out: &mut Headless,
    tracer: &mut Tracer<'_>,
    clock: &Clock,
) -> Option<Selection> {
    let frame_index = session.frame_index() + 1;
    let mut summary = FrameSummaryBuilder::new(frame_index);

    let start = emit_phase_begin(tracer, clock, frame_index, PhaseKind::Pick);
    summary.phase_begin(PhaseKind::Pick, start);
    let grid = IdGrid::for_registry(session.registry(), TARGET_WIDTH, TARGET_HEIGHT);
    grid.paint(&mut out.target, session.registry());
    out.target.submit();
    let hover = session.frame(&mut out.target, tracer);
    summary.phase_end(
        PhaseKind::Pick,
        emit_phase_end(tracer, clock, frame_index, PhaseKind::Pick),
    );

    let start = emit_phase_begin(tracer, clock, frame_index, PhaseKind::Animate);
    summary.phase_begin(PhaseKind::Animate, start);
    let changes = session.evaluate();
    summary.phase_end(
        PhaseKind::Animate,
        emit_phase_end(tracer, clock, frame_index, PhaseKind::Animate),
    );

    let start = emit_phase_begin(tracer, clock, frame_index, PhaseKind::Render);
    summary.phase_begin(PhaseKind::Render, start);
    out.plan.refresh(session.registry(), &changes);
    summary.phase_end(
        PhaseKind::Render,
        emit_phase_end(tracer, clock, frame_index, PhaseKind::Render),
    );

    summary.set_hover(session.hover_id());
    tracer.frame_summary(&summary.finish());
    hover
}

/// Brackets `f` with begin and end events for `phase`.
fn timed<R>(
    tracer: &mut Tracer<'_>,
    clock: &Clock,
    frame_index: u64,
    phase: PhaseKind,
    f: impl FnOnce(&mut Tracer<'_>) -> R,
) -> R {
    emit_phase_begin(tracer, clock, frame_index, phase);
    let result = f(tracer);
    emit_phase_end(tracer, clock, frame_index, phase);
    result
}

fn emit_phase_begin(
    tracer: &mut Tracer<'_>,
    clock: &Clock,
    frame_index: u64,
    phase: PhaseKind,
) -> u64 {
    let timestamp_ns = clock.now();
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index,
        phase,
        timestamp_ns,
    });
    timestamp_ns
}

fn emit_phase_end(
    tracer: &mut Tracer<'_>,
    clock: &Clock,
    frame_index: u64,
    phase: PhaseKind,
) -> u64 {
    let timestamp_ns = clock.now();
    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase,
        timestamp_ns,
    });
    timestamp_ns
}
