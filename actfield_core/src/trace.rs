// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the interaction loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`Session`](crate::session::Session) calls as it picks, edits and commits.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Timestamps are caller-supplied monotonic nanoseconds; the core never reads
//! a clock.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.

use crate::id::PickId;
use crate::transformation::TransformationKind;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the interaction loop is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Id readback and hover resolution.
    Pick,
    /// Hover pop animation and dirty evaluation.
    Animate,
    /// Applying an edit to the working copy.
    Edit,
    /// Forward pass and registry rebuild.
    Inference,
    /// Backend rendering.
    Render,
}

/// How a forward pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InferenceOutcome {
    /// Outputs were installed.
    Completed,
    /// The forward pass returned an error; pending edits were kept.
    Failed,
    /// The registry was regenerated meanwhile; the result was dropped.
    Stale,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Monotonic nanoseconds at the start of the phase.
    pub timestamp_ns: u64,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Monotonic nanoseconds at the end of the phase.
    pub timestamp_ns: u64,
}

/// Emitted when the hovered quad changes.
#[derive(Clone, Copy, Debug)]
pub struct HoverEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Registry generation.
    pub generation: u32,
    /// Previously hovered quad.
    pub previous: Option<PickId>,
    /// Newly hovered quad.
    pub current: Option<PickId>,
}

/// Emitted when a hovered channel becomes the committed selection.
#[derive(Clone, Copy, Debug)]
pub struct SelectEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Registry generation.
    pub generation: u32,
    /// Selected quad.
    pub id: PickId,
    /// Slot of the selected layer.
    pub layer: usize,
    /// Selected channel.
    pub channel: usize,
}

/// Emitted when an edit is staged.
#[derive(Clone, Copy, Debug)]
pub struct EditEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// What kind of edit.
    pub kind: TransformationKind,
    /// Whether it applies to the whole layer.
    pub broadcast: bool,
    /// Pending edits after this one.
    pub pending: usize,
}

/// Emitted when pending edits are cancelled.
#[derive(Clone, Copy, Debug)]
pub struct CancelEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Edits discarded.
    pub discarded: usize,
}

/// Emitted when a commit hands edits to the forward pass.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Registry generation the edits were made in.
    pub generation: u32,
    /// Network layer the forward pass restarts from.
    pub network_index: usize,
    /// Pending edits replayed.
    pub records: usize,
    /// Channels of the layer the replay touched.
    pub channels_written: usize,
}

/// Emitted when a forward pass ends.
#[derive(Clone, Copy, Debug)]
pub struct InferenceEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Network layer the pass started from.
    pub network_index: usize,
    /// Layer outputs received.
    pub layers_emitted: usize,
    /// How it ended.
    pub outcome: InferenceOutcome,
}

/// Emitted when a new registry generation is installed.
#[derive(Clone, Copy, Debug)]
pub struct RegenerateEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// New generation.
    pub generation: u32,
    /// Spatial layers in the new registry.
    pub layers: usize,
    /// Quads in the new registry.
    pub quads: u32,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Hovered quad at the end of the frame.
    pub hover: Option<PickId>,
    /// Pick phase duration in nanoseconds (0 if not measured).
    pub pick_ns: u64,
    /// Animate phase duration in nanoseconds (0 if not measured).
    pub animate_ns: u64,
    /// Edit phase duration in nanoseconds (0 if not measured).
    pub edit_ns: u64,
    /// Inference phase duration in nanoseconds (0 if not measured).
    pub inference_ns: u64,
    /// Render phase duration in nanoseconds (0 if not measured).
    pub render_ns: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the interaction loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when the hovered quad changes.
    fn on_hover(&mut self, e: &HoverEvent) {
        _ = e;
    }

    /// Called when a channel is selected for editing.
    fn on_select(&mut self, e: &SelectEvent) {
        _ = e;
    }

    /// Called when an edit is staged.
    fn on_edit(&mut self, e: &EditEvent) {
        _ = e;
    }

    /// Called when pending edits are cancelled.
    fn on_cancel(&mut self, e: &CancelEvent) {
        _ = e;
    }

    /// Called when edits are committed.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called when a forward pass ends.
    fn on_inference(&mut self, e: &InferenceEvent) {
        _ = e;
    }

    /// Called when a registry generation is installed.
    fn on_regenerate(&mut self, e: &RegenerateEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($(#[$doc:meta] $name:ident($ty:ty) => $method:ident;)*) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self, e: &$ty) {
                #[cfg(feature = "trace")]
                if let Some(s) = &mut self.sink {
                    s.$method(e);
                }
                #[cfg(not(feature = "trace"))]
                {
                    _ = e;
                }
            }
        )*
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    dispatch! {
        /// Emits a [`PhaseBeginEvent`].
        phase_begin(PhaseBeginEvent) => on_phase_begin;
        /// Emits a [`PhaseEndEvent`].
        phase_end(PhaseEndEvent) => on_phase_end;
        /// Emits a [`HoverEvent`].
        hover(HoverEvent) => on_hover;
        /// Emits a [`SelectEvent`].
        select(SelectEvent) => on_select;
        /// Emits an [`EditEvent`].
        edit(EditEvent) => on_edit;
        /// Emits a [`CancelEvent`].
        cancel(CancelEvent) => on_cancel;
        /// Emits a [`CommitEvent`].
        commit(CommitEvent) => on_commit;
        /// Emits an [`InferenceEvent`].
        inference(InferenceEvent) => on_inference;
        /// Emits a [`RegenerateEvent`].
        regenerate(RegenerateEvent) => on_regenerate;
        /// Emits a [`FrameSummary`].
        frame_summary(FrameSummary) => on_frame_summary;
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

const PHASES: usize = 5;

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    hover: Option<PickId>,
    phase_starts: [Option<u64>; PHASES],
    phase_ends: [Option<u64>; PHASES],
}

impl FrameSummaryBuilder {
    /// Starts building a summary for `frame_index`.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            hover: None,
            phase_starts: [None; PHASES],
            phase_ends: [None; PHASES],
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, timestamp_ns: u64) {
        self.phase_starts[phase_index(phase)] = Some(timestamp_ns);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, timestamp_ns: u64) {
        self.phase_ends[phase_index(phase)] = Some(timestamp_ns);
    }

    /// Sets the hovered quad.
    pub fn set_hover(&mut self, hover: Option<PickId>) {
        self.hover = hover;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            hover: self.hover,
            pick_ns: self.phase_duration(PhaseKind::Pick),
            animate_ns: self.phase_duration(PhaseKind::Animate),
            edit_ns: self.phase_duration(PhaseKind::Edit),
            inference_ns: self.phase_duration(PhaseKind::Inference),
            render_ns: self.phase_duration(PhaseKind::Render),
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Pick => 0,
        PhaseKind::Animate => 1,
        PhaseKind::Edit => 2,
        PhaseKind::Inference => 3,
        PhaseKind::Render => 4,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_cancel(&CancelEvent {
            frame_index: 0,
            discarded: 2,
        });
        sink.on_frame_summary(&FrameSummaryBuilder::new(0).finish());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Pick,
            timestamp_ns: 10,
        });
        tracer.hover(&HoverEvent {
            frame_index: 1,
            generation: 0,
            previous: None,
            current: PickId::from_raw(3),
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(42);
        builder.phase_begin(PhaseKind::Pick, 1_000);
        builder.phase_end(PhaseKind::Pick, 1_100);
        builder.phase_begin(PhaseKind::Animate, 1_100);
        builder.phase_end(PhaseKind::Animate, 1_500);
        builder.phase_begin(PhaseKind::Render, 1_500);
        builder.phase_end(PhaseKind::Render, 3_000);
        builder.set_hover(PickId::from_raw(5));

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 42);
        assert_eq!(summary.pick_ns, 100);
        assert_eq!(summary.animate_ns, 400);
        assert_eq!(summary.render_ns, 1_500);
        assert_eq!(summary.edit_ns, 0);
        assert_eq!(summary.inference_ns, 0);
        assert_eq!(summary.hover, PickId::from_raw(5));
    }

    #[test]
    fn end_before_begin_saturates() {
        let mut builder = FrameSummaryBuilder::new(0);
        builder.phase_begin(PhaseKind::Edit, 50);
        builder.phase_end(PhaseKind::Edit, 10);
        assert_eq!(builder.finish().edit_ns, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            discarded: Vec<usize>,
        }
        impl TraceSink for RecordingSink {
            fn on_cancel(&mut self, e: &CancelEvent) {
                self.discarded.push(e.discarded);
            }
        }

        let mut sink = RecordingSink {
            discarded: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.cancel(&CancelEvent {
            frame_index: 3,
            discarded: 4,
        });
        drop(tracer);
        assert_eq!(sink.discarded, &[4]);
    }
}
