// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Nanosecond
//! timestamps are printed as microseconds.

use std::io::Write;

use actfield_core::id::PickId;
use actfield_core::trace::{
    CancelEvent, CommitEvent, EditEvent, FrameSummary, HoverEvent, InferenceEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, RegenerateEvent, SelectEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Pick => "pick",
        PhaseKind::Animate => "animate",
        PhaseKind::Edit => "edit",
        PhaseKind::Inference => "inference",
        PhaseKind::Render => "render",
    }
}

fn id_text(id: Option<PickId>) -> String {
    id.map_or_else(|| String::from("-"), |id| id.raw().to_string())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            us(e.timestamp_ns),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            us(e.timestamp_ns),
        );
    }

    fn on_hover(&mut self, e: &HoverEvent) {
        let _ = writeln!(
            self.writer,
            "[hover] frame={} gen={} {} -> {}",
            e.frame_index,
            e.generation,
            id_text(e.previous),
            id_text(e.current),
        );
    }

    fn on_select(&mut self, e: &SelectEvent) {
        let _ = writeln!(
            self.writer,
            "[select] frame={} gen={} id={} layer={} channel={}",
            e.frame_index,
            e.generation,
            e.id.raw(),
            e.layer,
            e.channel,
        );
    }

    fn on_edit(&mut self, e: &EditEvent) {
        let scope = if e.broadcast { "stack" } else { "channel" };
        let _ = writeln!(
            self.writer,
            "[edit] frame={} {:?} {scope} pending={}",
            e.frame_index, e.kind, e.pending,
        );
    }

    fn on_cancel(&mut self, e: &CancelEvent) {
        let _ = writeln!(
            self.writer,
            "[cancel] frame={} discarded={}",
            e.frame_index, e.discarded,
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] frame={} gen={} from={} records={} channels={}",
            e.frame_index, e.generation, e.network_index, e.records, e.channels_written,
        );
    }

    fn on_inference(&mut self, e: &InferenceEvent) {
        let _ = writeln!(
            self.writer,
            "[inference] frame={} from={} layers={} {:?}",
            e.frame_index, e.network_index, e.layers_emitted, e.outcome,
        );
    }

    fn on_regenerate(&mut self, e: &RegenerateEvent) {
        let _ = writeln!(
            self.writer,
            "[regenerate] frame={} gen={} layers={} quads={}",
            e.frame_index, e.generation, e.layers, e.quads,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} hover={} pick={:.1}µs animate={:.1}µs edit={:.1}µs \
             inference={:.1}µs render={:.1}µs",
            s.frame_index,
            id_text(s.hover),
            us(s.pick_ns),
            us(s.animate_ns),
            us(s.edit_ns),
            us(s.inference_ns),
            us(s.render_ns),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actfield_core::trace::InferenceOutcome;
    use actfield_core::transformation::TransformationKind;

    #[test]
    fn pretty_print_phase() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Pick,
            timestamp_ns: 1_500,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "[phase:begin] frame=1 pick at 1.5µs\n");
    }

    #[test]
    fn pretty_print_hover_without_previous() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_hover(&HoverEvent {
            frame_index: 2,
            generation: 1,
            previous: None,
            current: PickId::from_raw(5),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("- -> 5"), "got: {output}");
    }

    #[test]
    fn pretty_print_edit_scope() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_edit(&EditEvent {
            frame_index: 3,
            kind: TransformationKind::Fill,
            broadcast: true,
            pending: 2,
        });
        sink.on_inference(&InferenceEvent {
            frame_index: 3,
            network_index: 1,
            layers_emitted: 0,
            outcome: InferenceOutcome::Failed,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "[edit] frame=3 Fill stack pending=2");
        assert!(lines[1].ends_with("Failed"), "got: {output}");
    }
}
