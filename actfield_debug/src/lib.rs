// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for actfield
//! diagnostics.
//!
//! This crate provides [`TraceSink`](actfield_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`Tee`]: forwards every event to two sinks.

pub mod chrome;
pub mod pretty;
pub mod recorder;

use actfield_core::trace::{
    CancelEvent, CommitEvent, EditEvent, FrameSummary, HoverEvent, InferenceEvent,
    PhaseBeginEvent, PhaseEndEvent, RegenerateEvent, SelectEvent, TraceSink,
};

/// Forwards every event to two sinks, `a` first.
#[derive(Debug)]
pub struct Tee<A, B> {
    /// First sink.
    pub a: A,
    /// Second sink.
    pub b: B,
}

impl<A: TraceSink, B: TraceSink> Tee<A, B> {
    /// Pairs two sinks.
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

macro_rules! forward {
    ($($method:ident($ty:ty);)*) => {
        $(
            fn $method(&mut self, e: &$ty) {
                self.a.$method(e);
                self.b.$method(e);
            }
        )*
    };
}

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    forward! {
        on_phase_begin(PhaseBeginEvent);
        on_phase_end(PhaseEndEvent);
        on_hover(HoverEvent);
        on_select(SelectEvent);
        on_edit(EditEvent);
        on_cancel(CancelEvent);
        on_commit(CommitEvent);
        on_inference(InferenceEvent);
        on_regenerate(RegenerateEvent);
        on_frame_summary(FrameSummary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{RecordedEvent, RecorderSink, decode};

    #[test]
    fn tee_reaches_both_sinks() {
        let mut tee = Tee::new(RecorderSink::new(), RecorderSink::new());
        tee.on_cancel(&CancelEvent {
            frame_index: 4,
            discarded: 2,
        });
        for rec in [&tee.a, &tee.b] {
            let events: Vec<_> = decode(rec.as_bytes()).collect();
            assert!(
                matches!(
                    events.as_slice(),
                    [RecordedEvent::Cancel(CancelEvent {
                        frame_index: 4,
                        discarded: 2
                    })]
                ),
                "got {events:?}"
            );
        }
    }
}
