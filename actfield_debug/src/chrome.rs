// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Phases become duration events. Everything else becomes an instant event
//! stamped with the most recent phase timestamp, since only phases carry a
//! clock reading.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use actfield_core::id::PickId;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Timestamps are converted from nanoseconds to microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ns = 0_u64;

    for recorded in decode(bytes) {
        let event = match recorded {
            RecordedEvent::PhaseBegin(e) => {
                last_ns = e.timestamp_ns;
                json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": ns_to_us(e.timestamp_ns),
                    "pid": 0,
                    "tid": 0,
                    "args": { "frame_index": e.frame_index }
                })
            }
            RecordedEvent::PhaseEnd(e) => {
                last_ns = e.timestamp_ns;
                json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": ns_to_us(e.timestamp_ns),
                    "pid": 0,
                    "tid": 0,
                    "args": { "frame_index": e.frame_index }
                })
            }
            RecordedEvent::Hover(e) => instant(
                "Hover",
                "Pick",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "generation": e.generation,
                    "previous": raw(e.previous),
                    "current": raw(e.current),
                }),
            ),
            RecordedEvent::Select(e) => instant(
                "Select",
                "Edit",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "generation": e.generation,
                    "id": e.id.raw(),
                    "layer": e.layer,
                    "channel": e.channel,
                }),
            ),
            RecordedEvent::Edit(e) => instant(
                "Edit",
                "Edit",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "kind": format!("{:?}", e.kind),
                    "broadcast": e.broadcast,
                    "pending": e.pending,
                }),
            ),
            RecordedEvent::Cancel(e) => instant(
                "Cancel",
                "Edit",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "discarded": e.discarded,
                }),
            ),
            RecordedEvent::Commit(e) => instant(
                "Commit",
                "Inference",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "generation": e.generation,
                    "network_index": e.network_index,
                    "records": e.records,
                    "channels_written": e.channels_written,
                }),
            ),
            RecordedEvent::Inference(e) => instant(
                "Inference",
                "Inference",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "network_index": e.network_index,
                    "layers_emitted": e.layers_emitted,
                    "outcome": format!("{:?}", e.outcome),
                }),
            ),
            RecordedEvent::Regenerate(e) => instant(
                "Regenerate",
                "Inference",
                last_ns,
                json!({
                    "frame_index": e.frame_index,
                    "generation": e.generation,
                    "layers": e.layers,
                    "quads": e.quads,
                }),
            ),
            RecordedEvent::FrameSummary(s) => instant(
                "FrameSummary",
                "Summary",
                last_ns,
                json!({
                    "frame_index": s.frame_index,
                    "hover": raw(s.hover),
                    "pick_us": ns_to_us(s.pick_ns),
                    "animate_us": ns_to_us(s.animate_ns),
                    "edit_us": ns_to_us(s.edit_ns),
                    "inference_us": ns_to_us(s.inference_ns),
                    "render_us": ns_to_us(s.render_ns),
                }),
            ),
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, cat: &str, ns: u64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ns_to_us(ns),
        "pid": 0,
        "tid": 0,
        "s": "t",
        "args": args,
    })
}

fn raw(id: Option<PickId>) -> Option<u32> {
    id.map(PickId::raw)
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use actfield_core::trace::{
        CancelEvent, HoverEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Pick,
            timestamp_ns: 1_000_000,
        });
        rec.on_hover(&HoverEvent {
            frame_index: 0,
            generation: 1,
            previous: None,
            current: PickId::from_raw(3),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Pick,
            timestamp_ns: 1_002_000,
        });
        rec.on_cancel(&CancelEvent {
            frame_index: 0,
            discarded: 1,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "Pick");
        assert_eq!(parsed[0]["ts"], 1000.0);

        // Instants take the latest phase timestamp.
        assert_eq!(parsed[1]["ph"], "i");
        assert_eq!(parsed[1]["name"], "Hover");
        assert_eq!(parsed[1]["ts"], 1000.0);
        assert_eq!(parsed[1]["args"]["previous"], Value::Null);
        assert_eq!(parsed[1]["args"]["current"], 3);

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1002.0);
        assert_eq!(parsed[3]["ts"], 1002.0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
