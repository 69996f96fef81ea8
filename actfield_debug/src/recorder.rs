// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed by a one-byte
//! tag. [`decode`] reads them back as an iterator of [`RecordedEvent`].
//!
//! Picking ids are stored as their raw value, with 0 standing for "none".
//! Indices and counts are stored as `u32`, saturating.

use actfield_core::id::PickId;
use actfield_core::trace::{
    CancelEvent, CommitEvent, EditEvent, FrameSummary, HoverEvent, InferenceEvent,
    InferenceOutcome, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RegenerateEvent, SelectEvent,
    TraceSink,
};
use actfield_core::transformation::TransformationKind;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PHASE_BEGIN: u8 = 1;
const TAG_PHASE_END: u8 = 2;
const TAG_HOVER: u8 = 3;
const TAG_SELECT: u8 = 4;
const TAG_EDIT: u8 = 5;
const TAG_CANCEL: u8 = 6;
const TAG_COMMIT: u8 = 7;
const TAG_INFERENCE: u8 = 8;
const TAG_REGENERATE: u8 = 9;
const TAG_FRAME_SUMMARY: u8 = 10;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_usize(&mut self, v: usize) {
        self.write_u32(u32::try_from(v).unwrap_or(u32::MAX));
    }

    fn write_id(&mut self, id: Option<PickId>) {
        self.write_u32(id.map_or(0, PickId::raw));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Pick => 0,
            PhaseKind::Animate => 1,
            PhaseKind::Edit => 2,
            PhaseKind::Inference => 3,
            PhaseKind::Render => 4,
        });
    }

    fn write_kind(&mut self, k: TransformationKind) {
        self.write_u8(match k {
            TransformationKind::Fill => 0,
            TransformationKind::FillRect => 1,
            TransformationKind::Rotate => 2,
            TransformationKind::Scale => 3,
        });
    }

    fn write_outcome(&mut self, o: InferenceOutcome) {
        self.write_u8(match o {
            InferenceOutcome::Completed => 0,
            InferenceOutcome::Failed => 1,
            InferenceOutcome::Stale => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp_ns);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp_ns);
    }

    fn on_hover(&mut self, e: &HoverEvent) {
        self.write_u8(TAG_HOVER);
        self.write_u64(e.frame_index);
        self.write_u32(e.generation);
        self.write_id(e.previous);
        self.write_id(e.current);
    }

    fn on_select(&mut self, e: &SelectEvent) {
        self.write_u8(TAG_SELECT);
        self.write_u64(e.frame_index);
        self.write_u32(e.generation);
        self.write_id(Some(e.id));
        self.write_usize(e.layer);
        self.write_usize(e.channel);
    }

    fn on_edit(&mut self, e: &EditEvent) {
        self.write_u8(TAG_EDIT);
        self.write_u64(e.frame_index);
        self.write_kind(e.kind);
        self.write_u8(u8::from(e.broadcast));
        self.write_usize(e.pending);
    }

    fn on_cancel(&mut self, e: &CancelEvent) {
        self.write_u8(TAG_CANCEL);
        self.write_u64(e.frame_index);
        self.write_usize(e.discarded);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.write_u8(TAG_COMMIT);
        self.write_u64(e.frame_index);
        self.write_u32(e.generation);
        self.write_usize(e.network_index);
        self.write_usize(e.records);
        self.write_usize(e.channels_written);
    }

    fn on_inference(&mut self, e: &InferenceEvent) {
        self.write_u8(TAG_INFERENCE);
        self.write_u64(e.frame_index);
        self.write_usize(e.network_index);
        self.write_usize(e.layers_emitted);
        self.write_outcome(e.outcome);
    }

    fn on_regenerate(&mut self, e: &RegenerateEvent) {
        self.write_u8(TAG_REGENERATE);
        self.write_u64(e.frame_index);
        self.write_u32(e.generation);
        self.write_usize(e.layers);
        self.write_u32(e.quads);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_id(s.hover);
        self.write_u64(s.pick_ns);
        self.write_u64(s.animate_ns);
        self.write_u64(s.edit_ns);
        self.write_u64(s.inference_ns);
        self.write_u64(s.render_ns);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`HoverEvent`].
    Hover(HoverEvent),
    /// A [`SelectEvent`].
    Select(SelectEvent),
    /// An [`EditEvent`].
    Edit(EditEvent),
    /// A [`CancelEvent`].
    Cancel(CancelEvent),
    /// A [`CommitEvent`].
    Commit(CommitEvent),
    /// An [`InferenceEvent`].
    Inference(InferenceEvent),
    /// A [`RegenerateEvent`].
    Regenerate(RegenerateEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_usize(&mut self) -> Option<usize> {
        usize::try_from(self.read_u32()?).ok()
    }

    fn read_id(&mut self) -> Option<Option<PickId>> {
        Some(PickId::from_raw(self.read_u32()?))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Pick,
            1 => PhaseKind::Animate,
            2 => PhaseKind::Edit,
            3 => PhaseKind::Inference,
            _ => PhaseKind::Render,
        })
    }

    fn read_kind(&mut self) -> Option<TransformationKind> {
        Some(match self.read_u8()? {
            0 => TransformationKind::Fill,
            1 => TransformationKind::FillRect,
            2 => TransformationKind::Rotate,
            _ => TransformationKind::Scale,
        })
    }

    fn read_outcome(&mut self) -> Option<InferenceOutcome> {
        Some(match self.read_u8()? {
            0 => InferenceOutcome::Completed,
            1 => InferenceOutcome::Failed,
            _ => InferenceOutcome::Stale,
        })
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_hover(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Hover(HoverEvent {
            frame_index: self.read_u64()?,
            generation: self.read_u32()?,
            previous: self.read_id()?,
            current: self.read_id()?,
        }))
    }

    fn decode_select(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Select(SelectEvent {
            frame_index: self.read_u64()?,
            generation: self.read_u32()?,
            id: self.read_id()??,
            layer: self.read_usize()?,
            channel: self.read_usize()?,
        }))
    }

    fn decode_edit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Edit(EditEvent {
            frame_index: self.read_u64()?,
            kind: self.read_kind()?,
            broadcast: self.read_u8()? != 0,
            pending: self.read_usize()?,
        }))
    }

    fn decode_cancel(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Cancel(CancelEvent {
            frame_index: self.read_u64()?,
            discarded: self.read_usize()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitEvent {
            frame_index: self.read_u64()?,
            generation: self.read_u32()?,
            network_index: self.read_usize()?,
            records: self.read_usize()?,
            channels_written: self.read_usize()?,
        }))
    }

    fn decode_inference(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Inference(InferenceEvent {
            frame_index: self.read_u64()?,
            network_index: self.read_usize()?,
            layers_emitted: self.read_usize()?,
            outcome: self.read_outcome()?,
        }))
    }

    fn decode_regenerate(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Regenerate(RegenerateEvent {
            frame_index: self.read_u64()?,
            generation: self.read_u32()?,
            layers: self.read_usize()?,
            quads: self.read_u32()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            hover: self.read_id()?,
            pick_ns: self.read_u64()?,
            animate_ns: self.read_u64()?,
            edit_ns: self.read_u64()?,
            inference_ns: self.read_u64()?,
            render_ns: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_HOVER => self.decode_hover(),
            TAG_SELECT => self.decode_select(),
            TAG_EDIT => self.decode_edit(),
            TAG_CANCEL => self.decode_cancel(),
            TAG_COMMIT => self.decode_commit(),
            TAG_INFERENCE => self.decode_inference(),
            TAG_REGENERATE => self.decode_regenerate(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
