// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interaction coordinator.
//!
//! A [`Session`] owns the registry, the picker, the editor, and both
//! selections: the transient *hover* (recomputed every frame) and the
//! *committed* selection the editor works on. Backends and UI glue pass their
//! collaborators in explicitly on each call.
//!
//! Committing is split in two so the forward pass can run elsewhere:
//! [`begin_commit`](Session::begin_commit) replays the pending edits onto a
//! copy of the layer and returns an [`InferenceRequest`];
//! [`finish_commit`](Session::finish_commit) installs the result. In between
//! the session is [`Busy`](SessionState::Busy) and ignores edits, selection
//! changes and further commits. [`commit`](Session::commit) does both in one
//! call.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use crate::backend::{PickSource, TextureUpdater};
use crate::display::{DisplaySurface, output_rgba};
use crate::editor::{Editor, EditorConfig, EditorState, PendingTransformation};
use crate::forward::{ChannelStack, ForwardPass, ForwardPassError, LayerOutput};
use crate::id::PickId;
use crate::picking::{PickConfig, Picker, Pointer};
use crate::quad::{FieldLayout, QuadFactory};
use crate::registry::{FieldChanges, LayerRegistry, Selection};
use crate::slice::SliceBuffer;
use crate::trace::{
    CancelEvent, CommitEvent, EditEvent, HoverEvent, InferenceEvent, InferenceOutcome,
    RegenerateEvent, SelectEvent, Tracer,
};
use crate::transformation::Transformation;

/// Configuration for a [`Session`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionConfig {
    /// Quad placement and hover feedback.
    pub layout: FieldLayout,
    /// Editing helpers.
    pub editor: EditorConfig,
    /// Hover picking.
    pub pick: PickConfig,
}

impl SessionConfig {
    /// Stock layout, editor and picking settings.
    pub const DEFAULT: Self = Self {
        layout: FieldLayout::DEFAULT,
        editor: EditorConfig::DEFAULT,
        pick: PickConfig::DEFAULT,
    };
}

/// What the session is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No channel is open.
    Idle,
    /// A channel is open for editing.
    Editing,
    /// A forward pass is in flight.
    Busy,
}

/// Edited activations handed to the forward pass.
#[derive(Clone, Debug)]
pub struct InferenceRequest {
    generation: u32,
    layer: usize,
    network_index: usize,
    channel: usize,
    records: usize,
    edited: ChannelStack,
}

impl InferenceRequest {
    /// Registry generation the edits were made in.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Network layer the forward pass restarts from.
    #[must_use]
    pub fn network_index(&self) -> usize {
        self.network_index
    }

    /// Number of edits replayed.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// The layer with every pending edit applied.
    #[must_use]
    pub fn channels(&self) -> &[SliceBuffer] {
        self.edited.channels()
    }
}

/// Result of a successful commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    /// Generation of the newly installed registry.
    pub generation: u32,
    /// Network layer the forward pass restarted from.
    pub network_index: usize,
    /// Edits applied.
    pub records: usize,
    /// Downstream layer outputs received.
    pub layers_emitted: usize,
}

/// Owns the field and routes pointer, frame and edit events through it.
#[derive(Debug)]
pub struct Session {
    factory: QuadFactory,
    registry: LayerRegistry,
    picker: Picker,
    editor: Editor,
    pointer: Option<Pointer>,
    hover: Option<Selection>,
    committed: Option<Selection>,
    inflight: Option<u32>,
    /// Output channels of the last full forward pass.
    base_output: Vec<SliceBuffer>,
    last_generation: u32,
    frame_index: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::DEFAULT)
    }
}

impl Session {
    /// Creates a session with an empty registry.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            factory: QuadFactory::new(config.layout),
            registry: LayerRegistry::new(),
            picker: Picker::new(config.pick),
            editor: Editor::new(config.editor),
            pointer: None,
            hover: None,
            committed: None,
            inflight: None,
            base_output: Vec::new(),
            last_generation: 0,
            frame_index: 0,
        }
    }

    /// The current registry generation.
    #[must_use]
    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// The editor.
    #[must_use]
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// The transient hover selection.
    #[must_use]
    pub fn hover(&self) -> Option<&Selection> {
        self.hover.as_ref()
    }

    /// The selection the editor works on.
    #[must_use]
    pub fn committed(&self) -> Option<&Selection> {
        self.committed.as_ref()
    }

    /// Frames processed so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.inflight.is_some() {
            return SessionState::Busy;
        }
        match self.editor.state() {
            EditorState::Idle => SessionState::Idle,
            EditorState::Editing => SessionState::Editing,
        }
    }

    fn is_busy(&self) -> bool {
        self.inflight.is_some()
    }

    /// Drains quad changes for the backend.
    pub fn evaluate(&mut self) -> FieldChanges {
        self.registry.evaluate()
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer.
    pub fn evaluate_into(&mut self, changes: &mut FieldChanges) {
        self.registry.evaluate_into(changes);
    }

    /// Records the cursor position within a `client` sized area.
    pub fn pointer_moved(&mut self, position: Point, client: Size) {
        self.pointer = Some(Pointer { position, client });
    }

    /// Forgets the cursor.
    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    /// Runs one frame of hover picking and animation.
    ///
    /// Resolves the pixel under the cursor, updates the hover selection,
    /// steps the hovered quad's pop and retracts all others.
    pub fn frame(&mut self, source: &mut dyn PickSource, tracer: &mut Tracer<'_>) -> Option<Selection> {
        self.frame_index += 1;
        let hit = self.picker.resolve_hit(
            self.pointer.as_ref(),
            source,
            self.registry.max_id(),
            self.registry.generation(),
        );
        let hover = hit.and_then(|id| self.registry.map_id_to_selection(id));
        let previous = self.hover.map(|s| s.id);
        let current = hover.map(|s| s.id);
        if previous != current {
            tracer.hover(&HoverEvent {
                frame_index: self.frame_index,
                generation: self.registry.generation(),
                previous,
                current,
            });
        }
        self.hover = hover;
        self.registry.apply_hover(current, self.factory.layout());
        hover
    }

    /// Promotes the hover selection to the committed selection and opens it.
    ///
    /// Ignored while busy or when nothing current is hovered.
    pub fn pointer_released(
        &mut self,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Option<Selection> {
        if self.is_busy() {
            return None;
        }
        let selection = self.hover.filter(|s| self.registry.is_current(s))?;
        self.select(selection, display, tracer)
    }

    /// Opens a specific channel of the current generation for editing.
    ///
    /// Ignored while busy or when the channel does not exist.
    pub fn select_channel(
        &mut self,
        layer: usize,
        channel: usize,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Option<Selection> {
        if self.is_busy() {
            return None;
        }
        let id = self.registry.id_for(layer, channel)?;
        let selection = self.registry.map_id_to_selection(id)?;
        self.select(selection, display, tracer)
    }

    fn select(
        &mut self,
        selection: Selection,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Option<Selection> {
        let buffer = self
            .registry
            .channel_buffer(selection.layer, selection.channel)?;
        self.editor.open(selection, buffer, display);
        self.committed = Some(selection);
        tracer.select(&SelectEvent {
            frame_index: self.frame_index,
            generation: selection.generation,
            id: selection.id,
            layer: selection.layer,
            channel: selection.channel,
        });
        Some(selection)
    }

    /// Applies `transformation` to the open channel.
    ///
    /// Ignored while busy or with no current committed selection.
    pub fn apply(
        &mut self,
        transformation: Transformation,
        broadcast: bool,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Option<PendingTransformation> {
        self.edit(display, tracer, |editor, display| {
            editor.apply(transformation, broadcast, display)
        })
    }

    /// Runs one editor helper, such as [`Editor::brush`], under the same
    /// guards as [`apply`](Self::apply).
    pub fn edit(
        &mut self,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
        op: impl FnOnce(&mut Editor, &mut dyn DisplaySurface) -> Option<PendingTransformation>,
    ) -> Option<PendingTransformation> {
        if self.is_busy() {
            return None;
        }
        self.committed.filter(|s| self.registry.is_current(s))?;
        let record = op(&mut self.editor, display)?;
        tracer.edit(&EditEvent {
            frame_index: self.frame_index,
            kind: record.transformation.kind(),
            broadcast: record.broadcast,
            pending: self.editor.pending().len(),
        });
        Some(record)
    }

    /// Sets the default broadcast flag of the editing helpers.
    pub fn set_broadcast(&mut self, broadcast: bool) {
        self.editor.set_broadcast(broadcast);
    }

    /// Sets the brush side.
    pub fn set_brush_size(&mut self, size: u32) {
        self.editor.set_brush_size(size);
    }

    /// Sets the scale slider.
    pub fn set_scale_slider(&mut self, slider: f64) {
        self.editor.set_scale_slider(slider);
    }

    /// Closes the open channel without committing.
    ///
    /// Drops the committed selection and any pending edits and blanks the
    /// display. Returns `false` and does nothing while busy.
    pub fn close_editor(
        &mut self,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        if self.is_busy() {
            return false;
        }
        let discarded = self.editor.pending().len();
        self.committed = None;
        self.editor.close();
        display.clear();
        tracer.cancel(&CancelEvent {
            frame_index: self.frame_index,
            discarded,
        });
        true
    }

    /// Discards pending edits and restores the snapshot.
    ///
    /// Returns how many edits were discarded; 0 while busy.
    pub fn cancel(&mut self, display: &mut dyn DisplaySurface, tracer: &mut Tracer<'_>) -> usize {
        if self.is_busy() {
            return 0;
        }
        let discarded = self.editor.cancel(display);
        tracer.cancel(&CancelEvent {
            frame_index: self.frame_index,
            discarded,
        });
        discarded
    }

    /// Replays pending edits onto a copy of the open layer.
    ///
    /// Returns `None` while busy, with nothing open, or with nothing pending.
    /// On success the session is busy until
    /// [`finish_commit`](Self::finish_commit).
    pub fn begin_commit(&mut self, tracer: &mut Tracer<'_>) -> Option<InferenceRequest> {
        if self.is_busy() || self.editor.pending().is_empty() {
            return None;
        }
        let selection = self.committed.filter(|s| self.registry.is_current(s))?;
        let layer = self.registry.layer(selection.layer)?;
        let mut channels = layer.to_stack().into_channels();
        self.editor.apply_to_layer(&mut channels);

        let records = self.editor.pending().len();
        let channels_written = if self.editor.pending().iter().any(|r| r.broadcast) {
            channels.len()
        } else {
            1
        };
        let request = InferenceRequest {
            generation: selection.generation,
            layer: selection.layer,
            network_index: layer.network_index(),
            channel: selection.channel,
            records,
            edited: ChannelStack::from_parts(layer.width(), layer.height(), channels),
        };
        tracer.commit(&CommitEvent {
            frame_index: self.frame_index,
            generation: request.generation,
            network_index: request.network_index,
            records,
            channels_written,
        });
        self.inflight = Some(request.generation);
        Some(request)
    }

    /// Installs the outcome of a forward pass started by
    /// [`begin_commit`](Self::begin_commit).
    ///
    /// `result` holds the outputs of every layer after the edited one. On
    /// success the registry is rebuilt from the unchanged upstream layers, the
    /// edited layer and `result`, and the editor reopens the same channel in
    /// the new generation. On failure the registry and pending edits are kept.
    /// A request from an older generation is dropped with
    /// [`ForwardPassError::Stale`].
    pub fn finish_commit(
        &mut self,
        request: InferenceRequest,
        result: Result<Vec<LayerOutput>, ForwardPassError>,
        textures: &mut dyn TextureUpdater,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Result<CommitSummary, ForwardPassError> {
        if self.inflight == Some(request.generation) {
            self.inflight = None;
        }
        let current = self.registry.generation();
        let outcome = |outcome, layers_emitted| InferenceEvent {
            frame_index: self.frame_index,
            network_index: request.network_index,
            layers_emitted,
            outcome,
        };
        if request.generation != current {
            tracer.inference(&outcome(InferenceOutcome::Stale, 0));
            return Err(ForwardPassError::Stale {
                request: request.generation,
                current,
            });
        }
        let downstream = match result {
            Ok(downstream) => downstream,
            Err(err) => {
                tracer.inference(&outcome(InferenceOutcome::Failed, 0));
                return Err(err);
            }
        };
        let layers_emitted = downstream.len();
        tracer.inference(&outcome(InferenceOutcome::Completed, layers_emitted));

        let InferenceRequest {
            network_index,
            channel,
            records,
            edited,
            ..
        } = request;
        let name = self
            .registry
            .layer(request.layer)
            .map(|l| String::from(l.name()))
            .unwrap_or_default();
        let mut outputs: Vec<LayerOutput> = self
            .registry
            .snapshot_outputs()
            .into_iter()
            .filter(|o| o.network_index < network_index)
            .collect();
        outputs.push(LayerOutput::spatial(name, network_index, edited));
        outputs.extend(
            downstream
                .into_iter()
                .filter(|o| o.network_index > network_index),
        );
        let network_len = self.registry.network_len();
        self.install(outputs, network_len, textures, display, tracer);

        if let Some(slot) = self.registry.slot_of(network_index) {
            self.select_channel(slot, channel, display, tracer);
        }
        Ok(CommitSummary {
            generation: self.registry.generation(),
            network_index,
            records,
            layers_emitted,
        })
    }

    /// Commits pending edits, running the forward pass synchronously.
    ///
    /// Returns `Ok(None)` when there is nothing to commit.
    pub fn commit(
        &mut self,
        forward: &mut dyn ForwardPass,
        textures: &mut dyn TextureUpdater,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Result<Option<CommitSummary>, ForwardPassError> {
        let Some(request) = self.begin_commit(tracer) else {
            return Ok(None);
        };
        let mut outputs = Vec::new();
        let ran = forward.run_from(request.network_index, request.channels(), &mut |o| {
            outputs.push(o);
        });
        let result = ran.map(|()| outputs);
        self.finish_commit(request, result, textures, display, tracer)
            .map(Some)
    }

    /// Replaces the registry with a new generation built from `outputs`.
    ///
    /// Drops both selections, closes the editor, blanks the display and frees
    /// the old textures before building.
    pub fn install(
        &mut self,
        outputs: Vec<LayerOutput>,
        network_len: usize,
        textures: &mut dyn TextureUpdater,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) {
        self.hover = None;
        self.committed = None;
        self.inflight = None;
        self.editor.close();
        display.clear();
        core::mem::take(&mut self.registry).release(textures);

        self.last_generation = self.last_generation.wrapping_add(1);
        self.registry = LayerRegistry::build(
            outputs,
            network_len,
            self.last_generation,
            &self.factory,
            textures,
        );
        tracer.regenerate(&RegenerateEvent {
            frame_index: self.frame_index,
            generation: self.last_generation,
            layers: self.registry.layers().len(),
            quads: self.registry.quad_count(),
        });
    }

    /// Runs the whole network on `input` and installs the result.
    ///
    /// The last spatial layer is kept as the base output, which commits leave
    /// alone until the next regeneration.
    pub fn regenerate(
        &mut self,
        forward: &mut dyn ForwardPass,
        input: &[f32],
        textures: &mut dyn TextureUpdater,
        display: &mut dyn DisplaySurface,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), ForwardPassError> {
        if self.is_busy() {
            return Err(ForwardPassError::Busy);
        }
        let outputs = forward.run(input)?;
        let network_len = outputs
            .iter()
            .map(|o| o.network_index + 1)
            .max()
            .unwrap_or(0);
        self.install(outputs, network_len, textures, display, tracer);
        self.base_output = self
            .registry
            .layers()
            .last()
            .map(|layer| layer.quads().iter().map(|q| q.buffer().clone()).collect())
            .unwrap_or_default();
        Ok(())
    }

    /// Paints the last spatial layer as the generated image.
    ///
    /// Returns `false` when the registry is empty.
    pub fn show_output(&self, display: &mut dyn DisplaySurface) -> bool {
        let Some(layer) = self.registry.layers().last() else {
            return false;
        };
        let channels: Vec<SliceBuffer> = layer.quads().iter().map(|q| q.buffer().clone()).collect();
        present_channels(&channels, display)
    }

    /// Paints the output of the last [`regenerate`](Self::regenerate), before
    /// any committed edits.
    ///
    /// Returns `false` when nothing has been generated.
    pub fn show_base_output(&self, display: &mut dyn DisplaySurface) -> bool {
        present_channels(&self.base_output, display)
    }

    /// Output channels of the last [`regenerate`](Self::regenerate).
    #[must_use]
    pub fn base_output(&self) -> &[SliceBuffer] {
        &self.base_output
    }

    /// The id of the hovered quad.
    #[must_use]
    pub fn hover_id(&self) -> Option<PickId> {
        self.hover.map(|s| s.id)
    }
}

fn present_channels(channels: &[SliceBuffer], display: &mut dyn DisplaySurface) -> bool {
    match output_rgba(channels) {
        Some((w, h, rgba)) => {
            display.present(w, h, &rgba);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessTextures;
    use crate::display::Canvas;
    use crate::forward::LayerData;
    use crate::picking::IdTarget;
    use alloc::vec;

    /// Three layers: the input as a flat vector, two channels filled with the
    /// first two inputs, and one channel holding their sum.
    #[derive(Default)]
    struct SumModel {
        fail: bool,
    }

    fn sum_layer(channels: &[SliceBuffer]) -> LayerOutput {
        let mut sum = SliceBuffer::zeros(channels[0].width(), channels[0].height());
        for c in channels {
            for (s, v) in sum.as_mut_slice().iter_mut().zip(c.as_slice()) {
                *s += v;
            }
        }
        LayerOutput::spatial("sum", 2, ChannelStack::new(vec![sum]).unwrap())
    }

    impl ForwardPass for SumModel {
        fn run(&mut self, input: &[f32]) -> Result<Vec<LayerOutput>, ForwardPassError> {
            let a = vec![SliceBuffer::filled(4, 4, input[0]), SliceBuffer::filled(4, 4, input[1])];
            let sum = sum_layer(&a);
            Ok(vec![
                LayerOutput::flat("input", 0, input.to_vec()),
                LayerOutput::spatial("pair", 1, ChannelStack::new(a).unwrap()),
                sum,
            ])
        }

        fn run_from(
            &mut self,
            network_index: usize,
            channels: &[SliceBuffer],
            emit: &mut dyn FnMut(LayerOutput),
        ) -> Result<(), ForwardPassError> {
            if self.fail {
                return Err(ForwardPassError::Rejected(String::from("offline")));
            }
            match network_index {
                1 => emit(sum_layer(channels)),
                2 => {}
                n => return Err(ForwardPassError::UnknownLayer(n)),
            }
            Ok(())
        }
    }

    struct Rig {
        session: Session,
        model: SumModel,
        textures: HeadlessTextures,
        canvas: Canvas,
        target: IdTarget,
    }

    impl Rig {
        fn new() -> Self {
            let mut rig = Self {
                session: Session::default(),
                model: SumModel::default(),
                textures: HeadlessTextures::new(),
                canvas: Canvas::new(),
                target: IdTarget::new(8, 8),
            };
            rig.session
                .regenerate(&mut rig.model, &[0.25, 0.5], &mut rig.textures, &mut rig.canvas, &mut Tracer::none())
                .unwrap();
            rig
        }

        /// Paints `id` over the whole id target and hovers it.
        fn hover(&mut self, id: PickId) -> Option<Selection> {
            self.target.clear(self.session.registry().generation());
            self.target.fill_rect(0, 0, 8, 8, id);
            self.session
                .pointer_moved(Point::new(2.0, 2.0), Size::new(8.0, 8.0));
            self.session.frame(&mut self.target, &mut Tracer::none());
            self.target.submit();
            self.session.frame(&mut self.target, &mut Tracer::none())
        }

        fn open(&mut self, id: PickId) -> Selection {
            self.hover(id).unwrap();
            self.session
                .pointer_released(&mut self.canvas, &mut Tracer::none())
                .unwrap()
        }

        fn fill(&mut self, value: f32, broadcast: bool) -> Option<PendingTransformation> {
            self.session.apply(
                Transformation::Fill { value },
                broadcast,
                &mut self.canvas,
                &mut Tracer::none(),
            )
        }

        fn commit(&mut self) -> Result<Option<CommitSummary>, ForwardPassError> {
            self.session.commit(
                &mut self.model,
                &mut self.textures,
                &mut self.canvas,
                &mut Tracer::none(),
            )
        }
    }

    #[test]
    fn regenerate_installs_spatial_layers() {
        let rig = Rig::new();
        let reg = rig.session.registry();
        assert_eq!(reg.generation(), 1);
        assert_eq!(reg.layers().len(), 2);
        assert_eq!(reg.quad_count(), 3);
        assert_eq!(reg.network_len(), 3);
        assert_eq!(rig.textures.live(), 3);
        assert_eq!(rig.session.state(), SessionState::Idle);
    }

    #[test]
    fn frame_hovers_and_pops_quad() {
        let mut rig = Rig::new();
        let sel = rig.hover(PickId::from_linear(1)).unwrap();
        assert_eq!((sel.layer, sel.channel), (0, 1));
        let quad = rig.session.registry().quad(sel.id).unwrap();
        assert!(quad.is_hovered());
        assert!(quad.translation()[1] > quad.rest()[1]);

        rig.session.pointer_left();
        assert!(rig.session.frame(&mut rig.target, &mut Tracer::none()).is_none());
        assert!(!rig.session.registry().quad(sel.id).unwrap().is_hovered());
    }

    #[test]
    fn release_opens_editor_and_paints() {
        let mut rig = Rig::new();
        let sel = rig.open(PickId::from_linear(0));
        assert_eq!(rig.session.committed(), Some(&sel));
        assert_eq!(rig.session.state(), SessionState::Editing);
        assert_eq!(rig.canvas.pixel(0, 0), Some([63, 63, 63, 255]));
    }

    #[test]
    fn edits_without_selection_are_ignored() {
        let mut rig = Rig::new();
        assert!(rig.fill(1.0, true).is_none());
        assert_eq!(rig.commit(), Ok(None));
    }

    #[test]
    fn broadcast_commit_reruns_downstream() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.fill(1.0, true).unwrap();
        let summary = rig.commit().unwrap().unwrap();
        assert_eq!(summary.generation, 2);
        assert_eq!(summary.records, 1);
        assert_eq!(summary.layers_emitted, 1);

        let reg = rig.session.registry();
        assert_eq!(reg.channel_buffer(0, 0).and_then(|b| b.get(0, 0)), Some(1.0));
        assert_eq!(reg.channel_buffer(0, 1).and_then(|b| b.get(0, 0)), Some(1.0));
        assert_eq!(reg.channel_buffer(1, 0).and_then(|b| b.get(0, 0)), Some(2.0));
        assert_eq!(rig.textures.live(), 3);

        // The same channel is reopened in the new generation.
        let committed = rig.session.committed().unwrap();
        assert_eq!((committed.layer, committed.channel, committed.generation), (0, 0, 2));
        assert!(rig.session.editor().pending().is_empty());
    }

    #[test]
    fn single_channel_commit_leaves_siblings() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(1));
        rig.fill(1.0, false).unwrap();
        rig.commit().unwrap().unwrap();
        let reg = rig.session.registry();
        assert_eq!(reg.channel_buffer(0, 0).and_then(|b| b.get(0, 0)), Some(0.25));
        assert_eq!(reg.channel_buffer(1, 0).and_then(|b| b.get(0, 0)), Some(1.25));
    }

    #[test]
    fn failed_forward_pass_keeps_records() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.fill(1.0, true).unwrap();
        rig.model.fail = true;
        let err = rig.commit().unwrap_err();
        assert!(matches!(err, ForwardPassError::Rejected(_)));
        assert_eq!(rig.session.registry().generation(), 1);
        assert_eq!(rig.session.editor().pending().len(), 1);
        assert_eq!(rig.session.state(), SessionState::Editing);
        assert_eq!(
            rig.session.registry().channel_buffer(0, 0).and_then(|b| b.get(0, 0)),
            Some(0.25)
        );

        rig.model.fail = false;
        assert!(rig.commit().unwrap().is_some());
    }

    #[test]
    fn busy_session_ignores_edits() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.fill(1.0, true).unwrap();
        let request = rig.session.begin_commit(&mut Tracer::none()).unwrap();
        assert_eq!(rig.session.state(), SessionState::Busy);
        assert!(rig.fill(0.0, true).is_none());
        assert!(rig.session.begin_commit(&mut Tracer::none()).is_none());
        assert_eq!(rig.session.cancel(&mut rig.canvas, &mut Tracer::none()), 0);
        assert!(
            rig.session
                .pointer_released(&mut rig.canvas, &mut Tracer::none())
                .is_none()
        );
        assert_eq!(
            rig.session.regenerate(
                &mut rig.model,
                &[0.0, 0.0],
                &mut rig.textures,
                &mut rig.canvas,
                &mut Tracer::none()
            ),
            Err(ForwardPassError::Busy)
        );

        let edited_sum = sum_layer(request.channels());
        rig.session
            .finish_commit(
                request,
                Ok(vec![edited_sum]),
                &mut rig.textures,
                &mut rig.canvas,
                &mut Tracer::none(),
            )
            .unwrap();
        assert_eq!(rig.session.state(), SessionState::Editing);
    }

    #[test]
    fn stale_request_is_dropped() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.fill(1.0, true).unwrap();
        let request = rig.session.begin_commit(&mut Tracer::none()).unwrap();
        let outputs = rig.model.run(&[0.0, 0.0]).unwrap();
        rig.session
            .install(outputs, 3, &mut rig.textures, &mut rig.canvas, &mut Tracer::none());
        let err = rig
            .session
            .finish_commit(request, Ok(vec![]), &mut rig.textures, &mut rig.canvas, &mut Tracer::none())
            .unwrap_err();
        assert_eq!(err, ForwardPassError::Stale { request: 1, current: 2 });
        assert_eq!(rig.session.registry().generation(), 2);
    }

    #[test]
    fn install_drops_selections_and_textures() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        let outputs = rig.model.run(&[0.0, 0.0]).unwrap();
        rig.session
            .install(outputs, 3, &mut rig.textures, &mut rig.canvas, &mut Tracer::none());
        assert!(rig.session.committed().is_none());
        assert!(rig.session.hover().is_none());
        assert!(rig.canvas.is_blank());
        assert_eq!(rig.session.state(), SessionState::Idle);
        assert_eq!(rig.textures.live(), 3);
    }

    #[test]
    fn cancel_restores_display() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        let before = rig.canvas.pixels().to_vec();
        rig.fill(1.0, false).unwrap();
        assert_ne!(rig.canvas.pixels(), before.as_slice());
        assert_eq!(rig.session.cancel(&mut rig.canvas, &mut Tracer::none()), 1);
        assert_eq!(rig.canvas.pixels(), before.as_slice());
        assert_eq!(rig.commit(), Ok(None));
    }

    #[test]
    fn helpers_run_through_edit() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.session.set_brush_size(2);
        let record = rig
            .session
            .edit(&mut rig.canvas, &mut Tracer::none(), |e, d| e.brush(0, 0, false, d))
            .unwrap();
        assert!(record.broadcast);
        let live = rig.session.editor().live().unwrap();
        assert!((live.get(1, 1).unwrap() - 0.35).abs() < 1e-6);
        assert_eq!(live.get(2, 2), Some(0.25));
    }

    #[test]
    fn show_output_paints_last_layer() {
        let rig = Rig::new();
        let mut canvas = Canvas::new();
        assert!(rig.session.show_output(&mut canvas));
        // 0.75 in [-1, 1] maps to 0.875.
        assert_eq!(canvas.pixel(0, 0), Some([223, 223, 223, 255]));
        assert!(!Session::default().show_output(&mut canvas));
    }

    #[test]
    fn base_output_survives_commits() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(1));
        rig.fill(0.0, false).unwrap();
        rig.commit().unwrap().unwrap();

        let mut base = Canvas::new();
        let mut current = Canvas::new();
        assert!(rig.session.show_base_output(&mut base), "base output is kept");
        assert!(rig.session.show_output(&mut current), "current output exists");
        assert_eq!(base.pixel(0, 0), Some([223, 223, 223, 255]), "base is the pre-edit sum");
        assert_ne!(base.pixels(), current.pixels(), "commit changed the current output");
        assert_eq!(
            rig.session.base_output()[0].get(0, 0),
            Some(0.75),
            "base keeps the regenerated values"
        );

        // Regenerating replaces the base.
        rig.session
            .regenerate(&mut rig.model, &[0.0, 0.0], &mut rig.textures, &mut rig.canvas, &mut Tracer::none())
            .unwrap();
        assert_eq!(rig.session.base_output()[0].get(0, 0), Some(0.0), "base follows regenerate");
        assert!(!Session::default().show_base_output(&mut base), "nothing generated yet");
    }

    #[test]
    fn close_editor_returns_to_idle() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.fill(1.0, true).unwrap();
        assert!(rig.session.close_editor(&mut rig.canvas, &mut Tracer::none()), "closes when not busy");
        assert_eq!(rig.session.state(), SessionState::Idle, "closing leaves nothing open");
        assert!(rig.session.committed().is_none(), "selection dropped");
        assert!(rig.session.editor().pending().is_empty(), "pending edits dropped");
        assert!(rig.canvas.is_blank(), "display blanked");
        assert_eq!(rig.commit(), Ok(None), "nothing left to commit");
        assert_eq!(rig.session.registry().generation(), 1, "registry untouched");
    }

    #[test]
    fn close_editor_is_ignored_while_busy() {
        let mut rig = Rig::new();
        rig.open(PickId::from_linear(0));
        rig.fill(1.0, true).unwrap();
        let _request = rig.session.begin_commit(&mut Tracer::none()).unwrap();
        assert!(!rig.session.close_editor(&mut rig.canvas, &mut Tracer::none()), "busy sessions stay open");
        assert_eq!(rig.session.state(), SessionState::Busy, "still waiting on the forward pass");
        assert!(rig.session.committed().is_some(), "selection kept");
    }

    #[test]
    fn snapshot_holds_only_spatial_layers() {
        let rig = Rig::new();
        for layer in rig.session.registry().snapshot_outputs() {
            assert!(matches!(layer.data, LayerData::Spatial(_)));
        }
    }
}
