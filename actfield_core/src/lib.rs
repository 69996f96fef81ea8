// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Activation field model for interactive network inspection.
//!
//! `actfield_core` lays out every channel of every spatial layer a network
//! produces as a textured quad, resolves which quad the cursor is over from an
//! id-colour pass, and stages edits to one channel (or a whole layer) before
//! handing the edited activations back to the model. It is `no_std`
//! compatible (with `alloc`) and never talks to a GPU or a model directly;
//! both sit behind traits.
//!
//! # Architecture
//!
//! ```text
//!   ForwardPass::run() ──► Vec<LayerOutput> ──► LayerRegistry::build()
//!                                                     │  (QuadFactory,
//!                                                     │   TextureUpdater)
//!                 ┌───────────────────────────────────┘
//!                 ▼
//!   PickSource ──► Picker::resolve_hit() ──► Selection (hover)
//!                                                 │
//!                  pointer release               ▼
//!   Editor::open() ◄── Selection (committed) ◄────┘
//!        │
//!        ▼  Transformation × N  (live copy, DisplaySurface)
//!   Session::begin_commit() ──► InferenceRequest ──► ForwardPass::run_from()
//!                                                         │
//!   Session::finish_commit() ◄────────────────────────────┘
//!        │
//!        ▼
//!   LayerRegistry::evaluate() ──► FieldChanges ──► Presenter::apply()
//! ```
//!
//! **[`slice`]**: Per-channel `f32` grids with a shape invariant.
//!
//! **[`transformation`]**: Fill, rectangle, rotate and scale edits, as free
//! functions and as the replayable [`Transformation`](transformation::Transformation)
//! enum.
//!
//! **[`animate`]**: Precomputed keyframe animations with easing.
//!
//! **[`id`]**: Picking ids and their RGB encoding.
//!
//! **[`quad`]**: Quad placement and hover pop.
//!
//! **[`registry`]**: One generation of quads grouped by layer, the
//! id ↔ selection walk, and dirty-tracked evaluation via `understory_dirty`.
//!
//! **[`picking`]**: Cursor to device pixel, readback decoding with stale and
//! latency guards, and a CPU [`IdTarget`](picking::IdTarget).
//!
//! **[`editor`]**: Snapshot, live copy and pending records for the committed
//! channel.
//!
//! **[`session`]**: The coordinator owning hover, committed selection,
//! registry and editor.
//!
//! **[`forward`]**: The [`ForwardPass`](forward::ForwardPass) contract and
//! layer outputs.
//!
//! **[`backend`]** / **[`display`]**: Traits rasterization backends and 2D
//! surfaces implement.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with the zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod animate;
pub mod backend;
pub mod dirty;
pub mod display;
pub mod editor;
pub mod forward;
pub mod id;
pub mod picking;
pub mod quad;
pub mod registry;
pub mod session;
pub mod slice;
pub mod trace;
pub mod transform;
pub mod transformation;
