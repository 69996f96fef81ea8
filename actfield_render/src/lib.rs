// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan and camera for the actfield quad field.
//!
//! This crate sits between [`actfield_core`]'s registry evaluation and a
//! rasterization backend. It defines:
//!
//! - [`RenderItem`]: one quad's draw data (model matrix, id color, tint, texture)
//! - [`RenderPlan`]: every quad of the current generation, indexed by linear id
//! - [`OrbitCamera`]: a perspective camera orbiting a target point

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod camera;
mod plan;

pub use camera::OrbitCamera;
pub use plan::{RenderItem, RenderPlan};
