// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Quad state that a backend mirrors is tracked per quad (keyed by linear id)
//! with [`understory_dirty`]. All channels are local-only: quads have no
//! parent/child relationships, so nothing propagates.
//!
//! [`LayerRegistry::evaluate`](crate::registry::LayerRegistry::evaluate)
//! drains every channel into [`FieldChanges`](crate::registry::FieldChanges).
//! A regenerated registry reports `regenerated` instead; backends rebuild
//! from scratch in that case.

use understory_dirty::Channel;

/// Hover animation moved the quad.
pub const TRANSFORM: Channel = Channel::new(0);

/// Hover highlight turned on or off.
pub const TINT: Channel = Channel::new(1);
