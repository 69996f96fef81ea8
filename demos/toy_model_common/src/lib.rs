// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared model and picking helpers for the actfield demos.
//!
//! [`ToyNet`] is a small deterministic convolution-like network: channel
//! mixing with `tanh`, a 2×2 average pool, and a flat per-channel mean at the
//! end. [`IdGrid`] lays the quads out as a flat grid on a CPU
//! [`IdTarget`], standing in for the GPU id pass in headless runs.

#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use actfield_core::forward::{ChannelStack, DataFormat, ForwardPass, ForwardPassError, LayerOutput};
use actfield_core::picking::IdTarget;
use actfield_core::registry::LayerRegistry;
use actfield_core::slice::SliceBuffer;
use kurbo::Point;

/// Side of the square input image.
pub const INPUT_SIZE: u32 = 16;

/// Channels of the input image.
pub const INPUT_CHANNELS: u32 = 3;

/// A `size × size` RGB gradient in `[-1, 1]`, channels last.
pub fn gradient_input(size: u32) -> Vec<f32> {
    let span = size.saturating_sub(1).max(1) as f32;
    let mut out = Vec::with_capacity(size as usize * size as usize * 3);
    for y in 0..size {
        for x in 0..size {
            let u = x as f32 / span;
            let v = y as f32 / span;
            out.extend_from_slice(&[u * 2.0 - 1.0, v * 2.0 - 1.0, 1.0 - u - v]);
        }
    }
    out
}

#[derive(Clone, Debug)]
enum Stage {
    /// Every output channel is `tanh` of a weighted sum of input channels.
    Mix { outputs: usize },
    /// 2×2 average, halving both sides.
    Pool,
    /// One value per channel: its mean.
    Mean,
}

fn weight(o: usize, i: usize, inputs: usize) -> f32 {
    let step = ((o * 7 + i * 3) % 5) as f32;
    (step / 2.0 - 1.0) / inputs as f32
}

fn mix(stack: &ChannelStack, outputs: usize) -> Result<ChannelStack, ForwardPassError> {
    let inputs = stack.len();
    let channels = (0..outputs)
        .map(|o| {
            let mut acc = SliceBuffer::zeros(stack.width(), stack.height());
            for (i, c) in stack.channels().iter().enumerate() {
                let w = weight(o, i, inputs);
                for (a, v) in acc.as_mut_slice().iter_mut().zip(c.as_slice()) {
                    *a += w * v;
                }
            }
            for a in acc.as_mut_slice() {
                *a = libm::tanhf(*a * 2.0);
            }
            acc
        })
        .collect();
    Ok(ChannelStack::new(channels)?)
}

fn pool(stack: &ChannelStack) -> Result<ChannelStack, ForwardPassError> {
    let (w, h) = (stack.width() / 2, stack.height() / 2);
    if w == 0 || h == 0 {
        return Err(ForwardPassError::Rejected(String::from(
            "layer too small to pool",
        )));
    }
    let src_w = stack.width() as usize;
    let channels = stack
        .channels()
        .iter()
        .map(|c| {
            let s = c.as_slice();
            let mut data = Vec::with_capacity(w as usize * h as usize);
            for y in 0..h as usize {
                for x in 0..w as usize {
                    let i = 2 * y * src_w + 2 * x;
                    data.push((s[i] + s[i + 1] + s[i + src_w] + s[i + src_w + 1]) / 4.0);
                }
            }
            SliceBuffer::from_vec(w, h, data)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChannelStack::new(channels)?)
}

fn mean(stack: &ChannelStack) -> Vec<f32> {
    stack
        .channels()
        .iter()
        .map(|c| c.as_slice().iter().sum::<f32>() / c.len().max(1) as f32)
        .collect()
}

/// A deterministic toy network.
///
/// | index | name     | output        |
/// |-------|----------|---------------|
/// | 0     | `input`  | 3 × 16 × 16   |
/// | 1     | `conv1`  | 6 × 16 × 16   |
/// | 2     | `pool1`  | 6 × 8 × 8     |
/// | 3     | `conv2`  | 6 × 8 × 8     |
/// | 4     | `output` | 3 × 8 × 8     |
/// | 5     | `logits` | 3 (flat)      |
#[derive(Clone, Debug)]
pub struct ToyNet {
    stages: Vec<(&'static str, Stage)>,
    runs: u32,
    fail_next: bool,
}

impl Default for ToyNet {
    fn default() -> Self {
        Self::new()
    }
}

impl ToyNet {
    /// Builds the network.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: alloc::vec![
                ("conv1", Stage::Mix { outputs: 6 }),
                ("pool1", Stage::Pool),
                ("conv2", Stage::Mix { outputs: 6 }),
                ("output", Stage::Mix { outputs: 3 }),
                ("logits", Stage::Mean),
            ],
            runs: 0,
            fail_next: false,
        }
    }

    /// Number of network layers, input included.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.stages.len() + 1
    }

    /// Forward passes run so far, partial ones included.
    #[must_use]
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Makes the next pass fail, for exercising error paths.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    fn check_failure(&mut self) -> Result<(), ForwardPassError> {
        self.runs += 1;
        if core::mem::take(&mut self.fail_next) {
            return Err(ForwardPassError::Rejected(String::from("injected failure")));
        }
        Ok(())
    }

    fn forward(
        &self,
        after: usize,
        mut stack: ChannelStack,
        emit: &mut dyn FnMut(LayerOutput),
    ) -> Result<(), ForwardPassError> {
        for (offset, (name, stage)) in self.stages.iter().enumerate().skip(after) {
            let index = offset + 1;
            match stage {
                Stage::Mix { outputs } => stack = mix(&stack, *outputs)?,
                Stage::Pool => stack = pool(&stack)?,
                Stage::Mean => {
                    emit(LayerOutput::flat(*name, index, mean(&stack)));
                    return Ok(());
                }
            }
            emit(LayerOutput::spatial(*name, index, stack.clone()));
        }
        Ok(())
    }
}

impl ForwardPass for ToyNet {
    fn run(&mut self, input: &[f32]) -> Result<Vec<LayerOutput>, ForwardPassError> {
        self.check_failure()?;
        let stack = ChannelStack::from_tensor(
            input,
            INPUT_SIZE,
            INPUT_SIZE,
            INPUT_CHANNELS,
            DataFormat::ChannelsLast,
        )?;
        let mut outputs = alloc::vec![LayerOutput::spatial("input", 0, stack.clone())];
        self.forward(0, stack, &mut |o| outputs.push(o))?;
        Ok(outputs)
    }

    fn run_from(
        &mut self,
        network_index: usize,
        channels: &[SliceBuffer],
        emit: &mut dyn FnMut(LayerOutput),
    ) -> Result<(), ForwardPassError> {
        if network_index >= self.layer_count() {
            return Err(ForwardPassError::UnknownLayer(network_index));
        }
        self.check_failure()?;
        let stack = ChannelStack::new(channels.to_vec())?;
        self.forward(network_index, stack, emit)
    }
}

/// A flat grid of id cells, one column per layer and one row per channel.
///
/// Cells leave a one-pixel gap on their right and bottom edges so that
/// neighbouring quads never touch.
#[derive(Clone, Copy, Debug)]
pub struct IdGrid {
    width: u32,
    height: u32,
    cols: u32,
    rows: u32,
}

impl IdGrid {
    /// Sizes a grid for `registry` on a `width × height` target.
    #[must_use]
    pub fn for_registry(registry: &LayerRegistry, width: u32, height: u32) -> Self {
        let cols = u32::try_from(registry.layers().len()).unwrap_or(u32::MAX).max(1);
        let rows = registry
            .layers()
            .iter()
            .map(|l| l.channel_count())
            .max()
            .and_then(|r| u32::try_from(r).ok())
            .unwrap_or(1)
            .max(1);
        Self {
            width,
            height,
            cols,
            rows,
        }
    }

    /// The pixel rectangle `[x0, x1) × [y0, y1)` of a cell.
    #[must_use]
    pub fn cell(&self, slot: usize, channel: usize) -> (u32, u32, u32, u32) {
        let (cw, ch) = (self.width / self.cols, self.height / self.rows);
        let col = u32::try_from(slot).unwrap_or(u32::MAX);
        let row = u32::try_from(channel).unwrap_or(u32::MAX);
        let (x0, y0) = (col.saturating_mul(cw), row.saturating_mul(ch));
        (
            x0,
            y0,
            x0.saturating_add(cw.saturating_sub(1)),
            y0.saturating_add(ch.saturating_sub(1)),
        )
    }

    /// Center of a cell in target pixels.
    #[must_use]
    pub fn center(&self, slot: usize, channel: usize) -> Point {
        let (x0, y0, x1, y1) = self.cell(slot, channel);
        Point::new(
            (f64::from(x0) + f64::from(x1)) / 2.0,
            (f64::from(y0) + f64::from(y1)) / 2.0,
        )
    }

    /// Clears `target` for the registry's generation and paints every quad.
    pub fn paint(&self, target: &mut IdTarget, registry: &LayerRegistry) {
        target.clear(registry.generation());
        for quad in registry.quads() {
            let (x0, y0, x1, y1) = self.cell(quad.layer_index(), quad.channel());
            target.fill_rect(x0, y0, x1, y1, quad.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actfield_core::backend::HeadlessTextures;
    use actfield_core::id::PickId;
    use actfield_core::quad::QuadFactory;

    fn outputs() -> Vec<LayerOutput> {
        ToyNet::new().run(&gradient_input(INPUT_SIZE)).unwrap()
    }

    #[test]
    fn run_emits_every_layer() {
        let outs = outputs();
        let indices: Vec<_> = outs.iter().map(|o| o.network_index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4, 5]);
        let output = outs[4].stack().unwrap();
        assert_eq!((output.len(), output.width(), output.height()), (3, 8, 8));
        assert!(outs[5].stack().is_none(), "logits are flat");
    }

    #[test]
    fn activations_stay_in_range() {
        for o in outputs().iter().skip(1) {
            if let Some(stack) = o.stack() {
                for c in stack.channels() {
                    assert!(
                        c.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)),
                        "{} left [-1, 1]",
                        o.name
                    );
                }
            }
        }
    }

    #[test]
    fn run_from_is_deterministic() {
        let outs = outputs();
        let pooled = outs[2].stack().unwrap().channels().to_vec();
        let mut net = ToyNet::new();
        let mut emitted = Vec::new();
        net.run_from(2, &pooled, &mut |o| emitted.push(o)).unwrap();
        let indices: Vec<_> = emitted.iter().map(|o| o.network_index).collect();
        assert_eq!(indices, [3, 4, 5]);
        assert_eq!(
            emitted[1].stack().unwrap().channels(),
            outs[4].stack().unwrap().channels()
        );
    }

    #[test]
    fn failures_and_bad_layers() {
        let mut net = ToyNet::new();
        let input = gradient_input(INPUT_SIZE);
        net.fail_next();
        assert!(
            matches!(net.run(&input), Err(ForwardPassError::Rejected(_))),
            "injected failure surfaces"
        );
        assert!(net.run(&input).is_ok(), "failure is one-shot");
        assert_eq!(
            net.run_from(9, &[], &mut |_| {}),
            Err(ForwardPassError::UnknownLayer(9))
        );
        assert!(
            matches!(net.run(&[0.0; 3]), Err(ForwardPassError::Shape(_))),
            "short input is a shape error"
        );
    }

    #[test]
    fn grid_paints_decodable_ids() {
        let mut tex = HeadlessTextures::new();
        let registry = LayerRegistry::build(outputs(), 6, 1, &QuadFactory::default(), &mut tex);
        let grid = IdGrid::for_registry(&registry, 200, 120);
        let mut target = IdTarget::new(200, 120);
        grid.paint(&mut target, &registry);

        let center = grid.center(2, 4);
        let [r, g, b, _] = target.pixel(center.x as u32, center.y as u32).unwrap();
        let id = PickId::decode([r, g, b]).unwrap();
        let sel = registry.map_id_to_selection(id).unwrap();
        assert_eq!((sel.layer, sel.channel), (2, 4));

        let (_, _, x1, y1) = grid.cell(0, 0);
        assert_eq!(target.pixel(x1, y1), Some([0; 4]), "gap stays background");
    }
}
