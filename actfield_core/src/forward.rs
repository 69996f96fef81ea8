// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Forward-pass contract and per-layer outputs.
//!
//! The model is a black box behind [`ForwardPass`]. It turns an input vector
//! into one [`LayerOutput`] per network layer, and can re-run from any layer
//! given replacement activations for it, streaming each downstream layer as
//! it is produced.
//!
//! Spatial layers arrive as a [`ChannelStack`]; anything else (dense vectors,
//! logits) is [`LayerData::Flat`] and never becomes quads.

use alloc::string::String;
use alloc::vec::Vec;

use crate::slice::{ShapeError, SliceBuffer};

/// Memory order of a stacked `channels × height × width` tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// `[c][y][x]`: each channel is contiguous.
    ChannelsFirst,
    /// `[y][x][c]`: channels are interleaved per pixel.
    #[default]
    ChannelsLast,
}

/// Channels of one spatial layer, all the same shape.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelStack {
    width: u32,
    height: u32,
    channels: Vec<SliceBuffer>,
}

impl ChannelStack {
    /// Groups `channels`, checking they share one shape.
    ///
    /// An empty stack is 0×0.
    pub fn new(channels: Vec<SliceBuffer>) -> Result<Self, ShapeError> {
        let (width, height) = channels
            .first()
            .map_or((0, 0), |c| (c.width(), c.height()));
        for (index, c) in channels.iter().enumerate() {
            if c.width() != width || c.height() != height {
                return Err(ShapeError::ChannelShape {
                    index,
                    width,
                    height,
                    actual_width: c.width(),
                    actual_height: c.height(),
                });
            }
        }
        Ok(Self {
            width,
            height,
            channels,
        })
    }

    /// Groups channels already known to be `width × height`.
    pub(crate) fn from_parts(width: u32, height: u32, channels: Vec<SliceBuffer>) -> Self {
        debug_assert!(
            channels.iter().all(|c| c.width() == width && c.height() == height),
            "channels must be {width}x{height}"
        );
        Self {
            width,
            height,
            channels,
        }
    }

    /// Splits a stacked tensor into per-channel buffers.
    pub fn from_tensor(
        values: &[f32],
        width: u32,
        height: u32,
        channels: u32,
        format: DataFormat,
    ) -> Result<Self, ShapeError> {
        let plane = width as usize * height as usize;
        let count = channels as usize;
        let expected = plane * count;
        if values.len() != expected {
            return Err(ShapeError::TensorLength {
                channels,
                width,
                height,
                expected,
                actual: values.len(),
            });
        }
        let split = (0..count)
            .map(|c| {
                let data: Vec<f32> = match format {
                    DataFormat::ChannelsFirst => values[c * plane..(c + 1) * plane].to_vec(),
                    DataFormat::ChannelsLast => {
                        values.iter().skip(c).step_by(count).copied().collect()
                    }
                };
                SliceBuffer::from_vec(width, height, data)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            width,
            height,
            channels: split,
        })
    }

    /// Stacks the channels back into one tensor.
    #[must_use]
    pub fn to_tensor(&self, format: DataFormat) -> Vec<f32> {
        let plane = self.width as usize * self.height as usize;
        let mut out = Vec::with_capacity(plane * self.channels.len());
        match format {
            DataFormat::ChannelsFirst => {
                for c in &self.channels {
                    out.extend_from_slice(c.as_slice());
                }
            }
            DataFormat::ChannelsLast => {
                for i in 0..plane {
                    out.extend(self.channels.iter().map(|c| c.as_slice()[i]));
                }
            }
        }
        out
    }

    /// Channel width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Channel height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether there are no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The channels in order.
    #[must_use]
    pub fn channels(&self) -> &[SliceBuffer] {
        &self.channels
    }

    /// Consumes the stack, returning its channels.
    #[must_use]
    pub fn into_channels(self) -> Vec<SliceBuffer> {
        self.channels
    }
}

/// Payload of one network layer's output.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerData {
    /// A 2D feature map per channel.
    Spatial(ChannelStack),
    /// Anything without spatial structure.
    Flat(Vec<f32>),
}

/// One network layer's output.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerOutput {
    /// Layer name as reported by the model.
    pub name: String,
    /// Position in the network's layer sequence.
    pub network_index: usize,
    /// The activations.
    pub data: LayerData,
}

impl LayerOutput {
    /// A spatial layer.
    #[must_use]
    pub fn spatial(name: impl Into<String>, network_index: usize, stack: ChannelStack) -> Self {
        Self {
            name: name.into(),
            network_index,
            data: LayerData::Spatial(stack),
        }
    }

    /// A non-spatial layer.
    #[must_use]
    pub fn flat(name: impl Into<String>, network_index: usize, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            network_index,
            data: LayerData::Flat(values),
        }
    }

    /// Builds an output from a tensor and its shape.
    ///
    /// A leading batch dimension of 1 is dropped. Rank-3 shapes are spatial,
    /// read as `[h, w, c]` or `[c, h, w]` according to `format`; every other
    /// rank is flat.
    pub fn from_tensor(
        name: impl Into<String>,
        network_index: usize,
        shape: &[usize],
        values: Vec<f32>,
        format: DataFormat,
    ) -> Result<Self, ShapeError> {
        let shape = match shape {
            [1, rest @ ..] if rest.len() == 3 => rest,
            s => s,
        };
        let dims = match (shape, format) {
            ([h, w, c], DataFormat::ChannelsLast) | ([c, h, w], DataFormat::ChannelsFirst) => {
                Some((*w, *h, *c))
            }
            _ => None,
        };
        let spatial = dims.and_then(|(w, h, c)| {
            Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?, u32::try_from(c).ok()?))
        });
        Ok(match spatial {
            Some((w, h, c)) => {
                let stack = ChannelStack::from_tensor(&values, w, h, c, format)?;
                Self::spatial(name, network_index, stack)
            }
            None => Self::flat(name, network_index, values),
        })
    }

    /// The channels, if this layer is spatial.
    #[must_use]
    pub fn stack(&self) -> Option<&ChannelStack> {
        match &self.data {
            LayerData::Spatial(s) => Some(s),
            LayerData::Flat(_) => None,
        }
    }
}

/// Why a forward pass did not produce outputs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ForwardPassError {
    /// The model rejected the request.
    #[error("forward pass rejected: {0}")]
    Rejected(String),
    /// `run_from` named a layer the model does not have.
    #[error("network has no layer {0}")]
    UnknownLayer(usize),
    /// The model did not answer in time.
    #[error("forward pass timed out")]
    TimedOut,
    /// Another forward pass is already in flight.
    #[error("a forward pass is already running")]
    Busy,
    /// The layer set was regenerated while the request was in flight.
    #[error("request for generation {request} arrived at generation {current}")]
    Stale {
        /// Generation the request was made against.
        request: u32,
        /// Generation of the registry when it completed.
        current: u32,
    },
    /// Activations did not match the layer's shape.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// The model inference collaborator.
pub trait ForwardPass {
    /// Runs the whole network on `input`.
    fn run(&mut self, input: &[f32]) -> Result<Vec<LayerOutput>, ForwardPassError>;

    /// Re-runs every layer after `network_index`, feeding `channels` in place
    /// of that layer's activations.
    ///
    /// Each downstream output is passed to `emit` as soon as it is ready.
    fn run_from(
        &mut self,
        network_index: usize,
        channels: &[SliceBuffer],
        emit: &mut dyn FnMut(LayerOutput),
    ) -> Result<(), ForwardPassError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn channels_last_splits_interleaved() {
        // 2x1 pixels, 3 channels.
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let stack = ChannelStack::from_tensor(&values, 2, 1, 3, DataFormat::ChannelsLast).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.channels()[0].as_slice(), &[1.0, 4.0]);
        assert_eq!(stack.channels()[2].as_slice(), &[3.0, 6.0]);
        assert_eq!(stack.to_tensor(DataFormat::ChannelsLast), values);
    }

    #[test]
    fn channels_first_splits_planes() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let stack = ChannelStack::from_tensor(&values, 2, 1, 2, DataFormat::ChannelsFirst).unwrap();
        assert_eq!(stack.channels()[1].as_slice(), &[3.0, 4.0]);
        assert_eq!(stack.to_tensor(DataFormat::ChannelsLast), [1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn tensor_length_is_checked() {
        let err = ChannelStack::from_tensor(&[0.0; 5], 2, 1, 3, DataFormat::ChannelsLast).unwrap_err();
        assert!(matches!(err, ShapeError::TensorLength { expected: 6, actual: 5, .. }));
    }

    #[test]
    fn mixed_shapes_are_rejected() {
        let err = ChannelStack::new(vec![SliceBuffer::zeros(2, 2), SliceBuffer::zeros(3, 2)]).unwrap_err();
        assert!(matches!(err, ShapeError::ChannelShape { index: 1, .. }));
    }

    #[test]
    fn rank_decides_spatial_or_flat() {
        let out = LayerOutput::from_tensor("conv", 2, &[1, 2, 2, 3], vec![0.0; 12], DataFormat::ChannelsLast).unwrap();
        let stack = out.stack().unwrap();
        assert_eq!((stack.width(), stack.height(), stack.len()), (2, 2, 3));

        let out = LayerOutput::from_tensor("dense", 1, &[1, 64], vec![0.0; 64], DataFormat::ChannelsLast).unwrap();
        assert!(out.stack().is_none());

        let out = LayerOutput::from_tensor("chw", 3, &[4, 1, 2], vec![0.0; 8], DataFormat::ChannelsFirst).unwrap();
        let stack = out.stack().unwrap();
        assert_eq!((stack.width(), stack.height(), stack.len()), (2, 1, 4));
    }
}
