// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Depthwise convolution decomposed over processing elements.

use super::{ChannelPartition, ConcatPe, PeConfig, SplitPe};
use crate::builtin::prepare_output;
use crate::KernelError;
use rayon::prelude::*;
use tensor_core::ops::{self, Conv2dParams};
use tensor_core::{DType, Tensor, TensorView};

/// One processing element: a depthwise convolution over a channel group
/// with that group's slice of the filter and bias.
#[derive(Debug, Clone)]
pub struct DepthwiseConvPe {
    filter: Tensor,
    bias: Option<Tensor>,
    params: Conv2dParams,
}

impl DepthwiseConvPe {
    pub fn new(filter: Tensor, bias: Option<Tensor>, params: Conv2dParams) -> Self {
        Self {
            filter,
            bias,
            params,
        }
    }

    /// Channels this element handles.
    pub fn channels(&self) -> usize {
        self.filter.shape().dims().first().copied().unwrap_or(0)
    }

    /// Convolves `input` into `out`, which takes `input`'s element type.
    pub fn compute_into(&self, input: &TensorView<'_>, out: &mut Tensor) -> Result<(), KernelError> {
        let shape = ops::depthwise_output_shape(input.shape(), self.filter.shape(), &self.params)?;
        prepare_output(out, shape, input.dtype());
        let bias = self.bias.as_ref().map(Tensor::view);
        ops::depthwise_conv2d(input, &self.filter.view(), bias.as_ref(), &self.params, out)?;
        Ok(())
    }

    pub fn compute(&self, input: &TensorView<'_>) -> Result<Tensor, KernelError> {
        let mut out = Tensor::empty();
        self.compute_into(input, &mut out)?;
        Ok(out)
    }
}

/// `SplitPe → N × DepthwiseConvPe → ConcatPe`.
///
/// With a single group the split and concat stages are bypassed and the
/// lone element reads the input and writes the output directly.
#[derive(Debug, Clone)]
pub struct DepthwiseConvSplitPe {
    partition: ChannelPartition,
    split: SplitPe,
    convs: Vec<DepthwiseConvPe>,
    concat: ConcatPe,
}

impl DepthwiseConvSplitPe {
    /// Partitions `filter` `[C, 1, KH, KW]` and `bias` `[C]` for `config`,
    /// storing the per-group slices as `weight_dtype`.
    pub fn new(
        filter: &Tensor,
        bias: Option<&Tensor>,
        params: Conv2dParams,
        config: &PeConfig,
        weight_dtype: DType,
    ) -> Result<Self, KernelError> {
        let channels = filter.shape().dims().first().copied().unwrap_or(0);
        if channels == 0 {
            return Err(KernelError::ShapeMismatch {
                op: "depthwise_conv2d".into(),
                detail: format!("filter {} has no channels", filter.shape()),
            });
        }
        let partition = ChannelPartition::compute(channels, config);
        let sections = partition.sections();

        let filters = ops::split(&filter.view(), 0, sections)?;
        let biases: Vec<Option<Tensor>> = match bias {
            Some(b) => ops::split(&b.view(), 0, sections)?
                .into_iter()
                .map(Some)
                .collect(),
            None => vec![None; sections.len()],
        };

        let convs = filters
            .into_iter()
            .zip(biases)
            .map(|(f, b)| -> Result<DepthwiseConvPe, KernelError> {
                let f = ops::cast(&f.view(), weight_dtype)?;
                let b = b.map(|b| ops::cast(&b.view(), weight_dtype)).transpose()?;
                Ok(DepthwiseConvPe::new(f, b, params))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            split: SplitPe::new(&partition),
            partition,
            convs,
            concat: ConcatPe::new(),
        })
    }

    pub fn partition(&self) -> &ChannelPartition {
        &self.partition
    }

    pub fn num_groups(&self) -> usize {
        self.convs.len()
    }

    /// Runs every element and joins the results into `out`.
    ///
    /// Returns only after all elements have completed.
    pub fn run(&self, input: &TensorView<'_>, out: &mut Tensor) -> Result<(), KernelError> {
        let channels = input.shape().dim(super::CHANNEL_AXIS).unwrap_or(0);
        if channels != self.partition.total_channels() {
            return Err(KernelError::ShapeMismatch {
                op: "depthwise_conv2d".into(),
                detail: format!(
                    "input {} has {channels} channels, filter has {}",
                    input.shape(),
                    self.partition.total_channels()
                ),
            });
        }

        if let [only] = self.convs.as_slice() {
            return only.compute_into(input, out);
        }

        let parts = self.split.run(input)?;
        let views = parts.views();
        let results = self
            .convs
            .par_iter()
            .zip(views.par_iter())
            .map(|(pe, view)| pe.compute(view))
            .collect::<Result<Vec<_>, _>>()?;
        self.concat.run(&results, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn ramp(shape: Shape, scale: f32) -> Tensor {
        let n = shape.num_elements();
        let v: Vec<f32> = (0..n).map(|i| ((i % 13) as f32 - 6.0) * scale).collect();
        Tensor::from_f32(shape, &v).unwrap()
    }

    fn small_pe() -> PeConfig {
        PeConfig {
            lane_width: 2,
            group_alignment: 2,
            max_channels_per_pe: 4,
        }
    }

    #[test]
    fn test_groups_follow_partition() {
        let filter = ramp(Shape::new(vec![10, 1, 3, 3]), 0.1);
        let pe = DepthwiseConvSplitPe::new(&filter, None, Conv2dParams::default(), &small_pe(), DType::F32)
            .unwrap();
        assert_eq!(pe.num_groups(), 3);
        assert_eq!(pe.partition().sections(), &[4, 4, 2]);
    }

    #[test]
    fn test_split_equals_single_group() {
        let params = Conv2dParams {
            strides: [1, 1],
            paddings: [1, 1],
        };
        let input = ramp(Shape::new(vec![2, 10, 5, 5]), 0.25);
        let filter = ramp(Shape::new(vec![10, 1, 3, 3]), 0.1);
        let bias = ramp(Shape::vector(10), 0.5);

        let split = DepthwiseConvSplitPe::new(&filter, Some(&bias), params, &small_pe(), DType::F32).unwrap();
        let single = DepthwiseConvSplitPe::new(&filter, Some(&bias), params, &PeConfig::default(), DType::F32)
            .unwrap();
        assert_eq!(single.num_groups(), 1);

        let mut a = Tensor::empty();
        let mut b = Tensor::empty();
        split.run(&input.view(), &mut a).unwrap();
        single.run(&input.view(), &mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), &Shape::new(vec![2, 10, 5, 5]));
    }

    #[test]
    fn test_channel_mismatch() {
        let filter = ramp(Shape::new(vec![4, 1, 1, 1]), 1.0);
        let pe = DepthwiseConvSplitPe::new(&filter, None, Conv2dParams::default(), &small_pe(), DType::F32)
            .unwrap();
        let input = ramp(Shape::new(vec![1, 6, 2, 2]), 1.0);
        let mut out = Tensor::empty();
        assert!(matches!(
            pe.run(&input.view(), &mut out),
            Err(KernelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_filter_rejected() {
        let filter = Tensor::zeros(Shape::new(vec![0, 1, 3, 3]), DType::F32);
        assert!(
            DepthwiseConvSplitPe::new(&filter, None, Conv2dParams::default(), &small_pe(), DType::F32)
                .is_err()
        );
    }
}
