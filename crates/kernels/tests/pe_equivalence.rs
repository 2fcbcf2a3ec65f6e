// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A depthwise convolution split over several processing elements must
//! produce exactly what a single element produces.

use kernels::pe::{DepthwiseConvSplitPe, PeConfig};
use proptest::prelude::*;
use tensor_core::ops::{self, Conv2dParams};
use tensor_core::{DType, Shape, Tensor};

fn ramp(shape: Shape, seed: usize, scale: f32) -> Tensor {
    let n = shape.num_elements();
    let v: Vec<f32> = (0..n)
        .map(|i| (((i + seed) * 31 % 17) as f32 - 8.0) * scale)
        .collect();
    Tensor::from_f32(shape, &v).unwrap()
}

fn run(pe: &DepthwiseConvSplitPe, input: &Tensor) -> Tensor {
    let mut out = Tensor::empty();
    pe.run(&input.view(), &mut out).unwrap();
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_split_matches_single_pe(
        batch in 1usize..3,
        channels in 1usize..40,
        hw in 1usize..6,
        kernel in prop::sample::select(vec![1usize, 3]),
        stride in 1usize..3,
        pad in 0usize..2,
        max_per_pe in 1usize..12,
        seed in 0usize..100,
    ) {
        prop_assume!(hw + 2 * pad >= kernel);
        let params = Conv2dParams { strides: [stride, stride], paddings: [pad, pad] };
        let input = ramp(Shape::new(vec![batch, channels, hw, hw]), seed, 0.25);
        let filter = ramp(Shape::new(vec![channels, 1, kernel, kernel]), seed + 1, 0.125);
        let bias = ramp(Shape::vector(channels), seed + 2, 0.5);

        let narrow = PeConfig { lane_width: 1, group_alignment: 1, max_channels_per_pe: max_per_pe };
        let split = DepthwiseConvSplitPe::new(&filter, Some(&bias), params, &narrow, DType::F32).unwrap();
        let single = DepthwiseConvSplitPe::new(&filter, Some(&bias), params, &PeConfig::default(), DType::F32).unwrap();
        prop_assert_eq!(single.num_groups(), 1);
        prop_assert_eq!(split.num_groups(), (channels + max_per_pe - 1) / max_per_pe);

        let a = run(&split, &input);
        let b = run(&single, &input);
        prop_assert_eq!(a.shape(), b.shape());
        prop_assert_eq!(a.as_f32_slice(), b.as_f32_slice());

        let mut reference = Tensor::zeros(b.shape().clone(), DType::F32);
        ops::depthwise_conv2d(&input.view(), &filter.view(), Some(&bias.view()), &params, &mut reference).unwrap();
        prop_assert_eq!(b.as_f32_slice(), reference.as_f32_slice());
    }
}

#[test]
fn test_fp16_pipeline_within_tolerance() {
    let params = Conv2dParams {
        strides: [1, 1],
        paddings: [1, 1],
    };
    let input = ramp(Shape::new(vec![1, 48, 6, 6]), 3, 0.125);
    let filter = ramp(Shape::new(vec![48, 1, 3, 3]), 5, 0.0625);
    let cfg = PeConfig {
        lane_width: 8,
        group_alignment: 8,
        max_channels_per_pe: 16,
    };
    let pe = DepthwiseConvSplitPe::new(&filter, None, params, &cfg, DType::F16).unwrap();
    assert_eq!(pe.num_groups(), 3);

    let half_input = ops::cast(&input.view(), DType::F16).unwrap();
    let out = run(&pe, &half_input);
    assert_eq!(out.dtype(), DType::F16);
    let out = ops::cast(&out.view(), DType::F32).unwrap();

    let mut reference = Tensor::zeros(out.shape().clone(), DType::F32);
    ops::depthwise_conv2d(&input.view(), &filter.view(), None, &params, &mut reference).unwrap();
    for (a, b) in out.as_f32_slice().iter().zip(reference.as_f32_slice()) {
        assert!((a - b).abs() <= 1e-2 * b.abs().max(1.0), "{a} vs {b}");
    }
}
