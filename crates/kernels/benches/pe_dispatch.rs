// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for kernel selection and PE-decomposed depthwise convolution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kernels::pe::{DepthwiseConvSplitPe, PeConfig};
use kernels::KernelRegistry;
use tensor_core::ops::Conv2dParams;
use tensor_core::{DType, Place, Precision, Shape, Target, Tensor};

fn ramp(shape: Shape) -> Tensor {
    let n = shape.num_elements();
    let vals: Vec<f32> = (0..n).map(|i| (i % 89) as f32 * 0.01).collect();
    Tensor::from_f32(shape, &vals).unwrap()
}

fn bench_select(c: &mut Criterion) {
    let registry = KernelRegistry::with_builtins().unwrap();
    let place = Place::new(Target::Arm, Precision::Float);
    c.bench_function("select_fc_cached", |bench| {
        bench.iter(|| black_box(registry.select("fc", &place).unwrap().name))
    });
}

fn bench_dwconv_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("dwconv_pe");
    let channels = 256;
    let input = ramp(Shape::new(vec![1, channels, 28, 28]));
    let filter = ramp(Shape::new(vec![channels, 1, 3, 3]));
    let params = Conv2dParams {
        strides: [1, 1],
        paddings: [1, 1],
    };
    for per_pe in [256usize, 128, 64, 32] {
        let cfg = PeConfig {
            max_channels_per_pe: per_pe,
            ..PeConfig::default()
        };
        let pe = DepthwiseConvSplitPe::new(&filter, None, params, &cfg, DType::F32).unwrap();
        let mut out = Tensor::empty();
        group.bench_with_input(BenchmarkId::new("groups", pe.num_groups()), &per_pe, |bench, _| {
            bench.iter(|| {
                pe.run(&input.view(), &mut out).unwrap();
                black_box(out.size_bytes())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_select, bench_dwconv_groups);
criterion_main!(benches);
