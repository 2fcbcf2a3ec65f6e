// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for a full predictor pass and for executor preparation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kernels::KernelRegistry;
use model_ir::{Attribute, OpDesc, Program, Scope, VarDesc, Validated};
use runtime::{Executor, ExecutorOptions, Predictor, PredictorConfig, FETCH_VAR};
use tensor_core::{DType, Place, Precision, Shape, Target, Tensor};

/// `fill → fc → relu → fetch` over an `n × n` input.
fn mlp(n: usize) -> (Program<Validated>, Scope) {
    let w: Vec<f32> = (0..n * n).map(|i| ((i % 17) as f32 - 8.0) * 1e-3).collect();
    let mut scope = Scope::new();
    scope.insert("w", Tensor::from_f32(Shape::matrix(n, n), &w).unwrap());

    let vars = vec![
        VarDesc::persistable("w", DType::F32),
        VarDesc::new("x", DType::F32),
        VarDesc::new("h", DType::F32),
        VarDesc::new("y", DType::F32),
        VarDesc::new(FETCH_VAR, DType::F32),
    ];
    let ops = vec![
        OpDesc::new("fill")
            .with_output("Out", ["x"])
            .with_attr("shape", Attribute::Longs(vec![n as i64, n as i64]))
            .with_attr("step", Attribute::Float(1e-3)),
        OpDesc::new("fc")
            .with_input("Input", ["x"])
            .with_input("W", ["w"])
            .with_output("Out", ["h"]),
        OpDesc::new("relu").with_input("X", ["h"]).with_output("Out", ["y"]),
        OpDesc::new("fetch")
            .with_input("X", ["y"])
            .with_output("Out", [FETCH_VAR])
            .with_attr("col", Attribute::Int(0)),
    ];
    (Program::new(vars, ops).validate().unwrap(), scope)
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("predictor_run");
    for n in [32usize, 128, 256] {
        let (program, scope) = mlp(n);
        let config = PredictorConfig::full("unused", Place::new(Target::X86, Precision::Float));
        let mut predictor = Predictor::new(config)
            .unwrap()
            .with_program(program, scope)
            .unwrap()
            .prepare()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("mlp", n), &n, |bench, _| {
            bench.iter(|| black_box(predictor.run().unwrap().num_ops))
        });
    }
    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let registry = KernelRegistry::with_builtins().unwrap();
    let (mut program, _) = mlp(32);
    let host = runtime::HOST_FALLBACK;
    let last = program.num_ops() - 1;
    program.assign_place(last, host).unwrap();
    c.bench_function("executor_prepare", |bench| {
        bench.iter(|| {
            let exec = Executor::prepare(&program, &registry, ExecutorOptions::default()).unwrap();
            black_box(exec.num_ops())
        })
    });
}

criterion_group!(benches, bench_run, bench_prepare);
criterion_main!(benches);
