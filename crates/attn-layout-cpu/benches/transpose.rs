use attn_layout_core::layout::{ScoreDims, SplitDims};
use attn_layout_cpu::CpuBackend;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// BERT-base geometry: 12 heads of width 64
const NUM_HEADS: usize = 12;
const HEAD_WIDTH: usize = 64;

fn bench_transpose_for_score(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transpose_for_score");
    group.sample_size(20);
    let backend = CpuBackend::default();

    for seq_len in [10, 20, 128, 512] {
        let dims = ScoreDims::new(2, seq_len, NUM_HEADS, HEAD_WIDTH);
        let input = vec![0.5f32; dims.numel()];
        let mut output = vec![0.0f32; dims.numel()];

        group.bench_with_input(BenchmarkId::from_parameter(seq_len), &seq_len, |bencher, _| {
            bencher.iter(|| {
                backend
                    .transpose_for_score_slice(black_box(&mut output), black_box(&input), dims)
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn bench_split_add_bias(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("split_add_bias_transpose");
    group.sample_size(20);

    for (label, use_simd) in [("chunked", true), ("scalar", false)] {
        let backend = CpuBackend::new().with_simd(use_simd);
        for seq_len in [20, 128, 512] {
            let dims = SplitDims::new(3, 2, seq_len, NUM_HEADS, HEAD_WIDTH);
            let input = vec![0.5f32; dims.numel()];
            let bias = vec![0.1f32; dims.bias_len()];
            let mut output = vec![0.0f32; dims.numel()];

            group.bench_with_input(BenchmarkId::new(label, seq_len), &seq_len, |bencher, _| {
                bencher.iter(|| {
                    backend
                        .split_add_bias_transpose_slice(
                            black_box(&mut output),
                            black_box(&input),
                            black_box(&bias),
                            dims,
                        )
                        .unwrap();
                });
            });
        }
    }

    group.finish();
}

fn bench_serial_vs_parallel(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("split_add_bias_dispatch");
    group.sample_size(20);

    let dims = SplitDims::new(3, 8, 128, NUM_HEADS, HEAD_WIDTH);
    let input = vec![0.5f32; dims.numel()];
    let bias = vec![0.1f32; dims.bias_len()];
    let mut output = vec![0.0f32; dims.numel()];

    for (label, threshold) in [("serial", usize::MAX), ("parallel", 0)] {
        let backend = CpuBackend::new().with_parallel_threshold(threshold);
        group.bench_function(label, |bencher| {
            bencher.iter(|| {
                backend
                    .split_add_bias_transpose_slice(
                        black_box(&mut output),
                        black_box(&input),
                        black_box(&bias),
                        dims,
                    )
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_transpose_for_score, bench_split_add_bias, bench_serial_vs_parallel);
criterion_main!(benches);
