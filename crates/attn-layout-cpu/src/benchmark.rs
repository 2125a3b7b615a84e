//! Self-checking timing harness for the layout kernels
//!
//! Times the single-threaded path against the rayon path on the same data,
//! and refuses to report a speedup unless both produced identical output.

use std::time::Instant;

use attn_layout_core::error::{Error, Result};
use attn_layout_core::layout::{ScoreDims, SplitDims};

use crate::CpuBackend;

/// Problem size and iteration counts for one run.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub batch_size: usize,
    pub seq_len: usize,
    pub num_heads: usize,
    pub head_width: usize,
    /// Stacked projections for the split kernel (3 for Q/K/V)
    pub projections: usize,
    pub iterations: usize,
    pub warmup_iterations: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        // BERT-base attention at a short sequence
        Self {
            batch_size: 1,
            seq_len: 128,
            num_heads: 12,
            head_width: 64,
            projections: 3,
            iterations: 50,
            warmup_iterations: 5,
        }
    }
}

/// Milliseconds per iteration for one kernel.
#[derive(Debug, Clone, Copy)]
pub struct KernelTiming {
    pub serial_ms: f64,
    pub parallel_ms: f64,
}

impl KernelTiming {
    pub fn speedup(&self) -> f64 {
        self.serial_ms / self.parallel_ms
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BenchmarkReport {
    pub transpose: KernelTiming,
    pub split_add_bias: KernelTiming,
}

fn time_ms<F>(iterations: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iterations {
        f()?;
    }
    Ok(start.elapsed().as_secs_f64() * 1000.0 / iterations.max(1) as f64)
}

fn verify_identical(kernel: &str, serial: &[f32], parallel: &[f32]) -> Result<()> {
    if let Some(i) = serial.iter().zip(parallel).position(|(a, b)| a.to_bits() != b.to_bits()) {
        return Err(Error::BackendError(format!(
            "{} diverged at index {}: serial={}, parallel={}",
            kernel, i, serial[i], parallel[i]
        )));
    }
    Ok(())
}

/// Run both kernels serially and in parallel and report the timings.
pub fn run_transpose_benchmark(config: &BenchmarkConfig) -> Result<BenchmarkReport> {
    let serial = CpuBackend::new().with_parallel_threshold(usize::MAX);
    let parallel = CpuBackend::new().with_parallel_threshold(0);

    log::info!(
        "Layout benchmark: batch={}, seq={}, heads={}, width={}, projections={}",
        config.batch_size,
        config.seq_len,
        config.num_heads,
        config.head_width,
        config.projections
    );

    let score = ScoreDims::new(config.batch_size, config.seq_len, config.num_heads, config.head_width);
    let split = SplitDims::new(
        config.projections,
        config.batch_size,
        config.seq_len,
        config.num_heads,
        config.head_width,
    );
    score.validate()?;
    split.validate()?;

    let score_input = generate_input(score.numel());
    let split_input = generate_input(split.numel());
    let bias = generate_input(split.bias_len());
    let mut score_serial = vec![0.0f32; score.numel()];
    let mut score_parallel = vec![0.0f32; score.numel()];
    let mut split_serial = vec![0.0f32; split.numel()];
    let mut split_parallel = vec![0.0f32; split.numel()];

    for _ in 0..config.warmup_iterations {
        parallel.transpose_for_score_slice(&mut score_parallel, &score_input, score)?;
        parallel.split_add_bias_transpose_slice(&mut split_parallel, &split_input, &bias, split)?;
    }

    let transpose = KernelTiming {
        serial_ms: time_ms(config.iterations, || {
            serial.transpose_for_score_slice(&mut score_serial, &score_input, score)
        })?,
        parallel_ms: time_ms(config.iterations, || {
            parallel.transpose_for_score_slice(&mut score_parallel, &score_input, score)
        })?,
    };
    verify_identical("transpose_for_score", &score_serial, &score_parallel)?;

    let split_add_bias = KernelTiming {
        serial_ms: time_ms(config.iterations, || {
            serial.split_add_bias_transpose_slice(&mut split_serial, &split_input, &bias, split)
        })?,
        parallel_ms: time_ms(config.iterations, || {
            parallel.split_add_bias_transpose_slice(&mut split_parallel, &split_input, &bias, split)
        })?,
    };
    verify_identical("split_add_bias_transpose", &split_serial, &split_parallel)?;

    log::info!(
        "transpose_for_score: serial {:.3} ms, parallel {:.3} ms ({:.2}x)",
        transpose.serial_ms,
        transpose.parallel_ms,
        transpose.speedup()
    );
    log::info!(
        "split_add_bias_transpose: serial {:.3} ms, parallel {:.3} ms ({:.2}x)",
        split_add_bias.serial_ms,
        split_add_bias.parallel_ms,
        split_add_bias.speedup()
    );

    Ok(BenchmarkReport { transpose, split_add_bias })
}

/// Deterministic, non-repeating test data
fn generate_input(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32) * 0.01 - 1.0).collect()
}
