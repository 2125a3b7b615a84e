//! CPU backend for attn-layout
//!
//! Provides parallel, vector-friendly kernels that move activations between
//! the linear-projection layout and the multi-head attention layout.

pub mod benchmark;
pub mod kernels;
pub mod transpose;

pub use transpose::{
    split_add_bias_transpose_for_score, split_add_bias_transpose_slice,
    split_transpose_for_score, split_transpose_slice, transpose_for_score,
    transpose_for_score_slice,
};

use attn_layout_core::error::{Error, Result};

/// Outputs smaller than this many elements are filled on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 16 * 1024;

/// CPU backend configuration
#[derive(Debug, Clone)]
pub struct CpuBackend {
    /// Number of threads to use (0 = auto-detect)
    pub num_threads: usize,
    /// Enable SIMD optimizations
    pub use_simd: bool,
    /// Minimum output size (in elements) before work is split across threads
    pub parallel_threshold: usize,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self {
            num_threads: 0, // Auto-detect
            use_simd: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn with_simd(mut self, enabled: bool) -> Self {
        self.use_simd = enabled;
        self
    }

    pub fn with_parallel_threshold(mut self, elements: usize) -> Self {
        self.parallel_threshold = elements;
        self
    }

    /// Thread count the backend will run with.
    pub fn effective_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            num_cpus::get()
        }
    }

    pub fn init(&self) -> Result<()> {
        // Initialize rayon thread pool if specified
        if self.num_threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .build_global()
                .map_err(|e| Error::BackendError(e.to_string()))?;
        }
        log::debug!(
            "CPU backend ready: threads={}, simd={}, parallel_threshold={}",
            self.effective_threads(),
            self.use_simd,
            self.parallel_threshold
        );
        Ok(())
    }
}
