//! Layout transposes between projection and multi-head attention layouts
//!
//! - `transpose_for_score`: `(B, H, S, W)` -> `(B, S, H, W)`
//! - `split_add_bias_transpose_for_score`: `(B, S, P, H, W)` + bias `(P, H, W)`
//!   -> `(P, B, H, S, W)` in a single pass
//! - `split_transpose_for_score`: the same split without a bias term
//!
//! The output is carved into disjoint contiguous slabs and each slab is
//! filled by exactly one task, so no two tasks ever write the same element.
//! Inputs and bias are only read.

use std::ops::Add;

use attn_layout_core::error::{Error, Result};
use attn_layout_core::layout::{ScoreDims, SplitDims};
use attn_layout_core::tensor::{TensorView, TensorViewMut};
use rayon::prelude::*;

use crate::kernels::{add_bias_row, copy_row};
use crate::CpuBackend;

fn check_len(what: &str, buf_len: usize, expected: usize) -> Result<()> {
    if buf_len != expected {
        return Err(Error::size_mismatch(what, expected, buf_len));
    }
    Ok(())
}

/// Hand each `slab_len` chunk of `output` to `fill` along with its index,
/// on the rayon pool when `parallel` is set, otherwise on this thread.
fn for_each_slab<T, F>(output: &mut [T], slab_len: usize, parallel: bool, fill: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if parallel {
        output
            .par_chunks_mut(slab_len)
            .enumerate()
            .for_each(|(idx, slab)| fill(idx, slab));
    } else {
        output.chunks_mut(slab_len).enumerate().for_each(|(idx, slab)| fill(idx, slab));
    }
}

impl CpuBackend {
    fn run_parallel(&self, numel: usize) -> bool {
        numel >= self.parallel_threshold
    }

    /// Head-major to sequence-major transpose on raw buffers.
    ///
    /// `input` is `(B, H, S, W)`, `output` is `(B, S, H, W)`, and
    /// `output[b, s, h, w] = input[b, h, s, w]`.
    pub fn transpose_for_score_slice<T>(
        &self,
        output: &mut [T],
        input: &[T],
        dims: ScoreDims,
    ) -> Result<()>
    where
        T: Copy + Send + Sync,
    {
        dims.validate()?;
        check_len("Transpose input", input.len(), dims.numel())?;
        check_len("Transpose output", output.len(), dims.numel())?;

        let ScoreDims { seq_len, num_heads, head_width, .. } = dims;
        let parallel = self.run_parallel(dims.numel());
        let use_simd = self.use_simd;
        log::trace!("transpose_for_score {:?} parallel={}", dims, parallel);

        // One slab per (b, s): the H * W row at output[b, s, .., ..]
        for_each_slab(output, num_heads * head_width, parallel, |idx, slab| {
            let batch_idx = idx / seq_len;
            let seq_idx = idx % seq_len;
            for (head_idx, dst) in slab.chunks_exact_mut(head_width).enumerate() {
                let src = dims.source_offset(batch_idx, seq_idx, head_idx, 0);
                copy_row(dst, &input[src..src + head_width], use_simd);
            }
        });

        Ok(())
    }

    /// Split a stacked projection buffer, add the per-projection bias and
    /// transpose into head-major layout, all in one pass.
    ///
    /// `input` is `(B, S, P, H, W)`, `bias` is `P * H * W` values laid out as
    /// `(P, H, W)`, `output` is `(P, B, H, S, W)`.
    pub fn split_add_bias_transpose_slice<T>(
        &self,
        output: &mut [T],
        input: &[T],
        bias: &[T],
        dims: SplitDims,
    ) -> Result<()>
    where
        T: Copy + Add<Output = T> + Send + Sync,
    {
        check_len("Bias", bias.len(), dims.bias_len())?;
        let use_simd = self.use_simd;
        let width = dims.head_width;

        self.split_transpose_with(output, input, dims, |p, h, src, dst| {
            let b = dims.bias_offset(p, h, 0);
            add_bias_row(dst, src, &bias[b..b + width], use_simd);
        })
    }

    /// Split a stacked projection buffer and transpose each projection into
    /// head-major layout without adding a bias.
    pub fn split_transpose_slice<T>(
        &self,
        output: &mut [T],
        input: &[T],
        dims: SplitDims,
    ) -> Result<()>
    where
        T: Copy + Send + Sync,
    {
        let use_simd = self.use_simd;
        self.split_transpose_with(output, input, dims, |_, _, src, dst| {
            copy_row(dst, src, use_simd);
        })
    }

    /// Shared loop of the split kernels. `row(p, h, src, dst)` fills one
    /// W-wide output run from the matching input run.
    fn split_transpose_with<T, F>(
        &self,
        output: &mut [T],
        input: &[T],
        dims: SplitDims,
        row: F,
    ) -> Result<()>
    where
        T: Copy + Send + Sync,
        F: Fn(usize, usize, &[T], &mut [T]) + Send + Sync,
    {
        dims.validate()?;
        check_len("Split input", input.len(), dims.numel())?;
        check_len("Split output", output.len(), dims.numel())?;

        let SplitDims { batch, num_heads, seq_len, head_width, .. } = dims;
        let parallel = self.run_parallel(dims.numel());
        log::trace!("split_transpose {:?} parallel={}", dims, parallel);

        // One slab per (p, b, h): the S * W block at output[p, b, h, .., ..]
        for_each_slab(output, seq_len * head_width, parallel, |idx, slab| {
            let weight_idx = idx / (batch * num_heads);
            let batch_idx = idx / num_heads % batch;
            let head_idx = idx % num_heads;
            for (seq_idx, dst) in slab.chunks_exact_mut(head_width).enumerate() {
                let src = dims.source_offset(weight_idx, batch_idx, head_idx, seq_idx, 0);
                row(weight_idx, head_idx, &input[src..src + head_width], dst);
            }
        });

        Ok(())
    }

    /// [`transpose_for_score_slice`](Self::transpose_for_score_slice) on
    /// tensor views. B and S come from the output, H and W from the input,
    /// and both shapes must agree.
    pub fn transpose_for_score<T>(
        &self,
        output: &mut TensorViewMut<'_, T>,
        input: &TensorView<'_, T>,
    ) -> Result<()>
    where
        T: Copy + Send + Sync,
    {
        let dims = ScoreDims::from_shapes(output.shape(), input.shape())?;
        self.transpose_for_score_slice(output.data_mut(), input.data(), dims)
    }

    /// [`split_add_bias_transpose_slice`](Self::split_add_bias_transpose_slice)
    /// on tensor views. All five sizes come from the output shape
    /// `(P, B, H, S, W)`; the bias may be `(P, H, W)` or flat.
    pub fn split_add_bias_transpose_for_score<T>(
        &self,
        output: &mut TensorViewMut<'_, T>,
        input: &TensorView<'_, T>,
        bias: &TensorView<'_, T>,
    ) -> Result<()>
    where
        T: Copy + Add<Output = T> + Send + Sync,
    {
        let dims = SplitDims::from_shapes(output.shape(), input.shape())?;
        dims.check_bias_shape(bias.shape())?;
        self.split_add_bias_transpose_slice(output.data_mut(), input.data(), bias.data(), dims)
    }

    pub fn split_transpose_for_score<T>(
        &self,
        output: &mut TensorViewMut<'_, T>,
        input: &TensorView<'_, T>,
    ) -> Result<()>
    where
        T: Copy + Send + Sync,
    {
        let dims = SplitDims::from_shapes(output.shape(), input.shape())?;
        self.split_transpose_slice(output.data_mut(), input.data(), dims)
    }
}

/// Head-major to sequence-major transpose with the default backend.
pub fn transpose_for_score<T>(
    output: &mut TensorViewMut<'_, T>,
    input: &TensorView<'_, T>,
) -> Result<()>
where
    T: Copy + Send + Sync,
{
    CpuBackend::default().transpose_for_score(output, input)
}

/// Fused split + bias add + transpose with the default backend.
pub fn split_add_bias_transpose_for_score<T>(
    output: &mut TensorViewMut<'_, T>,
    input: &TensorView<'_, T>,
    bias: &TensorView<'_, T>,
) -> Result<()>
where
    T: Copy + Add<Output = T> + Send + Sync,
{
    CpuBackend::default().split_add_bias_transpose_for_score(output, input, bias)
}

/// Split + transpose with the default backend.
pub fn split_transpose_for_score<T>(
    output: &mut TensorViewMut<'_, T>,
    input: &TensorView<'_, T>,
) -> Result<()>
where
    T: Copy + Send + Sync,
{
    CpuBackend::default().split_transpose_for_score(output, input)
}

pub fn transpose_for_score_slice<T>(output: &mut [T], input: &[T], dims: ScoreDims) -> Result<()>
where
    T: Copy + Send + Sync,
{
    CpuBackend::default().transpose_for_score_slice(output, input, dims)
}

pub fn split_add_bias_transpose_slice<T>(
    output: &mut [T],
    input: &[T],
    bias: &[T],
    dims: SplitDims,
) -> Result<()>
where
    T: Copy + Add<Output = T> + Send + Sync,
{
    CpuBackend::default().split_add_bias_transpose_slice(output, input, bias, dims)
}

pub fn split_transpose_slice<T>(output: &mut [T], input: &[T], dims: SplitDims) -> Result<()>
where
    T: Copy + Send + Sync,
{
    CpuBackend::default().split_transpose_slice(output, input, dims)
}
