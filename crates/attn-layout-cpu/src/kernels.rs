/// Row-level element kernels used by the layout transposes.
///
/// Each kernel works on one W-wide run. The chunked variants process
/// `LANES` elements per step so the compiler can keep them in vector
/// registers; the scalar variants are plain indexed loops. Both produce
/// bit-identical results.
use std::ops::Add;

/// Elements handled per step by the chunked paths (one AVX register of f32).
pub const LANES: usize = 8;

/// Copy `src` into `dst`. Both must have the same length.
#[inline]
pub fn copy_row<T: Copy>(dst: &mut [T], src: &[T], use_simd: bool) {
    debug_assert_eq!(dst.len(), src.len());
    if use_simd {
        dst.copy_from_slice(src);
    } else {
        copy_row_scalar(dst, src);
    }
}

#[inline]
#[allow(clippy::needless_range_loop)]
fn copy_row_scalar<T: Copy>(dst: &mut [T], src: &[T]) {
    for i in 0..dst.len() {
        dst[i] = src[i];
    }
}

/// `dst[i] = src[i] + bias[i]` over one run.
#[inline]
pub fn add_bias_row<T>(dst: &mut [T], src: &[T], bias: &[T], use_simd: bool)
where
    T: Copy + Add<Output = T>,
{
    debug_assert_eq!(dst.len(), src.len());
    debug_assert_eq!(dst.len(), bias.len());
    if use_simd {
        add_bias_row_chunked(dst, src, bias);
    } else {
        add_bias_row_scalar(dst, src, bias);
    }
}

#[inline]
fn add_bias_row_chunked<T>(dst: &mut [T], src: &[T], bias: &[T])
where
    T: Copy + Add<Output = T>,
{
    let mut dst_chunks = dst.chunks_exact_mut(LANES);
    let mut src_chunks = src.chunks_exact(LANES);
    let mut bias_chunks = bias.chunks_exact(LANES);

    for ((d, s), b) in (&mut dst_chunks).zip(&mut src_chunks).zip(&mut bias_chunks) {
        for lane in 0..LANES {
            d[lane] = s[lane] + b[lane];
        }
    }

    // Tail shorter than one lane group
    for ((d, &s), &b) in dst_chunks
        .into_remainder()
        .iter_mut()
        .zip(src_chunks.remainder())
        .zip(bias_chunks.remainder())
    {
        *d = s + b;
    }
}

#[inline]
#[allow(clippy::needless_range_loop)]
fn add_bias_row_scalar<T>(dst: &mut [T], src: &[T], bias: &[T])
where
    T: Copy + Add<Output = T>,
{
    for i in 0..dst.len() {
        dst[i] = src[i] + bias[i];
    }
}
