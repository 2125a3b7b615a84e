//! Row-major indexing and the two attention layout contracts.
//!
//! Every address the kernels touch is computed through [`offset`], so the
//! permutation each kernel performs can be checked here without running the
//! parallel loops.

use crate::error::{Error, Result};
use crate::tensor::Shape;
use serde::{Deserialize, Serialize};

/// Canonical row-major strides for `dims` (last axis has stride 1).
pub fn row_major_strides<const N: usize>(dims: &[usize; N]) -> [usize; N] {
    let mut strides = [1usize; N];
    for axis in (0..N.saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * dims[axis + 1];
    }
    strides
}

/// Flat element offset of `idx` inside a dense row-major buffer shaped `dims`.
///
/// Indices are not bounds-checked against `dims`; callers index slices with
/// the result, which is.
#[inline]
pub fn offset<const N: usize>(dims: &[usize; N], idx: &[usize; N]) -> usize {
    let mut flat = 0;
    for axis in 0..N {
        flat = flat * dims[axis] + idx[axis];
    }
    flat
}

fn check_positive(what: &str, dims: &[usize]) -> Result<()> {
    if dims.contains(&0) {
        return Err(Error::InvalidShape(format!(
            "{} dimensions must be > 0, got {:?}",
            what, dims
        )));
    }
    Ok(())
}

/// Dimensions of a head-major to sequence-major transpose.
///
/// Input is `(batch, num_heads, seq_len, head_width)`, output is
/// `(batch, seq_len, num_heads, head_width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreDims {
    pub batch: usize,
    pub seq_len: usize,
    pub num_heads: usize,
    pub head_width: usize,
}

impl ScoreDims {
    pub fn new(batch: usize, seq_len: usize, num_heads: usize, head_width: usize) -> Self {
        Self { batch, seq_len, num_heads, head_width }
    }

    /// Take B and S from the output's first two axes and H, W from the
    /// input's second and fourth, then require both shapes to agree.
    pub fn from_shapes(output: &Shape, input: &Shape) -> Result<Self> {
        output.expect_rank("Transpose output", 4)?;
        input.expect_rank("Transpose input", 4)?;

        let dims = Self::new(output.dim(0), output.dim(1), input.dim(1), input.dim(3));
        dims.validate()?;

        if output.dims() != dims.output_dims() || input.dims() != dims.input_dims() {
            return Err(Error::InvalidShape(format!(
                "Transpose shapes disagree: output {:?}, input {:?}",
                output.dims(),
                input.dims()
            )));
        }
        Ok(dims)
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("Transpose", &self.output_dims())
    }

    /// `(B, H, S, W)`
    pub fn input_dims(&self) -> [usize; 4] {
        [self.batch, self.num_heads, self.seq_len, self.head_width]
    }

    /// `(B, S, H, W)`
    pub fn output_dims(&self) -> [usize; 4] {
        [self.batch, self.seq_len, self.num_heads, self.head_width]
    }

    pub fn numel(&self) -> usize {
        self.batch * self.seq_len * self.num_heads * self.head_width
    }

    /// Input offset read for output element `(b, s, h, w)`.
    #[inline]
    pub fn source_offset(&self, b: usize, s: usize, h: usize, w: usize) -> usize {
        offset(&self.input_dims(), &[b, h, s, w])
    }

    #[inline]
    pub fn target_offset(&self, b: usize, s: usize, h: usize, w: usize) -> usize {
        offset(&self.output_dims(), &[b, s, h, w])
    }
}

/// Dimensions of a split (+ bias) transpose of a stacked projection buffer.
///
/// Input is `(batch, seq_len, projections, num_heads, head_width)`, bias is
/// `(projections, num_heads, head_width)` and output is
/// `(projections, batch, num_heads, seq_len, head_width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitDims {
    pub projections: usize,
    pub batch: usize,
    pub seq_len: usize,
    pub num_heads: usize,
    pub head_width: usize,
}

impl SplitDims {
    pub fn new(
        projections: usize,
        batch: usize,
        seq_len: usize,
        num_heads: usize,
        head_width: usize,
    ) -> Self {
        Self { projections, batch, seq_len, num_heads, head_width }
    }

    /// Read all five sizes from the output shape `(P, B, H, S, W)` and require
    /// the input to be `(B, S, P, H, W)`.
    pub fn from_shapes(output: &Shape, input: &Shape) -> Result<Self> {
        output.expect_rank("Split output", 5)?;
        input.expect_rank("Split input", 5)?;

        let dims = Self::new(
            output.dim(0),
            output.dim(1),
            output.dim(3),
            output.dim(2),
            output.dim(4),
        );
        dims.validate()?;

        if input.dims() != dims.input_dims() {
            return Err(Error::InvalidShape(format!(
                "Split input {:?} does not match output {:?}; expected {:?}",
                input.dims(),
                output.dims(),
                dims.input_dims()
            )));
        }
        Ok(dims)
    }

    /// Accepts a bias shaped `(P, H, W)` or flat `(P * H * W)`.
    pub fn check_bias_shape(&self, bias: &Shape) -> Result<()> {
        let expected = self.bias_dims();
        let flat = [self.bias_len()];
        if bias.dims() == expected || bias.dims() == flat {
            Ok(())
        } else {
            Err(Error::InvalidShape(format!(
                "Bias shape {:?} does not match {:?} or {:?}",
                bias.dims(),
                expected,
                flat
            )))
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("Split", &self.output_dims())
    }

    /// `(B, S, P, H, W)`
    pub fn input_dims(&self) -> [usize; 5] {
        [self.batch, self.seq_len, self.projections, self.num_heads, self.head_width]
    }

    /// `(P, H, W)`
    pub fn bias_dims(&self) -> [usize; 3] {
        [self.projections, self.num_heads, self.head_width]
    }

    /// `(P, B, H, S, W)`
    pub fn output_dims(&self) -> [usize; 5] {
        [self.projections, self.batch, self.num_heads, self.seq_len, self.head_width]
    }

    pub fn numel(&self) -> usize {
        self.projections * self.batch * self.seq_len * self.num_heads * self.head_width
    }

    pub fn bias_len(&self) -> usize {
        self.projections * self.num_heads * self.head_width
    }

    #[inline]
    pub fn source_offset(&self, p: usize, b: usize, h: usize, s: usize, w: usize) -> usize {
        offset(&self.input_dims(), &[b, s, p, h, w])
    }

    #[inline]
    pub fn bias_offset(&self, p: usize, h: usize, w: usize) -> usize {
        offset(&self.bias_dims(), &[p, h, w])
    }

    #[inline]
    pub fn target_offset(&self, p: usize, b: usize, h: usize, s: usize, w: usize) -> usize {
        offset(&self.output_dims(), &[p, b, h, s, w])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]), [12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), [1]);
        assert_eq!(row_major_strides(&[2, 1, 3, 1]), [3, 3, 1, 1]);
    }

    #[test]
    fn test_offset_matches_strides() {
        let dims = [2, 3, 4, 5];
        let strides = row_major_strides(&dims);
        let idx = [1, 2, 3, 4];
        let expected: usize = idx.iter().zip(strides.iter()).map(|(i, s)| i * s).sum();
        assert_eq!(offset(&dims, &idx), expected);
        assert_eq!(offset(&dims, &[1, 2, 3, 4]), 119);
        assert_eq!(offset(&dims, &[0, 0, 0, 0]), 0);
    }

    #[test]
    fn test_score_mapping_is_bijection() {
        let dims = ScoreDims::new(2, 3, 4, 2);
        let mut sources = HashSet::new();
        let mut targets = HashSet::new();
        for b in 0..dims.batch {
            for s in 0..dims.seq_len {
                for h in 0..dims.num_heads {
                    for w in 0..dims.head_width {
                        let src = dims.source_offset(b, s, h, w);
                        let dst = dims.target_offset(b, s, h, w);
                        assert!(src < dims.numel());
                        assert!(dst < dims.numel());
                        sources.insert(src);
                        targets.insert(dst);
                    }
                }
            }
        }
        assert_eq!(sources.len(), dims.numel());
        assert_eq!(targets.len(), dims.numel());
    }

    #[test]
    fn test_split_mapping_is_bijection() {
        let dims = SplitDims::new(3, 2, 3, 2, 4);
        let mut sources = HashSet::new();
        let mut targets = HashSet::new();
        for p in 0..dims.projections {
            for b in 0..dims.batch {
                for h in 0..dims.num_heads {
                    for s in 0..dims.seq_len {
                        for w in 0..dims.head_width {
                            sources.insert(dims.source_offset(p, b, h, s, w));
                            targets.insert(dims.target_offset(p, b, h, s, w));
                            assert!(dims.bias_offset(p, h, w) < dims.bias_len());
                        }
                    }
                }
            }
        }
        assert_eq!(sources.len(), dims.numel());
        assert_eq!(targets.len(), dims.numel());
        assert_eq!(sources.iter().max(), Some(&(dims.numel() - 1)));
    }

    #[test]
    fn test_score_dims_from_shapes() {
        let output = Shape::from([2, 3, 4, 5]);
        let input = Shape::from([2, 4, 3, 5]);
        let dims = ScoreDims::from_shapes(&output, &input).unwrap();
        assert_eq!(dims, ScoreDims::new(2, 3, 4, 5));

        // Sequence length disagrees between input and output
        let bad_input = Shape::from([2, 4, 6, 5]);
        assert!(ScoreDims::from_shapes(&output, &bad_input).is_err());

        let wrong_rank = Shape::from([2, 4, 15]);
        assert!(ScoreDims::from_shapes(&output, &wrong_rank).is_err());
    }

    #[test]
    fn test_split_dims_from_shapes() {
        let output = Shape::from([3, 2, 4, 5, 8]);
        let input = Shape::from([2, 5, 3, 4, 8]);
        let dims = SplitDims::from_shapes(&output, &input).unwrap();
        assert_eq!(dims, SplitDims::new(3, 2, 5, 4, 8));

        assert!(dims.check_bias_shape(&Shape::from([3, 4, 8])).is_ok());
        assert!(dims.check_bias_shape(&Shape::from([96])).is_ok());
        assert!(dims.check_bias_shape(&Shape::from([3, 32])).is_err());

        let swapped = Shape::from([2, 3, 5, 4, 8]);
        assert!(SplitDims::from_shapes(&output, &swapped).is_err());
    }

    #[test]
    fn test_zero_dim_rejected() {
        assert!(ScoreDims::new(1, 0, 2, 2).validate().is_err());
        assert!(SplitDims::new(0, 1, 1, 1, 1).validate().is_err());
    }
}
