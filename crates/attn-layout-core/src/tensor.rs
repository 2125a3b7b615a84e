use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tensor shape (dimensions)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Size of dimension `axis`.
    ///
    /// Panics if `axis >= ndim()`, like slice indexing.
    pub fn dim(&self, axis: usize) -> usize {
        self.0[axis]
    }

    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Validates shape dimensions
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidShape("Shape cannot be empty".into()));
        }
        if self.0.contains(&0) {
            return Err(Error::InvalidShape("Shape dimensions must be > 0".into()));
        }
        Ok(())
    }

    /// Returns an error unless this shape has exactly `rank` dimensions.
    pub fn expect_rank(&self, what: &str, rank: usize) -> Result<()> {
        if self.ndim() != rank {
            return Err(Error::InvalidShape(format!(
                "{} must be {}-D, got {:?}",
                what, rank, self.0
            )));
        }
        Ok(())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

/// Read-only view over a caller-owned row-major buffer.
///
/// The view borrows the data for `'a` and never outlives or reallocates it.
#[derive(Debug)]
pub struct TensorView<'a, T> {
    shape: &'a Shape,
    data: &'a [T],
}

impl<T> Clone for TensorView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TensorView<'_, T> {}

impl<'a, T> TensorView<'a, T> {
    /// Pair a shape with its buffer.
    ///
    /// Fails if the shape is invalid or the buffer length is not the product
    /// of the dimensions.
    pub fn new(shape: &'a Shape, data: &'a [T]) -> Result<Self> {
        shape.validate()?;
        if data.len() != shape.numel() {
            return Err(Error::size_mismatch("Tensor buffer", shape.numel(), data.len()));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    pub fn data(&self) -> &'a [T] {
        self.data
    }
}

/// Mutable view over a caller-owned row-major buffer.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    shape: &'a Shape,
    data: &'a mut [T],
}

impl<'a, T> TensorViewMut<'a, T> {
    pub fn new(shape: &'a Shape, data: &'a mut [T]) -> Result<Self> {
        shape.validate()?;
        if data.len() != shape.numel() {
            return Err(Error::size_mismatch("Tensor buffer", shape.numel(), data.len()));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    pub fn data(&self) -> &[T] {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Reborrow as a read-only view.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView { shape: self.shape, data: &*self.data }
    }
}
