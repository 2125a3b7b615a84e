//! Core layout primitives for attn-layout
//!
//! This crate provides the pieces the layout kernels are written against:
//! - Tensor shapes and borrowed, non-owning tensor views
//! - The row-major index function shared by every kernel
//! - Shape contracts for the score transpose and the split transposes
//! - Error types

pub mod error;
pub mod layout;
pub mod tensor;

pub use error::{Error, Result};
pub use layout::{offset, row_major_strides, ScoreDims, SplitDims};
pub use tensor::{Shape, TensorView, TensorViewMut};

/// Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
