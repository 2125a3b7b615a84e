use thiserror::Error;

/// Core error types for attn-layout
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tensor shape: {0}")]
    InvalidShape(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

impl Error {
    /// Shorthand for a buffer whose length disagrees with its declared shape.
    pub fn size_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        Error::InvalidShape(format!(
            "{} size mismatch: expected {}, got {}",
            what, expected, actual
        ))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
