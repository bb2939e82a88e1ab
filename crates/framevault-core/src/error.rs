//! Error types for FrameVault.

use crate::frame::PixelFormat;
use thiserror::Error;

/// Main error type for FrameVault operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for FrameVault operations.
pub type Result<T> = std::result::Result<T, CacheError>;
