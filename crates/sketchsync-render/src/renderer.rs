//! Renderer errors.

use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;
