//! Viewport error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewportError {
    #[error("Rendering context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("Viewport is not mounted")]
    NotMounted,
    #[error("Fullscreen request denied: {0}")]
    FullscreenDenied(String),
    #[error("Frame capture failed: {0}")]
    Capture(String),
    #[error("Captured frame is empty")]
    EmptyFrame,
    #[error("Frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ViewportError>;
