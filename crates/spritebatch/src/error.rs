//! Batcher error types.

use thiserror::Error;

use crate::render2d::ImageId;

#[derive(Debug, Error)]
pub enum BatchError {
    /// A draw or setup call named an identifier that was never registered.
    #[error("unknown resource: {0}")]
    UnknownResource(ImageId),

    /// The typeface behind a font atlas could not be loaded or built.
    #[error("font asset error for {id}: {reason}")]
    FontAsset { id: ImageId, reason: String },

    /// A single tint batch would exceed the 16-bit index ceiling.
    #[error("index overflow: batch already holds {quads} quads (limit {limit})")]
    IndexOverflow { quads: usize, limit: usize },

    /// The image has no pixel dimensions or backend handle yet.
    #[error("{0} is not realized")]
    NotRealized(ImageId),

    /// Configuration that is only valid before realization was changed afterwards,
    /// or was applied to the wrong kind of image.
    #[error("config error: {0}")]
    Config(String),

    /// Pixels or a typeface could not be read or decoded.
    #[error("asset error for '{path}': {reason}")]
    Asset { path: String, reason: String },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BatchError>;
