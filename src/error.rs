//! Error types for batch reframing operations

use thiserror::Error;

/// Result type alias for reframing operations
pub type Result<T> = std::result::Result<T, ReframeError>;

/// Error types for reframing operations
///
/// `InvalidDimensions` and `InvalidConfig` are batch-level: they are raised
/// before any image is touched. `DecodeFailure`, `SegmentationUnavailable` and
/// `EncodeFailure` are scoped to a single image, which is then left out of the
/// batch results.
#[derive(Error, Debug)]
pub enum ReframeError {
    /// Zero-sized source or target canvas
    #[error("Invalid dimensions: {width}x{height} ({context})")]
    InvalidDimensions {
        width: u32,
        height: u32,
        context: &'static str,
    },

    /// Input bytes could not be decoded into a pixel buffer
    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    /// The segmentation backend failed or returned an unusable mask
    #[error("Segmentation unavailable: {0}")]
    SegmentationUnavailable(String),

    /// The canvas could not be encoded to the requested format
    #[error("Failed to encode image: {0}")]
    EncodeFailure(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReframeError {
    /// Create a new invalid dimensions error
    #[must_use]
    pub fn invalid_dimensions(width: u32, height: u32, context: &'static str) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            context,
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::DecodeFailure(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationUnavailable(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::EncodeFailure(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {parameter}: {value}. Valid range: {valid_range}"
        ))
    }

    /// Whether this error is an expected outcome for a single image
    ///
    /// These come from one image's own data or its segmentation. The batch
    /// skips the image either way, but any other error is logged as an
    /// unexpected failure.
    #[must_use]
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailure(_) | Self::SegmentationUnavailable(_) | Self::EncodeFailure(_)
        )
    }
}
