use thiserror::Error;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load image. Please try another file.";
pub const MISSING_INPUT_MESSAGE: &str = "Please upload both images before generating.";
pub const EMPTY_RESULT_MESSAGE: &str =
    "The AI could not generate an image from the provided inputs. Please try again with different images.";
pub const GENERATION_FAILED_PREFIX: &str = "Generation failed: ";
pub const API_FAILURE_MESSAGE: &str = "Failed to generate image due to an API error.";

/// The selected file could not be turned into an encoded payload.
#[derive(Debug, Error)]
pub enum InvalidFileError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid file format: {0}")]
    Malformed(String),
}

impl InvalidFileError {
    /// Message shown in the session error slot.
    pub fn user_message(&self) -> &'static str {
        LOAD_FAILED_MESSAGE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", MISSING_INPUT_MESSAGE)]
pub struct MissingInputError;

/// Normalized transport or service failure.
///
/// `Display` is always the fixed message; `detail` keeps the underlying
/// cause chain for logs only.
#[derive(Debug, Clone, Error)]
#[error("{}", API_FAILURE_MESSAGE)]
pub struct ApiError {
    detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Required configuration is absent; the client must not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupConfigError {
    #[error("{0} environment variable is not set.")]
    MissingCredential(&'static str),
}
