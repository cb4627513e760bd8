mod gemini;

use banao_contracts::aspect::AspectRatio;
use banao_contracts::errors::ApiError;
use banao_contracts::images::InlineImage;

pub use gemini::GeminiClient;

/// Built at the moment `generate` passes its preconditions; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub person: InlineImage,
    pub style: InlineImage,
    pub aspect_ratio: AspectRatio,
}

/// `Ok(Some(payload))` image, `Ok(None)` reachable but empty, `Err` failure.
pub type GenerationResult = Result<Option<String>, ApiError>;

pub trait CompositeGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn request_composite(&self, request: &GenerationRequest) -> GenerationResult;
}
