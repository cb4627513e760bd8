pub mod config;
pub mod download;
pub mod prompt;
pub mod providers;
pub mod session;

pub use config::EngineConfig;
pub use providers::{CompositeGenerator, GeminiClient, GenerationRequest, GenerationResult};
pub use session::{GenerateOutcome, SessionController, SessionSnapshot, SlotSummary};
