use std::env;
use std::fmt;

use banao_contracts::errors::StartupConfigError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];
const API_BASE_VAR: &str = "GEMINI_API_BASE";
const IMAGE_MODEL_VAR: &str = "BANAO_IMAGE_MODEL";

/// Settings the generation client needs at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, StartupConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves settings through `lookup`; a missing credential is fatal.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StartupConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| non_empty(key))
            .ok_or(StartupConfigError::MissingCredential(API_KEY_VARS[0]))?;
        let api_base = non_empty(API_BASE_VAR)
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_empty(IMAGE_MODEL_VAR).unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        Ok(Self {
            api_key,
            api_base,
            model,
        })
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|value| !value.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        if let Some(api_base) = api_base.filter(|value| !value.trim().is_empty()) {
            self.api_base = api_base.trim().trim_end_matches('/').to_string();
        }
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use banao_contracts::errors::StartupConfigError;

    use super::{EngineConfig, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = EngineConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err, StartupConfigError::MissingCredential("GEMINI_API_KEY"));
    }

    #[test]
    fn defaults_apply_with_only_a_key() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(lookup(&[("API_KEY", "k-1")]))?;
        assert_eq!(config.api_key, "k-1");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_IMAGE_MODEL);
        Ok(())
    }

    #[test]
    fn gemini_key_preferred_and_overrides_trimmed() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "primary"),
            ("API_KEY", "fallback"),
            ("GEMINI_API_BASE", "http://localhost:9000/v1/"),
            ("BANAO_IMAGE_MODEL", "gemini-next"),
        ]))?;
        assert_eq!(config.api_key, "primary");
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        assert_eq!(config.model, "gemini-next");

        let overridden = config
            .with_model(Some(" other-model ".to_string()))
            .with_api_base(Some("http://proxy/".to_string()))
            .with_model(None);
        assert_eq!(overridden.model, "other-model");
        assert_eq!(overridden.api_base, "http://proxy");
        Ok(())
    }

    #[test]
    fn debug_output_redacts_key() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "secret-value")]))?;
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("<redacted>"));
        Ok(())
    }
}
