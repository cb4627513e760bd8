use anyhow::{bail, Context, Result};
use banao_contracts::errors::ApiError;
use banao_contracts::images::InlineImage;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{CompositeGenerator, GenerationRequest, GenerationResult};
use crate::config::EngineConfig;
use crate::prompt::composite_instruction;

pub struct GeminiClient {
    api_base: String,
    api_key: String,
    model: String,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_http_client(config, HttpClient::new())
    }

    pub fn with_http_client(config: &EngineConfig, http: HttpClient) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            http,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// Person image, style image, then the instruction, in that order.
    fn build_payload(request: &GenerationRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    inline_part(&request.person),
                    inline_part(&request.style),
                    { "text": composite_instruction(request.aspect_ratio) },
                ],
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"],
            },
        })
    }

    fn post(&self, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint();
        debug!(%endpoint, "posting composite request");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error(response)
    }

    /// Payload of the first part carrying inline data in the first candidate.
    fn first_inline_image(response_payload: &Value) -> Option<String> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)?;
        let inline = parts.iter().find_map(|part| {
            part.get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
        })?;
        inline
            .get("data")
            .and_then(Value::as_str)
            .filter(|data| !data.is_empty())
            .map(str::to_string)
    }
}

impl CompositeGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn request_composite(&self, request: &GenerationRequest) -> GenerationResult {
        let payload = Self::build_payload(request);
        match self.post(&payload) {
            Ok(response_payload) => Ok(Self::first_inline_image(&response_payload)),
            Err(err) => {
                let detail = error_chain_text(&err, 1024);
                error!(model = %self.model, %detail, "error calling Gemini API");
                Err(ApiError::new(detail))
            }
        }
    }
}

fn inline_part(image: &InlineImage) -> Value {
    json!({
        "inlineData": {
            "data": image.payload,
            "mimeType": image.media_type,
        }
    })
}

fn response_json_or_error(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .context("Gemini response body read failed")?;
    if !status.is_success() {
        bail!("Gemini request failed ({code}): {}", truncate_text(&body, 512));
    }
    let parsed: Value =
        serde_json::from_str(&body).context("Gemini returned invalid JSON payload")?;
    Ok(parsed)
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
