use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use banao_contracts::aspect::AspectRatio;
use banao_contracts::errors::{
    InvalidFileError, MissingInputError, EMPTY_RESULT_MESSAGE, GENERATION_FAILED_PREFIX,
};
use banao_contracts::events::{EventPayload, SessionEvents};
use banao_contracts::images::{ingest, ImageSlot, ImageSource, PreviewRegistry};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::state::{SessionSnapshot, SessionState};
use crate::download::{generated_data_uri, save_data_uri};
use crate::providers::{CompositeGenerator, GenerationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The service returned an image; it is now the generated image.
    Generated,
    /// The service answered without an image.
    Empty,
    Failed,
    /// A slot was empty; no request was sent.
    MissingInput,
    /// Another `generate` is still in flight; nothing changed.
    Busy,
}

/// Orchestrates ingestion, generation and download for one user session.
///
/// Safe to share across threads. At most one `generate` runs at a time and
/// the state lock is never held across the network call.
pub struct SessionController {
    state: Mutex<SessionState>,
    previews: PreviewRegistry,
    generator: Box<dyn CompositeGenerator>,
    events: Option<SessionEvents>,
    in_flight: AtomicBool,
}

/// Holds the single-flight flag; on drop it also clears `is_generating`,
/// so an unwinding provider leaves the session idle.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    state: &'a Mutex<SessionState>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a Mutex<SessionState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, state })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_generating = false;
        self.flag.store(false, Ordering::Release);
    }
}

impl SessionController {
    pub fn new(generator: Box<dyn CompositeGenerator>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            previews: PreviewRegistry::new(),
            generator,
            events: None,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_events(mut self, events: SessionEvents) -> Self {
        self.events = Some(events);
        self
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.lock().selected_aspect_ratio
    }

    /// Ingests `source` into `slot`; on failure the previous image stays.
    pub fn set_image(&self, slot: ImageSlot, source: &ImageSource) -> Result<(), InvalidFileError> {
        self.lock().last_error = None;
        let label = source.label();
        match ingest(source, &self.previews) {
            Ok(image) => {
                let media_type = image.media_type().to_string();
                let previous = self.lock().slot_mut(slot).replace(image);
                drop(previous);
                info!(slot = slot.as_str(), %label, %media_type, "image selected");
                self.emit(
                    "image_loaded",
                    json!({
                        "slot": slot.as_str(),
                        "label": label,
                        "media_type": media_type,
                    }),
                );
                Ok(())
            }
            Err(err) => {
                warn!(slot = slot.as_str(), %label, error = %err, "image load failed");
                self.lock().last_error = Some(err.user_message().to_string());
                self.emit(
                    "image_load_failed",
                    json!({
                        "slot": slot.as_str(),
                        "label": label,
                        "error": err.to_string(),
                    }),
                );
                Err(err)
            }
        }
    }

    pub fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) {
        self.lock().selected_aspect_ratio = aspect_ratio;
    }

    pub fn generate(&self) -> GenerateOutcome {
        let Some(_in_flight) = InFlightGuard::acquire(&self.in_flight, &self.state) else {
            warn!("generate ignored; a request is already in flight");
            return GenerateOutcome::Busy;
        };

        let request = {
            let mut state = self.lock();
            let request = match (&state.person_image, &state.style_image) {
                (Some(person), Some(style)) => Some(GenerationRequest {
                    person: person.to_inline(),
                    style: style.to_inline(),
                    aspect_ratio: state.selected_aspect_ratio,
                }),
                _ => None,
            };
            let Some(request) = request else {
                state.last_error = Some(MissingInputError.to_string());
                return GenerateOutcome::MissingInput;
            };
            state.is_generating = true;
            state.last_error = None;
            state.generated_image = None;
            request
        };

        info!(
            provider = self.generator.name(),
            aspect_ratio = request.aspect_ratio.label(),
            "generation started"
        );
        self.emit(
            "generation_started",
            json!({
                "provider": self.generator.name(),
                "aspect_ratio": request.aspect_ratio.label(),
                "person_media_type": request.person.media_type,
                "style_media_type": request.style.media_type,
            }),
        );

        let result = self.generator.request_composite(&request);

        let (outcome, finished) = {
            let mut state = self.lock();
            state.is_generating = false;
            match result {
                Ok(Some(payload)) => {
                    let digest = hex::encode(Sha256::digest(payload.as_bytes()));
                    state.generated_image = Some(generated_data_uri(&payload));
                    (
                        GenerateOutcome::Generated,
                        json!({"status": "image", "payload_sha256": digest}),
                    )
                }
                Ok(None) => {
                    state.last_error = Some(EMPTY_RESULT_MESSAGE.to_string());
                    (GenerateOutcome::Empty, json!({"status": "empty"}))
                }
                Err(err) => {
                    state.last_error = Some(format!("{GENERATION_FAILED_PREFIX}{err}"));
                    (
                        GenerateOutcome::Failed,
                        json!({"status": "failed", "error": err.to_string()}),
                    )
                }
            }
        };
        info!(outcome = ?outcome, "generation finished");
        self.emit("generation_finished", finished);
        outcome
    }

    /// Saves the generated image into `dir`; `None` when there is nothing to save.
    pub fn download(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(data_uri) = self.lock().generated_image.clone() else {
            return Ok(None);
        };
        let path = save_data_uri(&data_uri, dir)?;
        info!(path = %path.display(), "generated image saved");
        self.emit(
            "image_downloaded",
            json!({ "path": path.to_string_lossy() }),
        );
        Ok(Some(path))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: EventPayload = payload.as_object().cloned().unwrap_or_default();
        if let Err(err) = events.emit(event_type, payload) {
            warn!(event_type, error = %err, "failed to append session event");
        }
    }
}
