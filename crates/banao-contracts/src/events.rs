use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// One line of the session trail. Payload keys sit beside the header fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl SessionEvent {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// Append-only JSONL trail for one compositing session.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    shared: Arc<Trail>,
}

#[derive(Debug)]
struct Trail {
    path: PathBuf,
    session_id: String,
    append: Mutex<()>,
}

impl SessionEvents {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Trail {
                path: path.into(),
                session_id: session_id.into(),
                append: Mutex::new(()),
            }),
        }
    }

    /// Opens a trail with a fresh random session id.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self::new(path, uuid::Uuid::new_v4().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Payload keys named `type`, `session_id` or `ts` are dropped.
    pub fn emit(&self, event_type: &str, mut payload: EventPayload) -> anyhow::Result<SessionEvent> {
        for reserved in ["type", "session_id", "ts"] {
            payload.remove(reserved);
        }
        let event = SessionEvent {
            kind: event_type.to_string(),
            session_id: self.shared.session_id.clone(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            payload,
        };
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let path = &self.shared.path;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let _append = self
            .shared
            .append
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(&line))
            .with_context(|| format!("failed to append to {}", path.display()))?;
        Ok(event)
    }
}

/// Reads a trail back; unparseable lines are skipped.
pub fn read_events(path: &Path) -> anyhow::Result<Vec<SessionEvent>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
