use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::ImageReader;

/// Local display-only table of uploaded image bytes.
///
/// Entries live exactly as long as the [`PreviewHandle`] that owns them, so a
/// slot that is re-uploaded or a session that is torn down frees its previews.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, PreviewEntry>>,
}

#[derive(Debug)]
struct PreviewEntry {
    label: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSummary {
    pub label: String,
    pub byte_len: usize,
    pub dimensions: Option<(u32, u32)>,
}

impl PreviewSummary {
    pub fn describe(&self) -> String {
        match self.dimensions {
            Some((width, height)) => format!("{} ({width}x{height})", self.label),
            None => format!("{} ({} bytes)", self.label, self.byte_len),
        }
    }
}

impl RegistryInner {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<u64, PreviewEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, bytes: Vec<u8>, label: impl Into<String>) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries().insert(
            id,
            PreviewEntry {
                label: label.into(),
                bytes,
            },
        );
        PreviewHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn describe(&self, handle: &PreviewHandle) -> Option<PreviewSummary> {
        if !Arc::ptr_eq(&self.inner, &handle.registry) {
            return None;
        }
        handle.summary()
    }
}

/// Opaque reference to an uploaded image, usable only for local display.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    registry: Arc<RegistryInner>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn summary(&self) -> Option<PreviewSummary> {
        let entries = self.registry.entries();
        let entry = entries.get(&self.id)?;
        Some(PreviewSummary {
            label: entry.label.clone(),
            byte_len: entry.bytes.len(),
            dimensions: decoded_dimensions(&entry.bytes),
        })
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.entries().remove(&self.id);
    }
}

fn decoded_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
