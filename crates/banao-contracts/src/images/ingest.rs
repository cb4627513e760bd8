use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, warn};

use super::preview::PreviewRegistry;
use super::EncodedImage;
use crate::errors::InvalidFileError;

pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];
pub const ADVISORY_MAX_BYTES: usize = 10 * 1024 * 1024;

/// A user-selected file, either on disk or already in memory.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes {
        name: String,
        declared_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn label(&self) -> String {
        match self {
            ImageSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Raw read result before it is split into payload and media type.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub label: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl LoadedFile {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64.encode(&self.bytes))
    }
}

pub fn read_source(source: &ImageSource) -> Result<LoadedFile, InvalidFileError> {
    match source {
        ImageSource::Path(path) => {
            let bytes = fs::read(path).map_err(|source| InvalidFileError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let media_type = mime_for_path(path)
                .map(str::to_string)
                .or_else(|| sniff_media_type(&bytes))
                .unwrap_or_default();
            Ok(LoadedFile {
                label: source.label(),
                media_type,
                bytes,
            })
        }
        ImageSource::Bytes {
            name,
            declared_type,
            bytes,
        } => {
            let media_type = declared_type
                .as_deref()
                .and_then(normalize_declared_type)
                .or_else(|| sniff_media_type(bytes))
                .unwrap_or_default();
            Ok(LoadedFile {
                label: name.clone(),
                media_type,
                bytes: bytes.clone(),
            })
        }
    }
}

/// Reads `source`, encodes it and allocates its preview handle.
pub fn ingest(
    source: &ImageSource,
    registry: &PreviewRegistry,
) -> Result<EncodedImage, InvalidFileError> {
    let loaded = read_source(source)?;
    warn_on_advisory_limits(&loaded);
    let data_url = loaded.to_data_url();
    let preview = registry.allocate(loaded.bytes, loaded.label.clone());
    let image = EncodedImage::from_data_url(&data_url, preview)?;
    debug!(
        label = %loaded.label,
        media_type = image.media_type(),
        "image ingested"
    );
    Ok(image)
}

fn warn_on_advisory_limits(loaded: &LoadedFile) {
    if loaded.bytes.len() > ADVISORY_MAX_BYTES {
        warn!(
            label = %loaded.label,
            bytes = loaded.bytes.len(),
            "image exceeds the 10MB upload guidance"
        );
    }
    if !ACCEPTED_MEDIA_TYPES.contains(&loaded.media_type.as_str()) {
        warn!(
            label = %loaded.label,
            media_type = %loaded.media_type,
            "image media type is outside PNG, JPEG, WEBP"
        );
    }
}

pub(crate) fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Keeps the `type/subtype` essence of a caller-supplied type; parameters
/// and anything after a `,` are dropped so the data URL header stays intact.
fn normalize_declared_type(raw: &str) -> Option<String> {
    let essence = raw.split([',', ';']).next().unwrap_or_default().trim();
    let (kind, subtype) = essence.split_once('/')?;
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || "!#$&-^_.+".contains(ch))
    };
    if !is_token(kind) || !is_token(subtype) {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}

fn sniff_media_type(bytes: &[u8]) -> Option<String> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}
