mod ingest;
mod preview;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::errors::InvalidFileError;

pub use ingest::{
    ingest, read_source, ImageSource, LoadedFile, ACCEPTED_MEDIA_TYPES, ADVISORY_MAX_BYTES,
};
pub use preview::{PreviewHandle, PreviewRegistry, PreviewSummary};

pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Which of the two upload slots an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Person,
    Style,
}

impl ImageSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSlot::Person => "person",
            ImageSlot::Style => "style",
        }
    }
}

/// An ingested upload: base64 payload, media type and local preview.
///
/// Never mutated after construction; re-uploading replaces the whole value
/// and dropping it releases the preview.
#[derive(Debug)]
pub struct EncodedImage {
    payload: String,
    media_type: String,
    preview: PreviewHandle,
}

impl EncodedImage {
    /// Splits a `data:<media>;base64,<payload>` read result.
    pub fn from_data_url(data_url: &str, preview: PreviewHandle) -> Result<Self, InvalidFileError> {
        let Some((header, payload)) = data_url.split_once(',') else {
            return Err(InvalidFileError::Malformed(
                "read result has no payload separator".to_string(),
            ));
        };
        if header.is_empty() || payload.is_empty() {
            return Err(InvalidFileError::Malformed(
                "read result is missing its header or payload".to_string(),
            ));
        }
        let media_type = media_type_from_header(header).unwrap_or(DEFAULT_MEDIA_TYPE);
        Ok(Self {
            payload: payload.to_string(),
            media_type: media_type.to_string(),
            preview,
        })
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Copy of the transmittable half; the preview never leaves the process.
    pub fn to_inline(&self) -> InlineImage {
        InlineImage {
            payload: self.payload.clone(),
            media_type: self.media_type.clone(),
        }
    }

    pub fn decoded_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.payload.as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineImage {
    pub payload: String,
    pub media_type: String,
}

fn media_type_from_header(header: &str) -> Option<&str> {
    let (_, rest) = header.split_once(':')?;
    let (media_type, _) = rest.split_once(';')?;
    Some(media_type).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{media_type_from_header, EncodedImage, ImageSlot, PreviewRegistry};
    use crate::errors::InvalidFileError;

    #[test]
    fn parses_header_and_payload() -> anyhow::Result<()> {
        let registry = PreviewRegistry::new();
        let image = EncodedImage::from_data_url(
            "data:image/jpeg;base64,Zm9v",
            registry.allocate(b"foo".to_vec(), "a.jpg"),
        )?;
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.payload(), "Zm9v");
        assert_eq!(image.decoded_bytes()?, b"foo");

        let inline = image.to_inline();
        assert_eq!(inline.payload, "Zm9v");
        assert_eq!(inline.media_type, "image/jpeg");
        Ok(())
    }

    #[test]
    fn malformed_read_results_are_rejected() {
        let registry = PreviewRegistry::new();
        for raw in ["data:image/png;base64", "data:image/png;base64,", ",Zm9v", ""] {
            let err = EncodedImage::from_data_url(raw, registry.allocate(Vec::new(), "x"))
                .unwrap_err();
            assert!(matches!(err, InvalidFileError::Malformed(_)), "{raw}");
        }
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn undeterminable_media_type_defaults_to_octet_stream() -> anyhow::Result<()> {
        assert_eq!(media_type_from_header("data:;base64"), None);
        assert_eq!(media_type_from_header("data:image/png"), None);
        assert_eq!(media_type_from_header("data:image/png;base64"), Some("image/png"));

        let registry = PreviewRegistry::new();
        let image =
            EncodedImage::from_data_url("data:;base64,Zm9v", registry.allocate(Vec::new(), "x"))?;
        assert_eq!(image.media_type(), "application/octet-stream");
        Ok(())
    }

    #[test]
    fn slot_names() {
        assert_eq!(ImageSlot::Person.as_str(), "person");
        assert_eq!(ImageSlot::Style.as_str(), "style");
    }
}
