use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const GENERATED_IMAGE_PREFIX: &str = "data:image/png;base64,";
pub const DOWNLOAD_FILE_NAME: &str = "BanaO_generated_image.png";

/// Displayable form of a returned payload.
pub fn generated_data_uri(payload: &str) -> String {
    format!("{GENERATED_IMAGE_PREFIX}{payload}")
}

pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>> {
    let Some((header, payload)) = data_uri.split_once(',') else {
        bail!("generated image is not a data URI");
    };
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        bail!("generated image data URI is not base64 encoded");
    }
    BASE64
        .decode(payload.as_bytes())
        .context("generated image base64 decode failed")
}

/// Writes the decoded image as [`DOWNLOAD_FILE_NAME`] inside `dir`.
pub fn save_data_uri(data_uri: &str, dir: &Path) -> Result<PathBuf> {
    let bytes = decode_data_uri(data_uri)?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(DOWNLOAD_FILE_NAME);
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{decode_data_uri, generated_data_uri, save_data_uri, DOWNLOAD_FILE_NAME};

    #[test]
    fn data_uri_uses_fixed_png_prefix() {
        assert_eq!(generated_data_uri("Zm9v"), "data:image/png;base64,Zm9v");
    }

    #[test]
    fn save_writes_decoded_bytes_under_fixed_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().join("exports");
        let path = save_data_uri(&generated_data_uri("Zm9v"), &dir)?;
        assert_eq!(path, dir.join(DOWNLOAD_FILE_NAME));
        assert_eq!(std::fs::read(path)?, b"foo");
        Ok(())
    }

    #[test]
    fn rejects_non_base64_uris() {
        assert!(decode_data_uri("Zm9v").is_err());
        assert!(decode_data_uri("data:image/png,Zm9v").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
    }
}
