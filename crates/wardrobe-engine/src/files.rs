use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::data_url::{decode_data_url, extension_for_mime, sniff_mime_type, to_data_url};

pub const DOWNLOAD_PREFIX: &str = "ai-fashion-tryon";

/// Reads a local image into an inline data URL. Files that are not a
/// recognised image format are rejected.
pub fn inline_image_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let Some(mime_type) = sniff_mime_type(&bytes) else {
        bail!("{} is not a supported image file", path.display());
    };
    Ok(to_data_url(mime_type, &bytes))
}

/// `ai-fashion-tryon-<unix millis>.<ext>`, the extension following `mime_type`.
pub fn download_file_name(mime_type: &str) -> String {
    format!(
        "{DOWNLOAD_PREFIX}-{}.{}",
        Utc::now().timestamp_millis(),
        extension_for_mime(mime_type)
    )
}

/// Writes an inline image to disk. A directory target (existing, or spelled
/// with a trailing separator) gets a timestamped download name; a path
/// without an extension gets one from the MIME type.
pub fn save_data_url(data_url: &str, target: &Path) -> Result<PathBuf> {
    let (mime_type, bytes) = decode_data_url(data_url)?;
    let path = if target.is_dir() || names_directory(target) {
        target.join(download_file_name(&mime_type))
    } else if target.extension().is_none() {
        target.with_extension(extension_for_mime(&mime_type))
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn names_directory(target: &Path) -> bool {
    target
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::is_separator)
}
