use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Everything after the first `,`; the input itself when there is no comma.
pub fn extract_base64_payload(data_url: &str) -> &str {
    match data_url.split_once(',') {
        Some((_, payload)) => payload,
        None => data_url,
    }
}

/// Media type declared in a `data:<type>;base64,` prefix, or `image/png`.
pub fn extract_mime_type(data_url: &str) -> String {
    let Some(rest) = data_url.strip_prefix("data:") else {
        return DEFAULT_MIME_TYPE.to_string();
    };
    let header = rest.split(',').next().unwrap_or_default();
    let mime = header.split(';').next().unwrap_or_default().trim();
    if mime.is_empty() || !mime.contains('/') || mime.contains(char::is_whitespace) {
        return DEFAULT_MIME_TYPE.to_string();
    }
    mime.to_ascii_lowercase()
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    if !data_url.starts_with("data:") {
        bail!("not an inline data URL");
    }
    let bytes = BASE64
        .decode(extract_base64_payload(data_url).trim().as_bytes())
        .context("inline image base64 decode failed")?;
    Ok((extract_mime_type(data_url), bytes))
}

/// Media type for raw image bytes, sniffed from their magic numbers.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let lowered = mime_type.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    "png"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_from_data_url_prefix() {
        assert_eq!(extract_mime_type("data:image/jpeg;base64,AAAA"), "image/jpeg");
        assert_eq!(extract_mime_type("data:image/webp,AAAA"), "image/webp");
        assert_eq!(extract_mime_type("not-a-data-url"), "image/png");
        assert_eq!(extract_mime_type("data:;base64,AAAA"), "image/png");
        assert_eq!(extract_mime_type("data:garbage;base64,AAAA"), "image/png");
        assert_eq!(extract_mime_type("https://example.com/a.jpg"), "image/png");
    }

    #[test]
    fn base64_payload_after_first_comma() {
        assert_eq!(extract_base64_payload("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(extract_base64_payload("QUJD"), "QUJD");
        assert_eq!(extract_base64_payload("data:image/png;base64,"), "");
    }

    #[test]
    fn data_url_encode_and_decode_agree() -> anyhow::Result<()> {
        let url = to_data_url("image/gif", b"GIF89a");
        assert!(url.starts_with("data:image/gif;base64,"));
        let (mime, bytes) = decode_data_url(&url)?;
        assert_eq!(mime, "image/gif");
        assert_eq!(bytes, b"GIF89a");
        assert!(decode_data_url("https://example.com/x.png").is_err());
        Ok(())
    }

    #[test]
    fn sniffs_png_magic() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_mime_type(&png_magic), Some("image/png"));
        assert_eq!(sniff_mime_type(b"plain text"), None);
    }

    #[test]
    fn extensions_follow_mime() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/webp"), "webp");
        assert_eq!(extension_for_mime("application/octet-stream"), "png");
    }
}
