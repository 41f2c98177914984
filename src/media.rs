//! MIME type resolution for uploaded payloads.

pub const OCTET_STREAM: &str = "application/octet-stream";

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

/// Prefers the client-reported type; sniffs the payload only when none was sent.
pub fn resolve_mime_type(reported: Option<&str>, bytes: &[u8]) -> String {
    if let Some(reported) = reported {
        let essence = reported.split(';').next().unwrap_or(reported).trim();
        if !essence.is_empty() {
            return reported.trim().to_string();
        }
    }
    detect_mime_type(bytes).unwrap_or(OCTET_STREAM).to_string()
}

/// Builds `data:<mime>;base64,<payload>`.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    use base64::Engine as _;
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{payload}")
}
