use mime::Mime;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Sniff the MIME type from magic bytes.
#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|info| info.mime_type())
}

#[must_use]
pub fn detect_mime_from_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Resolve the MIME type of an upload.
///
/// Order: magic bytes, then the client-declared type (unless it is the
/// generic octet-stream), then the file extension.
#[must_use]
pub fn resolve_mime(data: &[u8], declared: Option<&str>, filename: Option<&str>) -> String {
    if let Some(sniffed) = detect_mime(data) {
        return sniffed.to_string();
    }

    let declared = declared
        .and_then(|raw| raw.parse::<Mime>().ok())
        .filter(|m| m.essence_str() != FALLBACK_MIME)
        .map(|m| m.essence_str().to_string());

    declared
        .or_else(|| {
            filename
                .and_then(detect_mime_from_extension)
                .map(String::from)
        })
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

#[must_use]
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .parse::<Mime>()
        .is_ok_and(|m| m.type_() == mime::IMAGE)
}
