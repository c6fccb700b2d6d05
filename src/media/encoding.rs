use super::detection::is_image_mime;
use super::types::{EncodedImagePart, ImagePayload};
use crate::error::AuditError;
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode an image for inline transport to the model.
///
/// Pure and deterministic. No size cap is applied here; the provider
/// enforces its own limits and reports them as errors.
pub fn encode(image: &ImagePayload) -> Result<EncodedImagePart, AuditError> {
    if image.is_empty() {
        return Err(AuditError::MissingImage);
    }
    if !is_image_mime(image.mime_type()) {
        return Err(AuditError::UnsupportedMediaType(image.mime_type().to_string()));
    }

    Ok(EncodedImagePart {
        data: STANDARD.encode(image.bytes()),
        mime_type: image.mime_type().to_string(),
    })
}
