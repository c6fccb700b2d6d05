use serde::{Deserialize, Serialize};
use std::fmt;

/// An image as received from an upload or produced by a screenshot capture.
///
/// Immutable once constructed; the bytes are only read by [`super::encode`].
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Build a payload from an upload, resolving the MIME type from the
    /// bytes first and falling back to the client-declared type and the
    /// file extension.
    pub fn from_upload(bytes: Vec<u8>, declared_mime: Option<&str>, filename: Option<&str>) -> Self {
        let mime_type = super::detection::resolve_mime(&bytes, declared_mime, filename);
        Self { bytes, mime_type }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Transport-ready form of an [`ImagePayload`]: base64 text plus MIME tag.
///
/// Lives only for the duration of one outbound model request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImagePart {
    pub data: String,
    pub mime_type: String,
}

impl fmt::Debug for EncodedImagePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImagePart")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}
