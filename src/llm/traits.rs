use crate::media::EncodedImagePart;
use std::future::Future;
use std::pin::Pin;

/// A multimodal text generator: one prompt plus one image in, raw text out.
///
/// Implementations return the model's text untouched; turning it into a
/// report is the caller's job.
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "gemini").
    fn name(&self) -> &str;

    /// Send the prompt text followed by the image, in that order, as a
    /// single user turn.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        image: &'a EncodedImagePart,
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

    /// Warm up the HTTP connection pool.
    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }
}
