use crate::error::CaptureError;
use async_trait::async_trait;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Launches isolated rendering contexts. One context serves one capture.
#[async_trait]
pub trait Browser: Send + Sync {
    fn name(&self) -> &str;

    async fn launch(&self) -> Result<Box<dyn RenderingContext>, CaptureError>;
}

/// A single isolated page. Dropping it must release the underlying
/// resources too; `close` is the orderly path.
#[async_trait]
pub trait RenderingContext: Send {
    /// Navigate, let the page settle, and return a full-page PNG.
    async fn navigate_and_capture(
        &mut self,
        url: &Url,
        viewport: Viewport,
    ) -> Result<Vec<u8>, CaptureError>;

    async fn close(self: Box<Self>);
}
