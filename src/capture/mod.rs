//! Website screenshot capture: URL validation, a bounded pool of headless
//! rendering contexts, and the Chromium backend behind it.

mod cdp;
pub mod chrome;
pub mod service;
pub mod traits;
pub mod url;

pub use chrome::ChromeBrowser;
pub use service::{CAPTURE_MIME, ScreenshotService};
pub use traits::{Browser, RenderingContext, Viewport};
pub use self::url::validate_url;
