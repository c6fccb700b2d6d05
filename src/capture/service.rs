use super::chrome::ChromeBrowser;
use super::traits::{Browser, Viewport};
use super::url::validate_url;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::media::ImagePayload;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// The one raster format every capture is returned in.
pub const CAPTURE_MIME: &str = "image/png";

/// Ceiling for starting a rendering context and attaching to its page.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);
/// Ceiling for tearing a rendering context down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns a URL into a full-page screenshot, bounding both the number of
/// live rendering contexts and the time each one may spend on a page.
pub struct ScreenshotService {
    browser: Arc<dyn Browser>,
    permits: Semaphore,
    viewport: Viewport,
    navigation_timeout: Duration,
    acquire_timeout: Duration,
    launch_timeout: Duration,
    block_private_hosts: bool,
}

impl ScreenshotService {
    pub fn new(browser: Arc<dyn Browser>, config: &CaptureConfig) -> Self {
        Self {
            browser,
            permits: Semaphore::new(config.max_concurrent_contexts.max(1)),
            viewport: Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
            },
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            launch_timeout: LAUNCH_TIMEOUT,
            block_private_hosts: config.block_private_hosts,
        }
    }

    #[must_use]
    pub fn with_launch_timeout(mut self, limit: Duration) -> Self {
        self.launch_timeout = limit;
        self
    }

    /// Longest a `capture` call can take under `config`: waiting for a slot,
    /// starting the browser, navigating and tearing down.
    pub fn worst_case(config: &CaptureConfig) -> Duration {
        Duration::from_secs(config.acquire_timeout_secs)
            .saturating_add(LAUNCH_TIMEOUT)
            .saturating_add(Duration::from_secs(config.navigation_timeout_secs))
            .saturating_add(CLOSE_TIMEOUT)
    }

    /// Service backed by headless Chromium.
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(Arc::new(ChromeBrowser::from_config(config)), config)
    }

    pub async fn capture(&self, raw_url: &str) -> Result<ImagePayload, CaptureError> {
        let url = validate_url(raw_url, self.block_private_hosts)?;

        let _permit = match tokio::time::timeout(self.acquire_timeout, self.permits.acquire()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(CaptureError::RenderingContextError(
                    "capture service is shutting down".into(),
                ));
            }
            Err(_) => return Err(CaptureError::Busy),
        };

        let started = Instant::now();
        let mut context = tokio::time::timeout(self.launch_timeout, self.browser.launch())
            .await
            .map_err(|_| {
                CaptureError::RenderingContextError(format!(
                    "browser did not start within {:?}",
                    self.launch_timeout
                ))
            })??;

        let outcome = match tokio::time::timeout(
            self.navigation_timeout,
            context.navigate_and_capture(&url, self.viewport),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CaptureError::NavigationTimeout(self.navigation_timeout)),
        };

        if tokio::time::timeout(CLOSE_TIMEOUT, context.close()).await.is_err() {
            tracing::warn!(url = %url, "Rendering context did not close within {CLOSE_TIMEOUT:?}");
        }

        let bytes = outcome?;
        if bytes.is_empty() {
            return Err(CaptureError::RenderingContextError(
                "browser produced an empty capture".into(),
            ));
        }

        tracing::info!(
            url = %url,
            browser = self.browser.name(),
            bytes = bytes.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Screenshot captured"
        );
        Ok(ImagePayload::new(bytes, CAPTURE_MIME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::RenderingContext;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Hang,
        HangLaunch,
        FailNavigation,
        Empty,
    }

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        closed: AtomicUsize,
        live: AtomicUsize,
        peak_live: AtomicUsize,
    }

    struct StubBrowser {
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    struct StubContext {
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Browser for StubBrowser {
        fn name(&self) -> &str {
            "stub"
        }

        async fn launch(&self) -> Result<Box<dyn RenderingContext>, CaptureError> {
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            if matches!(self.behavior, Behavior::HangLaunch) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak_live.fetch_max(live, Ordering::SeqCst);
            Ok(Box::new(StubContext {
                behavior: self.behavior,
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    #[async_trait]
    impl RenderingContext for StubContext {
        async fn navigate_and_capture(
            &mut self,
            _url: &Url,
            _viewport: Viewport,
        ) -> Result<Vec<u8>, CaptureError> {
            match self.behavior {
                Behavior::Succeed => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(b"\x89PNG\r\n\x1a\n".to_vec())
                }
                Behavior::Hang | Behavior::HangLaunch => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
                Behavior::FailNavigation => Err(CaptureError::NavigationError(
                    "net::ERR_CONNECTION_REFUSED".into(),
                )),
                Behavior::Empty => Ok(Vec::new()),
            }
        }

        async fn close(self: Box<Self>) {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn service(behavior: Behavior, config: &CaptureConfig) -> (ScreenshotService, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let browser = Arc::new(StubBrowser {
            behavior,
            counters: Arc::clone(&counters),
        });
        (ScreenshotService::new(browser, config), counters)
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            navigation_timeout_secs: 1,
            acquire_timeout_secs: 1,
            ..CaptureConfig::default()
        }
    }

    #[tokio::test]
    async fn invalid_url_fails_before_launch() {
        let (service, counters) = service(Behavior::Succeed, &fast_config());

        let err = service.capture("not a url").await.unwrap_err();

        assert!(matches!(err, CaptureError::InvalidUrl(_)));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_returns_png_and_closes_context() {
        let (service, counters) = service(Behavior::Succeed, &fast_config());

        let image = service.capture("https://example.com").await.unwrap();

        assert_eq!(image.mime_type(), CAPTURE_MIME);
        assert!(image.bytes().starts_with(b"\x89PNG"));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigation_timeout_still_releases_context() {
        let (service, counters) = service(Behavior::Hang, &fast_config());

        let err = service.capture("https://slow.example.com").await.unwrap_err();

        assert!(matches!(err, CaptureError::NavigationTimeout(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn navigation_error_releases_context() {
        let (service, counters) = service(Behavior::FailNavigation, &fast_config());

        let err = service.capture("http://localhost:1").await.unwrap_err();

        assert!(matches!(err, CaptureError::NavigationError(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_capture_is_an_error_not_an_image() {
        let (service, counters) = service(Behavior::Empty, &fast_config());

        let err = service.capture("https://example.com").await.unwrap_err();

        assert!(matches!(err, CaptureError::RenderingContextError(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_contexts_are_capped() {
        let config = CaptureConfig {
            max_concurrent_contexts: 2,
            acquire_timeout_secs: 5,
            ..fast_config()
        };
        let (service, counters) = service(Behavior::Succeed, &config);
        let service = Arc::new(service);

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.capture(&format!("https://example.com/{i}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(counters.launched.load(Ordering::SeqCst), 6);
        assert!(counters.peak_live.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn saturated_service_reports_busy() {
        let config = CaptureConfig {
            max_concurrent_contexts: 1,
            acquire_timeout_secs: 0,
            navigation_timeout_secs: 5,
            ..CaptureConfig::default()
        };
        let (service, _counters) = service(Behavior::Hang, &config);
        let service = Arc::new(service);

        let holder = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.capture("https://example.com/a").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = service.capture("https://example.com/b").await.unwrap_err();
        assert!(matches!(err, CaptureError::Busy));

        holder.abort();
    }

    #[tokio::test]
    async fn private_hosts_can_be_blocked() {
        let config = CaptureConfig {
            block_private_hosts: true,
            ..fast_config()
        };
        let (service, counters) = service(Behavior::Succeed, &config);

        let err = service.capture("http://127.0.0.1:8080").await.unwrap_err();

        assert!(matches!(err, CaptureError::InvalidUrl(_)));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stalled_launch_is_bounded() {
        let (service, counters) = service(Behavior::HangLaunch, &fast_config());
        let service = service.with_launch_timeout(Duration::from_millis(50));

        let started = Instant::now();
        let err = service.capture("https://example.com").await.unwrap_err();

        assert!(matches!(err, CaptureError::RenderingContextError(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        // The slot is free again.
        assert_eq!(service.permits.available_permits(), fast_config().max_concurrent_contexts);
    }

    #[test]
    fn worst_case_covers_every_stage() {
        let config = CaptureConfig::default();
        assert_eq!(
            ScreenshotService::worst_case(&config),
            Duration::from_secs(10 + 20 + 30 + 10)
        );
    }
}
