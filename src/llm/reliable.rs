use super::scrub::scrub_secret_patterns;
use super::traits::Provider;
use crate::error::ProviderError;
use crate::media::EncodedImagePart;
use reqwest::StatusCode;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 10_000;

/// Check if an error is non-retryable (failures that won't resolve with retries).
/// Only typed statuses are trusted; numbers inside free-form messages are not.
fn is_non_retryable(err: &anyhow::Error) -> bool {
    if let Some(provider_err) = err.downcast_ref::<ProviderError>() {
        return match provider_err {
            ProviderError::MissingCredential { .. } => true,
            ProviderError::Api { status, body, .. } => {
                is_quota_exhausted(body) || is_permanent_status(*status)
            }
        };
    }

    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>()
        && let Some(status) = reqwest_err.status()
    {
        return is_permanent_status(status);
    }

    is_quota_exhausted(&format!("{err:#}"))
}

fn is_permanent_status(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::TOO_MANY_REQUESTS
        && status != StatusCode::REQUEST_TIMEOUT
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    (lower.contains("resource_exhausted") && lower.contains("quota"))
        || lower.contains("exceeded your current quota")
        || lower.contains("billing")
}

/// Provider wrapper that retries transient failures with exponential
/// backoff. Only the provider call is retried; parsing happens outside.
pub struct ReliableProvider {
    inner: Box<dyn Provider>,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl ReliableProvider {
    pub fn new(inner: Box<dyn Provider>, max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff_ms: base_backoff_ms.max(50),
        }
    }

    /// Longest a `generate` call can take when every attempt runs into
    /// `attempt_timeout`, including the sleeps between attempts.
    pub fn worst_case(attempt_timeout: Duration, max_retries: u32, base_backoff_ms: u64) -> Duration {
        let attempts = attempt_timeout.saturating_mul(max_retries.saturating_add(1));
        let mut sleeps = Duration::ZERO;
        let mut backoff_ms = base_backoff_ms.max(50);
        for _ in 0..max_retries {
            sleeps = sleeps.saturating_add(Duration::from_millis(backoff_ms));
            backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
        }
        attempts.saturating_add(sleeps)
    }
}

impl Provider for ReliableProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(provider = self.inner.name(), "Warming up provider connection pool");
            if let Err(e) = self.inner.warmup().await {
                tracing::warn!(provider = self.inner.name(), "Warmup failed (non-fatal): {e}");
            }
            Ok(())
        })
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        image: &'a EncodedImagePart,
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let provider_name = self.inner.name();
            let mut failures = Vec::new();
            let mut backoff_ms = self.base_backoff_ms;

            for attempt in 0..=self.max_retries {
                match self.inner.generate(prompt, image, model).await {
                    Ok(text) => {
                        if attempt > 0 {
                            tracing::info!(
                                provider = provider_name,
                                attempt,
                                "Provider recovered after retries"
                            );
                        }
                        return Ok(text);
                    }
                    Err(e) => {
                        let detail = scrub_secret_patterns(&format!("{e:#}")).into_owned();
                        tracing::warn!(
                            provider = provider_name,
                            attempt = attempt + 1,
                            error = %detail,
                            "Provider attempt failed"
                        );
                        failures.push(format!(
                            "attempt {}/{}: {detail}",
                            attempt + 1,
                            self.max_retries + 1
                        ));

                        if is_non_retryable(&e) {
                            tracing::warn!(provider = provider_name, "Non-retryable provider error");
                            break;
                        }

                        if attempt < self.max_retries {
                            tracing::warn!(
                                provider = provider_name,
                                attempt = attempt + 1,
                                max_retries = self.max_retries,
                                backoff_ms,
                                "Provider call failed, retrying"
                            );
                            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                            backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                        }
                    }
                }
            }

            anyhow::bail!("{provider_name} failed. Attempts:\n{}", failures.join("\n"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        calls: Arc<AtomicUsize>,
        fail_until_attempt: usize,
        error: fn() -> anyhow::Error,
    }

    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            _image: &'a EncodedImagePart,
            _model: &'a str,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
            Box::pin(async move {
                let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt <= self.fail_until_attempt {
                    return Err((self.error)());
                }
                Ok("{\"score\": 90}".to_string())
            })
        }
    }

    fn image() -> EncodedImagePart {
        EncodedImagePart {
            data: "iVBORw0KGgo=".into(),
            mime_type: "image/png".into(),
        }
    }

    fn flaky(
        calls: &Arc<AtomicUsize>,
        fail_until_attempt: usize,
        error: fn() -> anyhow::Error,
    ) -> Box<dyn Provider> {
        Box::new(FlakyProvider {
            calls: Arc::clone(calls),
            fail_until_attempt,
            error,
        })
    }

    fn api(status: u16, body: &str) -> anyhow::Error {
        ProviderError::Api {
            provider: "Gemini".into(),
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
        }
        .into()
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ReliableProvider::new(flaky(&calls, 0, || anyhow::anyhow!("boom")), 2, 1);

        let text = provider.generate("p", &image(), "m").await.unwrap();
        assert_eq!(text, "{\"score\": 90}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failure_then_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ReliableProvider::new(flaky(&calls, 1, || api(503, "overloaded")), 2, 1);

        provider.generate("p", &image(), "m").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ReliableProvider::new(
            flaky(&calls, usize::MAX, || anyhow::anyhow!("connection reset")),
            2,
            1,
        );

        let err = provider.generate("p", &image(), "m").await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let msg = err.to_string();
        assert!(msg.contains("attempt 1/3"));
        assert!(msg.contains("attempt 3/3"));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ReliableProvider::new(
            flaky(&calls, usize::MAX, || api(400, "image too large")),
            3,
            1,
        );

        assert!(provider.generate("p", &image(), "m").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credential_is_tried_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ReliableProvider::new(
            flaky(&calls, usize::MAX, || {
                ProviderError::MissingCredential { provider: "Gemini" }.into()
            }),
            3,
            1,
        );

        let err = provider.generate("p", &image(), "m").await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("API key not set"));
        assert!(!err.to_string().contains("attempt 2/4"));
    }

    #[tokio::test]
    async fn attempt_log_is_scrubbed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ReliableProvider::new(
            flaky(&calls, usize::MAX, || {
                anyhow::anyhow!("request for key=AIzaSyLeaky123 reset by peer")
            }),
            1,
            1,
        );

        let msg = provider.generate("p", &image(), "m").await.unwrap_err().to_string();
        assert!(!msg.contains("AIzaSyLeaky123"));
        assert!(msg.contains("reset by peer"));
    }

    #[test]
    fn worst_case_adds_attempts_and_capped_backoff() {
        assert_eq!(
            ReliableProvider::worst_case(Duration::from_secs(45), 2, 500),
            Duration::from_millis(3 * 45_000 + 500 + 1_000)
        );
        assert_eq!(
            ReliableProvider::worst_case(Duration::from_secs(1), 0, 500),
            Duration::from_secs(1)
        );
        // 5_000 + 10_000 (capped) + 10_000
        assert_eq!(
            ReliableProvider::worst_case(Duration::from_secs(1), 3, 5_000),
            Duration::from_millis(4_000 + 25_000)
        );
    }

    #[test]
    fn non_retryable_uses_typed_statuses() {
        assert!(is_non_retryable(&api(400, "bad image")));
        assert!(is_non_retryable(&api(403, "forbidden")));
        assert!(is_non_retryable(&api(404, "no such model")));
        assert!(!is_non_retryable(&api(429, "slow down")));
        assert!(!is_non_retryable(&api(408, "request timeout")));
        assert!(!is_non_retryable(&api(500, "internal")));
        assert!(!is_non_retryable(&api(503, "overloaded")));
        assert!(is_non_retryable(&api(
            429,
            "RESOURCE_EXHAUSTED: quota exceeded for this project"
        )));
        assert!(is_non_retryable(
            &ProviderError::MissingCredential { provider: "Gemini" }.into()
        ));
    }

    #[test]
    fn incidental_numbers_in_messages_are_retried() {
        assert!(!is_non_retryable(&anyhow::anyhow!(
            "connection reset after 404 bytes"
        )));
        assert!(!is_non_retryable(&anyhow::anyhow!(
            "Gemini returned no text (finish reason: MAX_TOKENS) after 412 ms"
        )));
        assert!(!is_non_retryable(&anyhow::anyhow!("timeout")));
        assert!(is_non_retryable(&anyhow::anyhow!(
            "You exceeded your current quota, please check your plan"
        )));
    }

    #[test]
    fn typed_status_survives_added_context() {
        let err = api(401, "unauthenticated").context("calling generateContent");
        assert!(is_non_retryable(&err));
    }
}
