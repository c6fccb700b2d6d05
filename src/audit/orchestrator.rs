use super::parse::parse_report;
use super::prompt::AuditPrompt;
use super::report::AuditReport;
use crate::error::AuditError;
use crate::llm::{Provider, scrub_secret_patterns};
use crate::media::{ImagePayload, encode};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs one image through prompt → model → parse and returns a report or a
/// typed failure. Holds no per-request state.
pub struct Auditor {
    provider: Arc<dyn Provider>,
    model: String,
    prompt: &'static AuditPrompt,
    timeout: Option<Duration>,
}

impl Auditor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            prompt: AuditPrompt::current(),
            timeout: None,
        }
    }

    /// Bound the whole model call, retries included. A call still running
    /// when the limit passes is dropped and reported as a provider failure.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt_version(&self) -> &'static str {
        self.prompt.version
    }

    /// Open the provider connection pool ahead of the first request.
    pub async fn warmup(&self) {
        if let Err(e) = self.provider.warmup().await {
            tracing::warn!("Provider warmup failed (non-fatal): {e}");
        }
    }

    pub async fn audit(&self, image: Option<ImagePayload>) -> Result<AuditReport, AuditError> {
        let Some(image) = image else {
            return Err(AuditError::MissingImage);
        };

        let part = encode(&image)?;
        drop(image);

        tracing::debug!(
            provider = self.provider.name(),
            model = self.model.as_str(),
            prompt_version = self.prompt.version,
            mime_type = part.mime_type.as_str(),
            "Submitting image for audit"
        );

        let started = Instant::now();
        let call = self.provider.generate(self.prompt.text, &part, &self.model);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AuditError::Provider(format!("model did not answer within {limit:?}")))?,
            None => call.await,
        };
        let raw = outcome
            .map_err(|e| AuditError::Provider(scrub_secret_patterns(&format!("{e:#}")).into_owned()))?;

        let report = parse_report(&raw)?;

        tracing::info!(
            model = self.model.as_str(),
            score = report.score,
            issues = report.issues.len(),
            recommendations = report.recommendations.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Audit completed"
        );
        Ok(report)
    }
}
