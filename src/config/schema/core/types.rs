use super::super::{CaptureConfig, GatewayConfig, ProviderConfig, ReliabilityConfig};
use crate::capture::ScreenshotService;
use crate::error::ConfigError;
use crate::llm::ReliableProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Provider credential. Only ever populated from the environment and
    /// never written back to disk.
    #[serde(skip)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("config_path", &self.config_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("provider", &self.provider)
            .field("reliability", &self.reliability)
            .field("gateway", &self.gateway)
            .field("capture", &self.capture)
            .finish()
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Validation("provider.model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Validation(format!(
                "provider.temperature must be within 0.0..=2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.max_output_tokens == 0 {
            return Err(ConfigError::Validation(
                "provider.max_output_tokens must be positive".into(),
            ));
        }
        if let Some(base) = self.provider.api_base_url.as_deref()
            && url::Url::parse(base).is_err()
        {
            return Err(ConfigError::Validation(format!(
                "provider.api_base_url is not a valid URL: {base}"
            )));
        }
        if self.gateway.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "gateway.max_upload_bytes must be positive".into(),
            ));
        }
        if self.capture.viewport_width == 0 || self.capture.viewport_height == 0 {
            return Err(ConfigError::Validation(
                "capture viewport dimensions must be positive".into(),
            ));
        }
        if self.capture.max_concurrent_contexts == 0 {
            return Err(ConfigError::Validation(
                "capture.max_concurrent_contexts must be at least 1".into(),
            ));
        }
        if self.capture.navigation_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "capture.navigation_timeout_secs must be positive".into(),
            ));
        }

        // Each pipeline has to give up before the transport timeout fires.
        let request_timeout = Duration::from_secs(self.gateway.request_timeout_secs);
        let audit = self.audit_budget();
        if request_timeout <= audit {
            return Err(ConfigError::Validation(format!(
                "gateway.request_timeout_secs ({}s) must exceed the worst-case audit time ({audit:?}); \
                 lower provider.timeout_secs or reliability.provider_retries",
                self.gateway.request_timeout_secs
            )));
        }
        let capture = self.capture_budget();
        if request_timeout <= capture {
            return Err(ConfigError::Validation(format!(
                "gateway.request_timeout_secs ({}s) must exceed the worst-case capture time ({capture:?}); \
                 lower capture.navigation_timeout_secs or capture.acquire_timeout_secs",
                self.gateway.request_timeout_secs
            )));
        }
        Ok(())
    }

    /// Upper bound on one audit's model call, every retry included.
    pub fn audit_budget(&self) -> Duration {
        ReliableProvider::worst_case(
            Duration::from_secs(self.provider.timeout_secs.max(1)),
            self.reliability.provider_retries,
            self.reliability.provider_backoff_ms,
        )
    }

    /// Upper bound on one screenshot capture.
    pub fn capture_budget(&self) -> Duration {
        ScreenshotService::worst_case(&self.capture)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert_eq!(config.reliability.provider_retries, 2);
        assert_eq!(config.capture.viewport_width, 1280);
        assert_eq!(config.gateway.port, 3000);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = Config {
            api_key: Some("AIzaSy-very-secret".into()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIzaSy-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn api_key_is_never_serialized() {
        let config = Config {
            api_key: Some("AIzaSy-very-secret".into()),
            ..Config::default()
        };
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("AIzaSy-very-secret"));
        assert!(!toml.contains("api_key"));
    }

    #[test]
    fn toml_api_key_is_ignored() {
        let config: Config = toml::from_str("api_key = \"from-file\"\n").unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.capture.max_concurrent_contexts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.provider.api_base_url = Some("not a url".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_budgets_fit_inside_the_request_timeout() {
        let config = Config::default();
        let request_timeout = Duration::from_secs(config.gateway.request_timeout_secs);

        assert_eq!(config.audit_budget(), Duration::from_millis(3 * 45_000 + 500 + 1_000));
        assert!(config.audit_budget() < request_timeout);
        assert!(config.capture_budget() < request_timeout);
    }

    #[test]
    fn validate_rejects_request_timeout_inside_audit_budget() {
        // 3 x 60s + 1.5s of backoff overruns 180s.
        let mut config = Config::default();
        config.provider.timeout_secs = 60;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("gateway.request_timeout_secs"));
        assert!(err.contains("audit"));

        config.gateway.request_timeout_secs = 200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_request_timeout_inside_capture_budget() {
        let mut config = Config::default();
        config.gateway.request_timeout_secs = 150;
        config.capture.navigation_timeout_secs = 120;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("capture"));
    }
}
