// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod http_client;
pub mod scrub;
pub mod traits;

// ── Providers and decorators ────────────────────────────────────────────────
pub mod gemini;
pub mod reliable;

pub use gemini::GeminiProvider;
pub use http_client::build_provider_client_with_timeout;
pub use reliable::ReliableProvider;
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::Provider;

use crate::config::Config;

/// Build the configured provider wrapped in retry handling.
pub fn create_provider(config: &Config) -> Box<dyn Provider> {
    let gemini = GeminiProvider::new(
        config.api_key.as_deref(),
        config.provider.api_base_url.as_deref(),
        config.provider.temperature,
        config.provider.max_output_tokens,
        config.provider.timeout_secs,
    );

    Box::new(ReliableProvider::new(
        Box::new(gemini),
        config.reliability.provider_retries,
        config.reliability.provider_backoff_ms,
    ))
}
