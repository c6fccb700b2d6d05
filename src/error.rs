use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

// Each pipeline owns its error type so callers can match on the failure kind.
// Internal plumbing (config, process spawning, provider HTTP) keeps using
// `anyhow::Result` for context chains and is folded into these types at the
// pipeline boundary.

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Provider errors ─────────────────────────────────────────────────────────

/// Failures a provider can name precisely. Carried inside `anyhow::Error`
/// and recovered with `downcast_ref` by the retry layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No credential in the environment; every attempt would fail the same way.
    #[error(
        "{provider} API key not set. Export GOOGLE_API_KEY (or GEMINI_API_KEY) \
         with a key from https://aistudio.google.com/app/apikey"
    )]
    MissingCredential { provider: &'static str },

    /// Non-success HTTP response. `body` is already scrubbed and capped.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

// ─── Audit pipeline errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuditError {
    /// No image (or a zero-length one) was supplied.
    #[error("no image provided")]
    MissingImage,

    /// The payload is not an image MIME type.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The generative model failed, timed out, or was unreachable.
    #[error("provider request failed: {0}")]
    Provider(String),

    /// The model's text was not a well-formed report after fence stripping.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl AuditError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImage | Self::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            Self::Provider(_) | Self::MalformedResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to return to a client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingImage => "No image provided",
            Self::UnsupportedMediaType(_) => "Uploaded file is not an image",
            Self::Provider(_) | Self::MalformedResponse(_) => "Failed to analyze image",
        }
    }

    /// Short machine-readable kind used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingImage => "missing_image",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::Provider(_) => "provider_error",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

// ─── Screenshot capture errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("navigation did not settle within {0:?}")]
    NavigationTimeout(Duration),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("rendering context failed: {0}")]
    RenderingContextError(String),

    /// Every rendering context slot stayed busy for the whole wait.
    #[error("all rendering contexts are busy")]
    Busy,
}

impl CaptureError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
            Self::NavigationTimeout(_)
            | Self::NavigationError(_)
            | Self::RenderingContextError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "Invalid URL",
            Self::Busy => "Screenshot service is busy, try again shortly",
            Self::NavigationTimeout(_)
            | Self::NavigationError(_)
            | Self::RenderingContextError(_) => "Failed to capture screenshot",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::NavigationTimeout(_) => "navigation_timeout",
            Self::NavigationError(_) => "navigation_error",
            Self::RenderingContextError(_) => "rendering_context_error",
            Self::Busy => "busy",
        }
    }
}
