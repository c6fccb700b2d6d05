use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 3000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Allow binding to a non-localhost address (default: false)
    #[serde(default)]
    pub allow_public_bind: bool,
    /// Hard cap on request bodies, enforced at the transport layer.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Whole-request timeout, including provider retries.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    180
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            allow_public_bind: false,
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
