use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Chromium-compatible binary. Looked up on `PATH` when unset.
    #[serde(default)]
    pub browser_binary: Option<String>,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Upper bound for navigation plus capture.
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Wall-clock time spent waiting for network idle after `load`. The page
    /// is captured as-is once it runs out.
    #[serde(default = "default_network_idle_budget_ms")]
    pub network_idle_budget_ms: u64,
    #[serde(default = "default_max_concurrent_contexts")]
    pub max_concurrent_contexts: usize,
    /// How long a request waits for a free rendering context before `Busy`.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Pass `--no-sandbox` (needed when running as root in containers).
    #[serde(default)]
    pub disable_sandbox: bool,
    /// Refuse loopback, private and link-local targets.
    #[serde(default)]
    pub block_private_hosts: bool,
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_network_idle_budget_ms() -> u64 {
    5_000
}

fn default_max_concurrent_contexts() -> usize {
    2
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            browser_binary: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            network_idle_budget_ms: default_network_idle_budget_ms(),
            max_concurrent_contexts: default_max_concurrent_contexts(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            disable_sandbox: false,
            block_private_hosts: false,
        }
    }
}
