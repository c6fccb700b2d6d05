use designlens::config::Config;

pub fn render_status(config: &Config) -> String {
    let browser = config
        .capture
        .browser_binary
        .as_deref()
        .unwrap_or("(auto-detect)");

    let lines = [
        "◆ DesignLens status".to_string(),
        String::new(),
        format!("Version      {}", env!("CARGO_PKG_VERSION")),
        format!("Config       {}", config.config_path.display()),
        String::new(),
        format!("  Model        {}", config.provider.model),
        format!(
            "  API key      {}",
            if config.has_api_key() { "set" } else { "missing (GOOGLE_API_KEY)" }
        ),
        format!(
            "  Retries      {} (backoff {}ms)",
            config.reliability.provider_retries, config.reliability.provider_backoff_ms
        ),
        String::new(),
        format!(
            "  Gateway      {}:{}",
            config.gateway.host, config.gateway.port
        ),
        format!("  Upload cap   {} bytes", config.gateway.max_upload_bytes),
        String::new(),
        format!("  Browser      {browser}"),
        format!(
            "  Viewport     {}x{}",
            config.capture.viewport_width, config.capture.viewport_height
        ),
        format!(
            "  Contexts     {} concurrent",
            config.capture.max_concurrent_contexts
        ),
    ];
    lines.join("\n")
}
