use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GOOGLE_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY"))
            && !key.trim().is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("DESIGNLENS_MODEL")
            && !model.is_empty()
        {
            self.provider.model = model;
        }

        if let Ok(base) = std::env::var("DESIGNLENS_API_BASE_URL")
            && !base.is_empty()
        {
            self.provider.api_base_url = Some(base);
        }

        if let Ok(port_str) =
            std::env::var("DESIGNLENS_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) =
            std::env::var("DESIGNLENS_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(browser) = std::env::var("DESIGNLENS_BROWSER")
            && !browser.is_empty()
        {
            self.capture.browser_binary = Some(browser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_env::{ENV_LOCK, EnvVarGuard};
    use super::*;

    #[test]
    fn google_key_wins_over_gemini_key() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _google = EnvVarGuard::set("GOOGLE_API_KEY", "google-key");
        let _gemini = EnvVarGuard::set("GEMINI_API_KEY", "gemini-key");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.api_key.as_deref(), Some("google-key"));
    }

    #[test]
    fn gemini_key_is_the_fallback() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _google = EnvVarGuard::unset("GOOGLE_API_KEY");
        let _gemini = EnvVarGuard::set("GEMINI_API_KEY", "gemini-key");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.api_key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn gateway_and_capture_overrides() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _port = EnvVarGuard::set("DESIGNLENS_GATEWAY_PORT", "4100");
        let _host = EnvVarGuard::set("DESIGNLENS_GATEWAY_HOST", "0.0.0.0");
        let _browser = EnvVarGuard::set("DESIGNLENS_BROWSER", "/opt/chrome/chrome");
        let _model = EnvVarGuard::set("DESIGNLENS_MODEL", "gemini-1.5-flash");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.gateway.port, 4100);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.capture.browser_binary.as_deref(), Some("/opt/chrome/chrome"));
        assert_eq!(config.provider.model, "gemini-1.5-flash");
    }

    #[test]
    fn unparsable_port_is_ignored() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _port = EnvVarGuard::set("DESIGNLENS_GATEWAY_PORT", "not-a-port");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.gateway.port, 3000);
    }
}
