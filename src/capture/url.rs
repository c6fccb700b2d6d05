use crate::error::CaptureError;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Parse and check a capture target before any browser work happens.
pub fn validate_url(raw: &str, block_private_hosts: bool) -> Result<Url, CaptureError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CaptureError::InvalidUrl("URL is empty".into()));
    }

    let url = Url::parse(raw).map_err(|e| CaptureError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CaptureError::InvalidUrl(format!(
            "unsupported scheme '{}', only http and https are allowed",
            url.scheme()
        )));
    }

    let Some(host) = url.host() else {
        return Err(CaptureError::InvalidUrl(format!("{raw}: missing host")));
    };

    if block_private_hosts && is_private_host(&host) {
        return Err(CaptureError::InvalidUrl(format!(
            "blocked local/private host: {host}"
        )));
    }

    Ok(url)
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(v4) => is_private_v4(*v4),
        Host::Ipv6(v6) => is_private_v6(*v6),
    }
}

fn is_private_v4(v4: Ipv4Addr) -> bool {
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
}

fn is_private_v6(v6: Ipv6Addr) -> bool {
    let first = v6.segments()[0];
    v6.is_loopback()
        || v6.is_unspecified()
        || (first & 0xfe00) == 0xfc00 // fc00::/7
        || (first & 0xffc0) == 0xfe80 // fe80::/10
        || v6.to_ipv4_mapped().is_some_and(is_private_v4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_urls() {
        let url = validate_url("https://example.com/pricing?plan=pro", false).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(validate_url("  http://example.com  ", false).is_ok());
    }

    #[test]
    fn rejects_non_urls() {
        for raw in ["not a url", "", "   ", "example.com", "/relative/path"] {
            assert!(
                matches!(validate_url(raw, false), Err(CaptureError::InvalidUrl(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_other_schemes() {
        for raw in ["file:///etc/passwd", "javascript:alert(1)", "ftp://example.com", "data:text/html,hi"] {
            assert!(
                matches!(validate_url(raw, false), Err(CaptureError::InvalidUrl(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn private_hosts_allowed_unless_blocked() {
        assert!(validate_url("http://localhost:5173", false).is_ok());
        assert!(validate_url("http://localhost:5173", true).is_err());
        assert!(validate_url("http://127.0.0.1:8080", true).is_err());
        assert!(validate_url("http://10.1.2.3", true).is_err());
        assert!(validate_url("http://169.254.169.254/latest", true).is_err());
        assert!(validate_url("http://[::1]:3000", true).is_err());
        assert!(validate_url("http://app.localhost", true).is_err());
        assert!(validate_url("https://example.com", true).is_ok());
    }

    #[test]
    fn private_ip_ranges() {
        assert!(is_private_v4("192.168.1.1".parse().unwrap()));
        assert!(is_private_v4("172.16.0.1".parse().unwrap()));
        assert!(!is_private_v4("8.8.8.8".parse().unwrap()));
        assert!(is_private_v6("fd00::1".parse().unwrap()));
        assert!(is_private_v6("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!is_private_v6("2606:4700::1111".parse().unwrap()));
    }
}
