//! Email validation for lead capture.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use concierge_core::config::ValidationConfig;

/// Format check covering the common address shapes. The domain must have
/// at least one dot, so bare hostnames like `bob@notreal` are rejected.
pub fn is_valid_format(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
        )
        .unwrap()
    });
    re.is_match(email)
}

/// Full validation: format check plus the optional resolver probe.
///
/// The domain probe is best-effort and off by default; when it cannot
/// reach a resolver the address is accepted on format alone.
pub async fn validate_email(email: &str, config: &ValidationConfig) -> bool {
    if !is_valid_format(email) {
        return false;
    }

    if config.check_domain_resolves {
        let domain = match email.rsplit_once('@') {
            Some((_, domain)) => domain,
            None => return false,
        };
        match tokio::net::lookup_host((domain, 25)).await {
            Ok(mut addrs) => {
                if addrs.next().is_none() {
                    debug!(domain, "email domain did not resolve");
                    return false;
                }
            }
            Err(err) => {
                debug!(domain, %err, "domain lookup unavailable; accepting on format");
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        assert!(is_valid_format("jane@example.com"));
        assert!(is_valid_format("jane.doe+tag@mail.example.co.uk"));
        assert!(is_valid_format("x_1@sub.domain.io"));
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        assert!(!is_valid_format(""));
        assert!(!is_valid_format("no-at-sign"));
        assert!(!is_valid_format("@example.com"));
        assert!(!is_valid_format("jane@"));
        assert!(!is_valid_format("jane@notreal"));
        assert!(!is_valid_format("jane doe@example.com"));
        assert!(!is_valid_format("jane@exam ple.com"));
        assert!(!is_valid_format("jane@-example.com"));
    }

    #[tokio::test]
    async fn test_validate_without_domain_check_is_format_only() {
        let config = ValidationConfig {
            check_domain_resolves: false,
        };
        assert!(validate_email("jane@definitely-not-a-real-tld.zzz", &config).await);
        assert!(!validate_email("bob@notreal", &config).await);
    }
}
