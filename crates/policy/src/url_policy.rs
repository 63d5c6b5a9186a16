use url::Url;

use crate::error::UrlPolicyError;

const DISALLOWED_SCHEMES: [&str; 3] = ["chrome", "file", "about"];

/// Host allow/denylist check for a [`UrlPolicy`]: entries match the exact host
/// or any subdomain of it (`example.com` matches `example.com` and
/// `*.example.com`).
fn host_matches(host: &str, entry: &str) -> bool {
    host.eq_ignore_ascii_case(entry) || host.to_ascii_lowercase().ends_with(&format!(".{}", entry.to_ascii_lowercase()))
}

/// Allow/deny host lists plus the scheme gate, evaluated at session creation
/// and again on every `navigate` action under the deterministic policy mode.
#[derive(Clone, Debug, Default)]
pub struct UrlPolicy {
    pub allowlist: Vec<String>,
    pub denylist: Vec<String>,
}

impl UrlPolicy {
    pub fn new(allowlist: Vec<String>, denylist: Vec<String>) -> Self {
        Self { allowlist, denylist }
    }

    /// Validates scheme then host. Scheme order: an explicitly disallowed
    /// scheme (`chrome`/`file`/`about`) reports `DISALLOWED_SCHEME`; any other
    /// scheme outside `{http, https}` reports `INVALID_SCHEME`.
    pub fn validate(&self, raw_url: &str) -> Result<Url, UrlPolicyError> {
        let parsed = Url::parse(raw_url).map_err(|_| UrlPolicyError::InvalidUrl)?;
        let scheme = parsed.scheme();

        if DISALLOWED_SCHEMES.contains(&scheme) {
            return Err(UrlPolicyError::DisallowedScheme);
        }
        if scheme != "http" && scheme != "https" {
            return Err(UrlPolicyError::InvalidScheme);
        }

        let host = parsed.host_str().ok_or(UrlPolicyError::InvalidUrl)?;

        if self.denylist.iter().any(|entry| host_matches(host, entry)) {
            return Err(UrlPolicyError::DomainDenied);
        }
        if !self.allowlist.is_empty() && !self.allowlist.iter().any(|entry| host_matches(host, entry)) {
            return Err(UrlPolicyError::DomainNotAllowed);
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_unsupported_scheme_is_invalid_scheme() {
        let policy = UrlPolicy::default();
        let err = policy.validate("ftp://example.com").unwrap_err();
        assert_eq!(err, UrlPolicyError::InvalidScheme);
    }

    #[test]
    fn explicitly_disallowed_scheme_is_distinct_code() {
        let policy = UrlPolicy::default();
        assert_eq!(
            policy.validate("file:///etc/passwd").unwrap_err(),
            UrlPolicyError::DisallowedScheme
        );
        assert_eq!(
            policy.validate("chrome://settings").unwrap_err(),
            UrlPolicyError::DisallowedScheme
        );
    }

    #[test]
    fn allowlist_matches_exact_and_subdomain() {
        let policy = UrlPolicy::new(vec!["example.com".to_string()], vec![]);
        assert!(policy.validate("https://example.com").is_ok());
        assert!(policy.validate("https://app.example.com").is_ok());
        assert_eq!(
            policy.validate("https://evil.com").unwrap_err(),
            UrlPolicyError::DomainNotAllowed
        );
    }

    #[test]
    fn denylist_takes_effect_with_same_matching_rule() {
        let policy = UrlPolicy::new(vec![], vec!["bad.com".to_string()]);
        assert_eq!(
            policy.validate("https://sub.bad.com").unwrap_err(),
            UrlPolicyError::DomainDenied
        );
        assert!(policy.validate("https://good.com").is_ok());
    }

    #[test]
    fn denylist_wins_over_allowlist_when_both_match() {
        let policy = UrlPolicy::new(
            vec!["example.com".to_string()],
            vec!["example.com".to_string()],
        );
        assert_eq!(
            policy.validate("https://example.com").unwrap_err(),
            UrlPolicyError::DomainDenied
        );
    }
}
