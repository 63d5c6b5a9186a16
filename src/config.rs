//! Layered process configuration: defaults, then an optional config file
//! (TOML/JSON/YAML, auto-detected), then `WEBAGENT_*` environment variables,
//! each layer only overriding what it sets. Every field is parsed
//! defensively — a present-but-invalid value falls back to the field's
//! default with a `warn` log line instead of aborting startup.

use std::path::PathBuf;

use config::{Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;
use webagent_core_types::{mask_secret, PolicyMode};

const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 8088;
const DEFAULT_MAX_SESSIONS: usize = 4;
const DEFAULT_SESSION_MAX_AGE_MS: u64 = 30 * 60 * 1_000;
const DEFAULT_TRACES_ROOT: &str = "./traces";
const DEFAULT_LOG_FORMAT: &str = "pretty";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Stdio,
    Rest,
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Stdio
    }
}

/// Raw, all-optional shape the `config` crate deserializes merged layers
/// into. Every field is validated into `Config` by hand so an invalid or
/// out-of-range value degrades to the default rather than failing startup.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    transport: Option<String>,
    http_host: Option<String>,
    http_port: Option<i64>,
    max_sessions: Option<i64>,
    headless: Option<bool>,
    allowlist: Option<String>,
    denylist: Option<String>,
    policy_mode: Option<String>,
    session_max_age_ms: Option<i64>,
    traces_root: Option<String>,
    chrome_executable: Option<String>,
    log_format: Option<String>,
    log_filter: Option<String>,
}

/// The one resolved, typed configuration value a process builds at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub transport: Transport,
    pub http_host: String,
    pub http_port: u16,
    pub max_sessions: usize,
    pub headless: bool,
    pub allowlist: Vec<String>,
    pub denylist: Vec<String>,
    pub policy_mode: PolicyMode,
    pub session_max_age_ms: u64,
    pub traces_root: PathBuf,
    pub chrome_executable: Option<String>,
    pub log_format: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            headless: true,
            allowlist: Vec::new(),
            denylist: Vec::new(),
            policy_mode: PolicyMode::ModelOwnsAction,
            session_max_age_ms: DEFAULT_SESSION_MAX_AGE_MS,
            traces_root: PathBuf::from(DEFAULT_TRACES_ROOT),
            chrome_executable: None,
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Layer defaults -> optional file -> `WEBAGENT_*` environment variables.
    pub fn load(file: Option<&PathBuf>) -> Self {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("WEBAGENT").separator("_"));

        let raw: RawConfig = match builder.build() {
            Ok(merged) => merged.try_deserialize().unwrap_or_else(|err| {
                warn!(%err, "config layer had the wrong shape, using defaults for this layer");
                RawConfig::default()
            }),
            Err(err) => {
                warn!(%err, "config sources failed to load, using defaults");
                RawConfig::default()
            }
        };

        Config::default().apply(raw)
    }

    fn apply(mut self, raw: RawConfig) -> Self {
        if let Some(s) = raw.transport {
            self.set_transport(&s);
        }
        if let Some(s) = raw.http_host {
            self.http_host = s;
        }
        if let Some(n) = raw.http_port {
            self.set_http_port(n);
        }
        if let Some(n) = raw.max_sessions {
            self.set_max_sessions(n);
        }
        if let Some(b) = raw.headless {
            self.headless = b;
        }
        if let Some(s) = raw.allowlist {
            self.allowlist = parse_host_list(&s);
        }
        if let Some(s) = raw.denylist {
            self.denylist = parse_host_list(&s);
        }
        if let Some(s) = raw.policy_mode {
            self.set_policy_mode(&s);
        }
        if let Some(n) = raw.session_max_age_ms {
            self.set_session_max_age_ms(n);
        }
        if let Some(s) = raw.traces_root {
            self.traces_root = PathBuf::from(s);
        }
        if let Some(s) = raw.chrome_executable {
            self.chrome_executable = Some(s);
        }
        if let Some(s) = raw.log_format {
            self.log_format = s;
        }
        if let Some(s) = raw.log_filter {
            self.log_filter = s;
        }
        self
    }

    fn set_transport(&mut self, raw: &str) {
        match raw {
            "stdio" => self.transport = Transport::Stdio,
            "rest" => self.transport = Transport::Rest,
            other => warn!(value = %other, "invalid transport, keeping default"),
        }
    }

    fn set_http_port(&mut self, raw: i64) {
        match u16::try_from(raw) {
            Ok(0) | Err(_) => warn!(value = raw, "invalid http_port, keeping default"),
            Ok(n) => self.http_port = n,
        }
    }

    fn set_max_sessions(&mut self, raw: i64) {
        match usize::try_from(raw) {
            Ok(n) if n > 0 => self.max_sessions = n,
            _ => warn!(value = raw, "invalid max_sessions, keeping default"),
        }
    }

    fn set_policy_mode(&mut self, raw: &str) {
        match raw {
            "model_owns_action" => self.policy_mode = PolicyMode::ModelOwnsAction,
            "deterministic" => self.policy_mode = PolicyMode::Deterministic,
            other => warn!(value = %other, "invalid policy_mode, keeping default"),
        }
    }

    fn set_session_max_age_ms(&mut self, raw: i64) {
        match u64::try_from(raw) {
            Ok(n) if n > 0 => self.session_max_age_ms = n,
            _ => warn!(value = raw, "invalid session_max_age_ms, keeping default"),
        }
    }

    /// Rendered for the boot log line, with no secrets in scope today (kept
    /// as the seam the spec names in case an auth token config field is added).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "transport": self.transport,
            "http_host": self.http_host,
            "http_port": self.http_port,
            "max_sessions": self.max_sessions,
            "headless": self.headless,
            "allowlist": self.allowlist,
            "denylist": self.denylist,
            "policy_mode": self.policy_mode,
            "session_max_age_ms": self.session_max_age_ms,
            "traces_root": self.traces_root,
            "chrome_executable": self.chrome_executable.as_deref().map(|v| mask_secret(Some(v))),
            "log_format": self.log_format,
            "log_filter": self.log_filter,
        })
    }
}

fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.transport, Transport::Stdio);
        assert_eq!(cfg.max_sessions, 4);
        assert!(cfg.headless);
        assert_eq!(cfg.session_max_age_ms, 1_800_000);
        assert_eq!(cfg.http_host, "127.0.0.1");
        assert_eq!(cfg.http_port, 8088);
    }

    #[test]
    fn invalid_values_fall_back_to_default() {
        let raw = RawConfig {
            max_sessions: Some(-3),
            http_port: Some(0),
            ..Default::default()
        };
        let cfg = Config::default().apply(raw);
        assert_eq!(cfg.max_sessions, 4);
        assert_eq!(cfg.http_port, 8088);
    }

    #[test]
    fn allowlist_parses_comma_separated_hosts() {
        assert_eq!(
            parse_host_list("example.com, other.com ,,"),
            vec!["example.com".to_string(), "other.com".to_string()]
        );
    }
}
