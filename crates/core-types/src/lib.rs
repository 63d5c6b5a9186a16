//! Shared identifiers used across every crate in the session runtime.
//!
//! Each id is a thin newtype over a UUID string so that a session id can never be
//! passed where a trace id is expected, while still serializing as a plain string
//! at the tool boundary.

use std::fmt;

use uuid::Uuid;

mod network;
pub use network::{NetworkEvent, NetworkEventType, NetworkRing};

/// Implemented by every crate's own error enum so the tool-dispatch front door can
/// converge them into one `{error_code, message}` shape without knowing their
/// concrete types.
pub trait DomainError: std::error::Error {
    /// The stable string code surfaced to callers (see the error taxonomy in the spec).
    fn code(&self) -> &'static str;
}

macro_rules! uuid_id {
    ($name:ident) => {
        #[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
        #[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

uuid_id!(SessionId);
uuid_id!(FrameId);
uuid_id!(ActionId);

/// A trace identifies one session's replay log: the session id plus the epoch
/// millisecond at which the session was created, so that two sessions created at
/// different times never collide on disk even if session ids were ever reused.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn new(session_id: &SessionId, created_at_epoch_ms: u64) -> Self {
        Self(format!("{}-{}", session_id.0, created_at_epoch_ms))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replace any character outside `[A-Za-z0-9._-]` with `_`, per the replay
    /// store's on-disk filename rule.
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milliseconds since the Unix epoch. A thin alias rather than a newtype: every
/// crate that handles timestamps compares and subtracts them directly.
pub type EpochMs = u64;

pub fn now_epoch_ms() -> EpochMs {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Capture profile controlling which observations are included by default.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
pub enum CaptureProfile {
    Adaptive,
    DomOnly,
    FramesOnly,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        CaptureProfile::Adaptive
    }
}

/// Policy mode governing how permissive action dispatch is.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
pub enum PolicyMode {
    ModelOwnsAction,
    Deterministic,
}

impl Default for PolicyMode {
    fn default() -> Self {
        PolicyMode::ModelOwnsAction
    }
}

/// Mask a secret for logging: empty/absent -> "", length <= 6 -> "***", otherwise
/// the first 3 characters followed by `max(2, len - 3)` asterisks.
pub fn mask_secret(value: Option<&str>) -> String {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return String::new(),
    };
    if value.len() <= 6 {
        return "***".to_string();
    }
    let visible: String = value.chars().take(3).collect();
    let stars = std::cmp::max(2, value.chars().count() - 3);
    format!("{}{}", visible, "*".repeat(stars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trips_as_string() {
        let id = SessionId::new();
        let again: SessionId = id.0.clone().into();
        assert_eq!(id, again);
    }

    #[test]
    fn trace_id_sanitizes_unsafe_characters() {
        let trace = TraceId("sess/weird id:1".to_string());
        assert_eq!(trace.sanitized(), "sess_weird_id_1");
    }

    #[test]
    fn mask_secret_matches_spec_examples() {
        assert_eq!(mask_secret(Some("supersecret")), "sup********");
        assert_eq!(mask_secret(Some("abc")), "***");
        assert_eq!(mask_secret(None), "");
        assert_eq!(mask_secret(Some("")), "");
    }
}
