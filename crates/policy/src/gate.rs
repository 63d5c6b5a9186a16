use webagent_core_types::PolicyMode;

/// Unsafe-scheme prefixes the `deterministic` policy mode blocks on `navigate`,
/// independent of the [`crate::UrlPolicy`] allow/deny host check (which runs at
/// session creation, not per-step).
const BLOCKED_NAVIGATE_PREFIXES: [&str; 5] =
    ["javascript:", "data:", "file:", "about:", "chrome:"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyDecision {
    Allow,
    Deny,
}

/// Pre-action gate consulted by the session runtime before every `step`.
/// `model_owns_action` lets every action through; `deterministic` additionally
/// blocks `navigate` calls whose URL uses an unsafe scheme.
pub struct ActionGate {
    pub mode: PolicyMode,
}

impl ActionGate {
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    pub fn evaluate(&self, action: &str, url: Option<&str>) -> PolicyDecision {
        if self.mode == PolicyMode::ModelOwnsAction {
            return PolicyDecision::Allow;
        }
        if action == "navigate" {
            if let Some(url) = url {
                let lower = url.trim_start().to_ascii_lowercase();
                if BLOCKED_NAVIGATE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                    return PolicyDecision::Deny;
                }
            }
        }
        PolicyDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_owns_action_allows_everything() {
        let gate = ActionGate::new(PolicyMode::ModelOwnsAction);
        assert_eq!(
            gate.evaluate("navigate", Some("javascript:alert(1)")),
            PolicyDecision::Allow
        );
    }

    #[test]
    fn deterministic_blocks_unsafe_navigate_schemes() {
        let gate = ActionGate::new(PolicyMode::Deterministic);
        assert_eq!(
            gate.evaluate("navigate", Some("javascript:alert(1)")),
            PolicyDecision::Deny
        );
        assert_eq!(
            gate.evaluate("navigate", Some("data:text/html,hi")),
            PolicyDecision::Deny
        );
        assert_eq!(
            gate.evaluate("navigate", Some("https://example.com")),
            PolicyDecision::Allow
        );
    }

    #[test]
    fn deterministic_does_not_gate_other_actions() {
        let gate = ActionGate::new(PolicyMode::Deterministic);
        assert_eq!(gate.evaluate("click", None), PolicyDecision::Allow);
    }
}
