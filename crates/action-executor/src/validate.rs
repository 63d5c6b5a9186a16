use crate::errors::ValidationError;
use crate::types::{ActionInput, ActionKind};

/// Structural checks on one action invocation, performed before any browser
/// work. Mirrors the error taxonomy's Validation codes that are specific to
/// action dispatch (url/text/key/target/selector/timeout/action-limit); the
/// broader tool-argument schema checks live upstream of this crate.
pub fn validate_action(input: &ActionInput) -> Result<ActionKind, ValidationError> {
    if let Some(n) = input.max_actions_per_step {
        if n != 1 {
            return Err(ValidationError::InvalidActionLimit);
        }
    }
    if let Some(t) = input.timeout_ms {
        if !(50..=120_000).contains(&t) {
            return Err(ValidationError::InvalidTimeout);
        }
    }
    if let Some(sel) = &input.selector {
        if sel.is_empty() {
            return Err(ValidationError::InvalidSelector);
        }
    }

    let kind = ActionKind::parse(&input.action).ok_or(ValidationError::InvalidAction)?;

    match kind {
        ActionKind::Navigate => {
            if input.url.as_deref().unwrap_or("").is_empty() {
                return Err(ValidationError::MissingUrl);
            }
        }
        ActionKind::Click | ActionKind::Hover => {
            if !input.has_selector() && !input.has_coords() {
                return Err(ValidationError::MissingTarget);
            }
        }
        ActionKind::Type => {
            if input.text.is_none() {
                return Err(ValidationError::MissingText);
            }
            if !input.has_selector() && !input.has_coords() {
                return Err(ValidationError::MissingTarget);
            }
        }
        ActionKind::Press => {
            if input.key.is_none() {
                return Err(ValidationError::MissingKey);
            }
        }
        ActionKind::Drag => {
            if input.x.is_none() || input.y.is_none() || input.delta_x.is_none() || input.delta_y.is_none() {
                return Err(ValidationError::MissingTarget);
            }
        }
        ActionKind::Scroll | ActionKind::Wait => {}
        ActionKind::WaitFor => {
            if input.wait_condition.as_deref().unwrap_or("").is_empty() {
                return Err(ValidationError::MissingTarget);
            }
        }
    }

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(action: &str) -> ActionInput {
        ActionInput {
            action: action.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn s1_click_with_coords_is_valid() {
        let input = ActionInput {
            x: Some(20.0),
            y: Some(15.0),
            ..base("click")
        };
        assert!(validate_action(&input).is_ok());
    }

    #[test]
    fn s2_type_with_selector_missing_text_reports_missing_text() {
        let input = ActionInput {
            selector: Some("#q".to_string()),
            ..base("type")
        };
        let err = validate_action(&input).unwrap_err();
        assert_eq!(err, ValidationError::MissingText);
    }

    #[test]
    fn click_without_selector_or_coords_is_missing_target() {
        let err = validate_action(&base("click")).unwrap_err();
        assert_eq!(err, ValidationError::MissingTarget);
    }

    #[test]
    fn navigate_without_url_is_missing_url() {
        let err = validate_action(&base("navigate")).unwrap_err();
        assert_eq!(err, ValidationError::MissingUrl);
    }

    #[test]
    fn unknown_action_is_invalid_action() {
        let err = validate_action(&base("teleport")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidAction);
    }

    #[test]
    fn action_limit_above_one_is_rejected() {
        let input = ActionInput {
            max_actions_per_step: Some(2),
            ..base("wait")
        };
        let err = validate_action(&input).unwrap_err();
        assert_eq!(err, ValidationError::InvalidActionLimit);
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let input = ActionInput {
            timeout_ms: Some(10),
            ..base("wait")
        };
        let err = validate_action(&input).unwrap_err();
        assert_eq!(err, ValidationError::InvalidTimeout);
    }

    #[test]
    fn empty_selector_is_invalid_selector() {
        let input = ActionInput {
            selector: Some(String::new()),
            x: Some(1.0),
            y: Some(1.0),
            ..base("click")
        };
        let err = validate_action(&input).unwrap_err();
        assert_eq!(err, ValidationError::InvalidSelector);
    }
}
