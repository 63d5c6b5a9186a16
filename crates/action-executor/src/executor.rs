use std::time::{Duration, Instant};

use browser_driver::Driver;
use tracing::debug;
use webagent_core_types::{now_epoch_ms, NetworkEvent, NetworkEventType, NetworkRing};

use crate::errors::ActionError;
use crate::types::{ActionInput, ActionKind, ActionResult};
use crate::validate::validate_action;

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_TIMEOUT_MS: u64 = 8_000;
const OUTER_CEILING_SLACK_MS: u64 = 300;
const DEFAULT_WAIT_MS: u64 = 1_000;
const NETWORK_RING_CAPACITY: usize = 400;

/// Effective per-action timeout: caller value clamped to `[100, 120000]` ms,
/// defaulting to 8000ms when absent.
pub fn effective_timeout_ms(input: &ActionInput) -> u64 {
    input
        .timeout_ms
        .unwrap_or(DEFAULT_TIMEOUT_MS)
        .clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)
}

/// Executes exactly one action against the driver under a hard outer deadline,
/// then appends a synthetic network event (success or failure) to `network_ring`
/// so the action is causally interleaved with real request/response traffic.
pub async fn execute(
    driver: &dyn Driver,
    input: &ActionInput,
    network_ring: &mut NetworkRing,
) -> ActionResult {
    let started = Instant::now();

    let kind = match validate_action(input) {
        Ok(kind) => kind,
        Err(err) => {
            let elapsed = started.elapsed().as_millis() as u64;
            let result = ActionResult::failure(&input.action, err.to_string(), elapsed);
            record_network_event(driver, network_ring, &result, &input.action).await;
            return result;
        }
    };

    let timeout_ms = effective_timeout_ms(input);
    let outer_ceiling = Duration::from_millis(timeout_ms + OUTER_CEILING_SLACK_MS);

    let outcome = tokio::time::timeout(outer_ceiling, dispatch(driver, kind, input, timeout_ms)).await;

    let elapsed = started.elapsed().as_millis() as u64;
    let result = match outcome {
        Ok(Ok(dispatched)) => ActionResult::success(kind.as_str(), dispatched.target, elapsed)
            .with_selector(dispatched.selector)
            .with_coordinates(dispatched.coordinates),
        Ok(Err(err)) => ActionResult::failure(kind.as_str(), err.to_string(), elapsed),
        Err(_) => ActionResult::failure(
            kind.as_str(),
            ActionError::Timeout(timeout_ms).to_string(),
            elapsed,
        ),
    };

    record_network_event(driver, network_ring, &result, kind.as_str()).await;
    result
}

struct Dispatched {
    target: String,
    selector: Option<String>,
    coordinates: Option<(f64, f64)>,
}

impl Dispatched {
    fn of(target: String) -> Self {
        Self { target, selector: None, coordinates: None }
    }

    fn via_selector(target: String, selector: String) -> Self {
        Self { target, selector: Some(selector), coordinates: None }
    }

    fn via_coords(target: String, x: f64, y: f64) -> Self {
        Self { target, selector: None, coordinates: Some((x, y)) }
    }
}

/// `selector`-or-`coordinates` resolution shared by click/hover/type: prefer the
/// selector path when at least one DOM node resolves, otherwise fall back to raw
/// coordinates, otherwise fail with [`ActionError::SelectorNotFoundAndCoordinatesMissing`].
enum Target<'a> {
    Selector(&'a str),
    Coords(f64, f64),
}

async fn resolve_target<'a>(driver: &dyn Driver, input: &'a ActionInput) -> Result<Target<'a>, ActionError> {
    if let Some(selector) = input.selector.as_deref().filter(|s| !s.is_empty()) {
        let count = driver.selector_count(selector).await?;
        if count >= 1 {
            return Ok(Target::Selector(selector));
        }
    }
    if let (Some(x), Some(y)) = (input.x, input.y) {
        return Ok(Target::Coords(x, y));
    }
    Err(ActionError::SelectorNotFoundAndCoordinatesMissing)
}

async fn dispatch(
    driver: &dyn Driver,
    kind: ActionKind,
    input: &ActionInput,
    timeout_ms: u64,
) -> Result<Dispatched, ActionError> {
    let timeout = Duration::from_millis(timeout_ms);

    match kind {
        ActionKind::Navigate => {
            let url = input.url.clone().expect("validated");
            driver.navigate(&url, timeout).await?;
            Ok(Dispatched::of(url))
        }
        ActionKind::Click => match resolve_target(driver, input).await? {
            Target::Selector(selector) => {
                driver.wait_for_selector(selector, timeout).await?;
                driver.click_selector(selector, timeout).await?;
                let target = driver.current_url().await.unwrap_or_default();
                Ok(Dispatched::via_selector(target, selector.to_string()))
            }
            Target::Coords(x, y) => {
                driver.click_coords(x, y).await?;
                let target = driver.current_url().await.unwrap_or_default();
                Ok(Dispatched::via_coords(target, x, y))
            }
        },
        ActionKind::Hover => match resolve_target(driver, input).await? {
            Target::Selector(selector) => {
                driver.hover_selector(selector, timeout).await?;
                let target = driver.current_url().await.unwrap_or_default();
                Ok(Dispatched::via_selector(target, selector.to_string()))
            }
            Target::Coords(x, y) => {
                driver.hover_coords(x, y).await?;
                let target = driver.current_url().await.unwrap_or_default();
                Ok(Dispatched::via_coords(target, x, y))
            }
        },
        ActionKind::Type => {
            let text = input.text.clone().expect("validated");
            match resolve_target(driver, input).await? {
                Target::Selector(selector) => {
                    driver.type_selector(selector, &text, timeout).await?;
                    let target = driver.current_url().await.unwrap_or_default();
                    Ok(Dispatched::via_selector(target, selector.to_string()))
                }
                Target::Coords(x, y) => {
                    driver.type_coords(x, y, &text).await?;
                    let target = driver.current_url().await.unwrap_or_default();
                    Ok(Dispatched::via_coords(target, x, y))
                }
            }
        }
        ActionKind::Press => {
            let key = input.key.clone().expect("validated");
            driver.press_key(&key).await?;
            let target = driver.current_url().await.unwrap_or_default();
            Ok(Dispatched::of(target))
        }
        ActionKind::Scroll => {
            let move_to = match (input.x, input.y) {
                (Some(x), Some(y)) => Some((x, y)),
                _ => None,
            };
            driver
                .scroll(move_to, input.delta_x.unwrap_or(0.0), input.delta_y.unwrap_or(0.0))
                .await?;
            let target = driver.current_url().await.unwrap_or_default();
            Ok(Dispatched::of(target))
        }
        ActionKind::Drag => {
            let (x, y, dx, dy) = (
                input.x.expect("validated"),
                input.y.expect("validated"),
                input.delta_x.expect("validated"),
                input.delta_y.expect("validated"),
            );
            driver.drag(x, y, dx, dy).await?;
            let target = driver.current_url().await.unwrap_or_default();
            Ok(Dispatched::via_coords(target, x, y))
        }
        ActionKind::Wait => {
            let wait_ms = input.timeout_ms.unwrap_or(DEFAULT_WAIT_MS).min(MAX_TIMEOUT_MS);
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            let target = driver.current_url().await.unwrap_or_default();
            Ok(Dispatched::of(target))
        }
        ActionKind::WaitFor => {
            let condition = input.wait_condition.clone().unwrap_or_default();
            match condition.as_str() {
                "networkidle" | "network_idle" => {
                    driver.wait_for_network_idle(timeout).await?;
                }
                "stable" | "domstable" => {
                    driver.wait_for_dom_stable(timeout).await?;
                }
                selector => {
                    driver.wait_for_selector(selector, timeout).await?;
                }
            }
            let target = driver.current_url().await.unwrap_or_default();
            Ok(Dispatched::of(target))
        }
    }
}

async fn record_network_event(
    driver: &dyn Driver,
    network_ring: &mut NetworkRing,
    result: &ActionResult,
    action_name: &str,
) {
    let now = now_epoch_ms();
    let url = driver.current_url().await.unwrap_or_default();
    let event = NetworkEvent {
        id: format!("{now}:{action_name}"),
        url,
        method: action_name.to_string(),
        status: Some(if result.success { 200 } else { 0 }),
        event_type: Some(if result.success {
            NetworkEventType::Action
        } else {
            NetworkEventType::ActionFailed
        }),
        time: now,
        failure_text: if result.success { None } else { result.detail.clone() },
    };
    network_ring.push(event);
    if network_ring.len() > NETWORK_RING_CAPACITY {
        debug!("action network ring exceeded expected capacity, trimming handled by ring itself");
    }
}

/// `true` iff a failed action's message does NOT contain "timeout" — drives
/// `next_recommendation`: `retry` when true, `fallback_or_abandon` otherwise.
pub fn is_retryable_failure(detail: &str) -> bool {
    !detail.to_lowercase().contains("timeout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_driver::StubDriver;

    fn ring() -> NetworkRing {
        NetworkRing::new(NETWORK_RING_CAPACITY)
    }

    #[tokio::test]
    async fn navigate_succeeds_against_stub() {
        let driver = StubDriver::new("about:blank");
        let mut net = ring();
        let input = ActionInput {
            action: "navigate".to_string(),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let result = execute(&driver, &input, &mut net).await;
        assert!(result.success);
        assert_eq!(result.target.as_deref(), Some("https://example.com"));
        assert_eq!(net.len(), 1);
    }

    #[tokio::test]
    async fn click_with_coords_falls_back_when_no_selector() {
        let driver = StubDriver::new("https://example.com");
        let mut net = ring();
        let input = ActionInput {
            action: "click".to_string(),
            selector: Some("".to_string()),
            x: Some(5.0),
            y: Some(6.0),
            ..Default::default()
        };
        // empty selector is an INVALID_SELECTOR validation failure, not a fallback case
        let result = execute(&driver, &input, &mut net).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn click_without_selector_uses_coordinates() {
        let driver = StubDriver::new("https://example.com");
        let mut net = ring();
        let input = ActionInput {
            action: "click".to_string(),
            x: Some(5.0),
            y: Some(6.0),
            ..Default::default()
        };
        let result = execute(&driver, &input, &mut net).await;
        assert!(result.success);
        assert_eq!(result.coordinates, Some((5.0, 6.0)));
    }

    #[tokio::test]
    async fn max_actions_per_step_above_one_is_rejected() {
        let driver = StubDriver::new("https://example.com");
        let mut net = ring();
        let input = ActionInput {
            action: "wait".to_string(),
            max_actions_per_step: Some(3),
            ..Default::default()
        };
        let result = execute(&driver, &input, &mut net).await;
        assert!(!result.success);
        assert!(result.detail.unwrap().contains("phase 1"));
    }

    #[test]
    fn retryability_keys_off_timeout_substring() {
        assert!(is_retryable_failure("element not found"));
        assert!(!is_retryable_failure("action timeout after 8000ms"));
    }
}
