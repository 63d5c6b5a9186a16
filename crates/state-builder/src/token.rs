use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::types::DomSummary;

#[derive(Serialize)]
struct DomCounts {
    interactive_count: u32,
    buttons: u32,
    text_inputs: u32,
    links: u32,
    iframes: u32,
    canvas_nodes: u32,
}

#[derive(Serialize)]
struct TokenInput<'a> {
    url: &'a str,
    title: &'a str,
    dom: serde_json::Value,
    network_count: usize,
    frame_count: usize,
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

/// SHA-1 hex of a canonical serialization of `{url, title, dom-counts-or-empty,
/// network_count, frame_count}`. Two packets with identical inputs always hash
/// to the same token (§8 invariant 5).
pub fn compute_state_token(
    url: &str,
    title: &str,
    dom: Option<&DomSummary>,
    network_count: usize,
    frame_count: usize,
) -> String {
    let dom_value = match dom {
        Some(d) => serde_json::to_value(DomCounts {
            interactive_count: d.interactive_count,
            buttons: d.buttons,
            text_inputs: d.text_inputs,
            links: d.links,
            iframes: d.iframes,
            canvas_nodes: d.canvas_nodes,
        })
        .unwrap_or(serde_json::json!({})),
        None => serde_json::json!({}),
    };

    let input = TokenInput {
        url,
        title,
        dom: dom_value,
        network_count,
        frame_count,
    };
    let canonical = serde_json::to_string(&input).unwrap_or_default();

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    hex_encode(hasher.finalize())
}

/// Change token derived by comparing a fresh state token against the one from
/// this builder's previous call.
pub fn next_change_tokens(previous: Option<&str>, current: &str) -> Vec<String> {
    match previous {
        None => vec!["INIT".to_string()],
        Some(prev) if prev == current => vec!["NO_CHANGE".to_string()],
        Some(_) => vec!["STATE_CHANGED".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_yield_identical_tokens() {
        let a = compute_state_token("https://x.test", "X", None, 3, 1);
        let b = compute_state_token("https://x.test", "X", None, 3, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn different_title_yields_different_token() {
        let a = compute_state_token("https://x.test", "X", None, 0, 0);
        let b = compute_state_token("https://x.test", "Y", None, 0, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn s7_change_token_sequence() {
        assert_eq!(next_change_tokens(None, "t1"), vec!["INIT"]);
        assert_eq!(next_change_tokens(Some("t1"), "t1"), vec!["NO_CHANGE"]);
        assert_eq!(next_change_tokens(Some("t1"), "t2"), vec!["STATE_CHANGED"]);
    }
}
