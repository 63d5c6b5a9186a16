use crate::types::{DomSummary, InteractiveElement, RegionDetection};

/// Queries `button, input, textarea, select, a, [role="button"],
/// [role="link"], [onclick], canvas`, counts interactives and
/// category-specific nodes, and returns the first 12 as element summaries.
pub const DOM_SUMMARY_SCRIPT: &str = r#"(() => {
  function clampInt(n) {
    n = Math.trunc(Number(n));
    if (!Number.isFinite(n) || n < 0) return 0;
    return n;
  }
  const interactiveSelector =
    'button, input, textarea, select, a, [role="button"], [role="link"], [onclick], canvas';
  const interactive = Array.from(document.querySelectorAll(interactiveSelector));
  const buttons = document.querySelectorAll(
    'button, input[type="button"], input[type="submit"], [role="button"]'
  ).length;
  const textInputs = document.querySelectorAll('input, textarea').length;
  const links = document.querySelectorAll('a, [role="link"]').length;
  const iframes = document.querySelectorAll('iframe').length;
  const canvasNodes = document.querySelectorAll('canvas').length;
  const elements = interactive.slice(0, 12).map((el) => {
    const rect = el.getBoundingClientRect();
    return {
      tag: el.tagName.toLowerCase(),
      id: el.id || null,
      name: el.getAttribute('name'),
      role: el.getAttribute('role'),
      text: (el.textContent || '').trim().slice(0, 64),
      x: clampInt(rect.x),
      y: clampInt(rect.y),
      width: clampInt(rect.width),
      height: clampInt(rect.height),
    };
  });
  return {
    interactive_count: interactive.length,
    buttons,
    text_inputs: textInputs,
    links,
    iframes,
    canvas_nodes: canvasNodes,
    elements,
  };
})()"#;

/// Defensive parse of the evaluator's JSON result: missing fields default to
/// zero/empty, and bounds are clamped to `>= 0` even if the page returned
/// something unexpected.
pub fn parse_dom_summary(value: &serde_json::Value) -> DomSummary {
    let as_u32 = |key: &str| -> u32 {
        value
            .get(key)
            .and_then(|v| v.as_i64())
            .map(|n| n.max(0) as u32)
            .unwrap_or(0)
    };
    let clamp_i64 = |v: Option<&serde_json::Value>| -> i64 {
        v.and_then(|v| v.as_f64()).map(|n| n.max(0.0) as i64).unwrap_or(0)
    };

    let elements = value
        .get("elements")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .take(12)
                .map(|el| InteractiveElement {
                    tag: el.get("tag").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    id: el.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()),
                    name: el.get("name").and_then(|v| v.as_str()).map(|s| s.to_string()),
                    role: el.get("role").and_then(|v| v.as_str()).map(|s| s.to_string()),
                    text: el
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .chars()
                        .take(64)
                        .collect(),
                    x: clamp_i64(el.get("x")),
                    y: clamp_i64(el.get("y")),
                    width: clamp_i64(el.get("width")),
                    height: clamp_i64(el.get("height")),
                })
                .collect()
        })
        .unwrap_or_default();

    DomSummary {
        interactive_count: as_u32("interactive_count"),
        text_inputs: as_u32("text_inputs"),
        buttons: as_u32("buttons"),
        links: as_u32("links"),
        iframes: as_u32("iframes"),
        canvas_nodes: as_u32("canvas_nodes"),
        elements,
    }
}

/// Region detections synthesized from the top interactive elements, each with
/// the spec's fixed confidence.
pub fn synthesize_regions(dom: &DomSummary) -> Vec<RegionDetection> {
    const CONFIDENCE: f64 = 0.78;
    dom.elements
        .iter()
        .map(|el| {
            let label = match &el.id {
                Some(id) if !id.is_empty() => format!("{}#{}", el.tag, id),
                _ => el.tag.clone(),
            };
            RegionDetection {
                label,
                confidence: CONFIDENCE,
                x: el.x,
                y: el.y,
                width: el.width,
                height: el.height,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_summary() {
        let value = serde_json::json!({
            "interactive_count": 4,
            "buttons": 1,
            "text_inputs": 1,
            "links": 2,
            "iframes": 0,
            "canvas_nodes": 0,
            "elements": [{"tag": "button", "id": "submit", "text": "Submit"}],
        });
        let dom = parse_dom_summary(&value);
        assert_eq!(dom.interactive_count, 4);
        assert_eq!(dom.elements.len(), 1);
        assert_eq!(dom.elements[0].tag, "button");
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let dom = parse_dom_summary(&serde_json::json!({}));
        assert_eq!(dom.interactive_count, 0);
        assert!(dom.elements.is_empty());
    }

    #[test]
    fn negative_bounds_are_clamped_to_zero() {
        let value = serde_json::json!({
            "elements": [{"tag": "a", "x": -5, "y": -10, "width": -1, "height": -1}],
        });
        let dom = parse_dom_summary(&value);
        assert_eq!(dom.elements[0].x, 0);
        assert_eq!(dom.elements[0].y, 0);
    }

    #[test]
    fn region_label_includes_id_when_present() {
        let dom = DomSummary {
            elements: vec![InteractiveElement {
                tag: "button".into(),
                id: Some("go".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let regions = synthesize_regions(&dom);
        assert_eq!(regions[0].label, "button#go");
        assert_eq!(regions[0].confidence, 0.78);
    }
}
