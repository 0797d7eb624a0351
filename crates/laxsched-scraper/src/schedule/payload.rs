//! Locating machine-readable payloads embedded in a schedule page.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::fixture::is_fixture_shaped;

/// `self.__next_f.push([1,"<js string>"])` streamed fragments.
static STREAMED_FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)self\.__next_f\.push\(\[\s*\d+\s*,\s*"((?:[^"\\]|\\.)*)"\s*\]\)"#)
        .expect("valid regex")
});

static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*\bid\s*=\s*["']__NEXT_DATA__["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Every JSON document the page embeds, in page order: the parsed lines of
/// the concatenated streamed fragments, then any `__NEXT_DATA__` block.
pub(crate) fn candidate_payloads(html: &str) -> Vec<Value> {
    let mut payloads = Vec::new();

    let stream: String = STREAMED_FRAGMENT_RE
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| decode_js_string(m.as_str()))
        .collect();
    for line in stream.lines() {
        // Each streamed row is `<id>:<payload>`; only JSON payloads matter.
        let Some((_, body)) = line.split_once(':') else {
            continue;
        };
        let body = body.trim();
        if !(body.starts_with('[') || body.starts_with('{')) {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            payloads.push(value);
        }
    }

    for cap in NEXT_DATA_RE.captures_iter(html) {
        let Some(content) = cap.get(1) else {
            continue;
        };
        match serde_json::from_str::<Value>(content.as_str().trim()) {
            Ok(value) => payloads.push(value),
            Err(e) => tracing::debug!(error = %e, "__NEXT_DATA__ block is not valid JSON"),
        }
    }

    payloads
}

/// Decode the body of a double-quoted JS string literal. JSON string escapes
/// cover what the framework emits; `\x` escapes are rewritten first.
fn decode_js_string(body: &str) -> Option<String> {
    let normalized = if body.contains("\\x") {
        rewrite_hex_escapes(body)
    } else {
        body.to_owned()
    };
    serde_json::from_str::<String>(&format!("\"{normalized}\"")).ok()
}

fn rewrite_hex_escapes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('x') => out.push_str("\\u00"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// The JSON array, anywhere in any payload, holding the most fixture-shaped
/// objects. Ties keep the earlier array. Returns only the fixture-shaped
/// elements.
pub(crate) fn best_fixture_array(payloads: &[Value]) -> Vec<&Value> {
    let mut best: Vec<&Value> = Vec::new();
    let mut stack: Vec<&Value> = payloads.iter().collect();
    // Depth-first, but visit siblings in document order.
    stack.reverse();

    while let Some(value) = stack.pop() {
        match value {
            Value::Array(items) => {
                let fixtures: Vec<&Value> = items.iter().filter(|v| is_fixture_shaped(v)).collect();
                if fixtures.len() > best.len() {
                    best = fixtures;
                }
                stack.extend(items.iter().rev());
            }
            Value::Object(map) => {
                let children: Vec<&Value> = map.values().collect();
                stack.extend(children.into_iter().rev());
            }
            _ => {}
        }
    }
    best
}
