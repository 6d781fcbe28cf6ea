//! Recovery of structured payloads from free-form model output.
//!
//! Models asked for "only JSON" or "only code" still wrap their answer in
//! Markdown fences or surround it with prose. These helpers pull the payload
//! back out without trying to repair it; parsing is left to the caller.
use regex::Regex;
use std::sync::LazyLock;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\[.*?\]|\{.*?\})\s*```").expect("valid fenced JSON pattern")
});

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[\w+-]*\s*(.*?)```").expect("valid code fence pattern"));

/// Finds the JSON payload inside model output.
///
/// Tried in order:
/// 1. the interior of a fenced block (optionally tagged `json`) holding `[...]` or `{...}`
/// 2. the first balanced bracketed span in the raw text
/// 3. the trimmed text itself
pub fn extract_json_span(text: &str) -> &str {
    let text = text.trim();

    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str();
        }
    }

    first_bracketed_span(text).unwrap_or(text)
}

/// Returns the first `[...]` or `{...}` span whose brackets balance,
/// ignoring brackets that appear inside JSON string literals.
fn first_bracketed_span(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Returns the interior of the first fenced code block, or the output unchanged
/// when it has no complete fence.
pub fn strip_code_fence(text: &str) -> String {
    if text.contains("```") {
        if let Some(inner) = FENCED_CODE.captures(text).and_then(|c| c.get(1)) {
            return inner.as_str().trim().to_string();
        }
    }
    text.to_string()
}
