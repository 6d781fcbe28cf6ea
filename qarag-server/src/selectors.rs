//! CSS selector candidates from an HTML page

use scraper::{ElementRef, Html};
use serde::Serialize;
use std::collections::HashSet;

/// Longest visible text kept per candidate, in characters.
const TEXT_SNIPPET_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Id,
    Name,
    Class,
}

/// A selector that locates an element of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorCandidate {
    pub selector: String,
    #[serde(rename = "type")]
    pub kind: SelectorKind,
    /// Tag name of the element the selector was taken from
    pub tag: String,
    /// Start of the element's visible text
    pub text: String,
}

/// Collects id, name and class selectors in document order.
///
/// Each element contributes `#id`, then `[name='...']`, then one `.class`
/// per class token. A selector string is emitted only the first time it is
/// seen, and at most `cap` candidates are returned. Callers bound the size
/// of `html` before calling.
pub fn extract_selectors(html: &str, cap: usize) -> Vec<SelectorCandidate> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for element in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
    {
        if candidates.len() >= cap {
            break;
        }

        let value = element.value();
        let mut found: Vec<(String, SelectorKind)> = Vec::new();
        if let Some(id) = value.attr("id").filter(|id| !id.is_empty()) {
            found.push((format!("#{id}"), SelectorKind::Id));
        }
        if let Some(name) = value.attr("name").filter(|name| !name.is_empty()) {
            found.push((format!("[name='{name}']"), SelectorKind::Name));
        }
        // Attribute order; classes() would sort the tokens
        for class in value.attr("class").into_iter().flat_map(str::split_whitespace) {
            found.push((format!(".{class}"), SelectorKind::Class));
        }

        let mut snippet: Option<String> = None;
        for (selector, kind) in found {
            if !seen.insert(selector.clone()) {
                continue;
            }
            let text = snippet.get_or_insert_with(|| visible_text(&element)).clone();
            candidates.push(SelectorCandidate {
                selector,
                kind,
                tag: value.name().to_string(),
                text,
            });
        }
    }

    candidates.truncate(cap);
    candidates
}

/// Text nodes of the element, each trimmed and concatenated, then shortened.
fn visible_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<String>()
        .chars()
        .take(TEXT_SNIPPET_CHARS)
        .collect()
}
