// Structured payload extraction from free-form model output
//
// lookup order:
//   1. a ```json fenced block
//   2. any fenced block whose content starts with '{'
//   3. everything between the first '{' and the last '}'

use regex::Regex;
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?i:json)\s*(.*?)\s*```").expect("json fence pattern"));

static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("fence pattern"));

/// Locate the embedded JSON object text, None when nothing looks like one
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(caps) = JSON_FENCE.captures(text) {
        if let Some(body) = caps.get(1) {
            return Some(body.as_str().trim());
        }
    }

    for caps in ANY_FENCE.captures_iter(text) {
        if let Some(body) = caps.get(1) {
            let body = body.as_str().trim();
            if body.starts_with('{') {
                return Some(body);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}
