//! Free-text cleanup for corpus fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

/// Keys probed, in order, on object-shaped text values.
const TEXT_KEYS: [&str; 4] = ["text", "plain", "plaintext", "as_text"];

/// Plain string form of a raw field value, before markup cleanup.
///
/// `null` is empty, scalars use their string form, objects expose their
/// text through the first usable key in [`TEXT_KEYS`]; anything else falls
/// back to its JSON rendering.
pub fn to_plain(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Object(map) => TEXT_KEYS
            .iter()
            .find_map(|key| match map.get(*key) {
                Some(JsonValue::String(s)) => Some(s.clone()),
                Some(JsonValue::Number(n)) => Some(n.to_string()),
                Some(JsonValue::Bool(b)) => Some(b.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| value.to_string()),
        JsonValue::Array(_) => value.to_string(),
    }
}

/// Clean any raw field value into a single-line string.
pub fn clean(value: &JsonValue) -> String {
    clean_str(&to_plain(value))
}

/// Strip TeX-style markup, drop braces and collapse whitespace.
///
/// Removing a command can expose a new one (`\{}\x` → `\x`), so the
/// markup passes repeat until nothing changes; this keeps the function
/// idempotent.
pub fn clean_str(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = remove_braces(&remove_commands(&current));
        if next == current {
            break;
        }
        current = next;
    }
    collapse_whitespace(&current)
}

fn remove_commands(input: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+(\{[^}]*\})?").unwrap());
    RE.replace_all(input, "").into_owned()
}

fn remove_braces(input: &str) -> String {
    input.replace(['{', '}'], "")
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
