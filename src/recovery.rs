//! Best-effort recovery of a JSON findings object from raw model output.
//!
//! Model text is unreliable: the JSON may be buried in reasoning prose,
//! split across newline-delimited streaming envelopes, emitted with the
//! marker tokens unicode-escaped by a transport hop, or near-valid with
//! trailing commas. Strategies are tried in order until one yields an
//! object; total failure returns an empty map, never an error.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

/// Marker tokens the evaluation prompts ask the model to emit around its
/// JSON answer.
pub const JSON_START: &str = "<<JSON_START>>";
pub const JSON_END: &str = "<<JSON_END>>";

pub type JsonObject = Map<String, Value>;

/// Ordered recovery strategies. First success wins.
const STRATEGIES: &[fn(&str) -> Option<JsonObject>] = &[
    direct_parse,
    marker_extract,
    marker_keyword,
    balanced_braces,
    lenient_whole,
];

/// Recover a JSON object from raw model output.
///
/// Returns an empty map when every strategy fails; callers treat that
/// identically to "no findings".
pub fn recover(text: &str) -> JsonObject {
    if text.trim().is_empty() {
        return JsonObject::new();
    }

    let text = match reassemble_stream(text) {
        Some(assembled) => assembled,
        None => text.to_string(),
    };
    let text = unescape_markers(&text);

    for strategy in STRATEGIES {
        if let Some(obj) = strategy(&text) {
            return obj;
        }
    }

    debug!(len = text.len(), "all recovery strategies failed");
    JsonObject::new()
}

/// Reassemble newline-delimited streaming envelopes.
///
/// Each envelope line carries a generation fragment under a `response`
/// key; fragments are concatenated in line order. Returns `None` when the
/// text contains no such envelopes, leaving the original untouched.
fn reassemble_stream(text: &str) -> Option<String> {
    let mut fragments: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('{')
            && let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line)
            && let Some(Value::String(frag)) = obj.get("response")
        {
            fragments.push(frag.clone());
            continue;
        }
        // Near-JSON envelope lines (truncated or malformed) still carry
        // the fragment after the "response" key.
        if line.contains("\"response\"")
            && let Some(frag) = heuristic_response_fragment(line)
        {
            fragments.push(frag);
        }
    }

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.concat())
    }
}

/// Naive fragment extraction: everything after `"response":`, trailing
/// commas stripped, outer quotes removed when both are present.
fn heuristic_response_fragment(line: &str) -> Option<String> {
    let key = line.find("\"response\"")?;
    let colon = line[key..].find(':').map(|c| key + c)?;
    let frag = line[colon + 1..].trim();
    let frag = frag.trim_end_matches(',');
    if frag.len() >= 2 && frag.starts_with('"') && frag.ends_with('"') {
        Some(frag[1..frag.len() - 1].to_string())
    } else {
        Some(frag.to_string())
    }
}

/// Some transports unicode-escape the marker angle brackets. Decode
/// `\uXXXX` escapes when the escaped forms are present; if decoding
/// trips on a malformed sequence, fall back to replacing the two known
/// forms literally.
fn unescape_markers(text: &str) -> String {
    if !text.contains("\\u003c") && !text.contains("\\u003e") {
        return text.to_string();
    }
    match decode_unicode_escapes(text) {
        Some(decoded) => decoded,
        None => text.replace("\\u003c", "<").replace("\\u003e", ">"),
    }
}

/// Decode `\uXXXX` sequences, passing every other escape through intact.
fn decode_unicode_escapes(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            if hex.len() < 4 {
                return None;
            }
            let code = u32::from_str_radix(&hex, 16).ok()?;
            out.push(char::from_u32(code)?);
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Strict parse that only accepts a top-level object.
fn parse_object(text: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn direct_parse(text: &str) -> Option<JsonObject> {
    parse_object(text)
}

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "(?s){}(.*?){}",
        regex::escape(JSON_START),
        regex::escape(JSON_END)
    ))
    .unwrap()
});

/// Extract the span between the literal marker tokens.
fn marker_extract(text: &str) -> Option<JsonObject> {
    let captures = MARKER_RE.captures(text)?;
    let candidate = captures.get(1)?.as_str().trim();
    parse_object(candidate).or_else(|| lenient::parse_object(candidate))
}

/// Markers present only in keyword form (e.g. the angle brackets were
/// mangled): take the first `{` after the start keyword and the last `}`
/// before the end keyword.
fn marker_keyword(text: &str) -> Option<JsonObject> {
    let start_kw = text.find("JSON_START")?;
    let end_kw = text.rfind("JSON_END")?;
    let open = text[start_kw..].find('{').map(|i| start_kw + i)?;
    if end_kw <= open {
        return None;
    }
    let close = text[..end_kw].rfind('}')?;
    if close < open {
        return None;
    }
    let candidate = &text[open..=close];
    parse_object(candidate).or_else(|| lenient::parse_object(candidate))
}

/// Scan from the first `{` to its matching `}` by depth counting. No
/// string-literal awareness; one span attempt only.
fn balanced_braces(text: &str) -> Option<JsonObject> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + i + 1];
                    return parse_object(candidate)
                        .or_else(|| lenient::parse_object(candidate));
                }
            }
            _ => {}
        }
    }
    None
}

fn lenient_whole(text: &str) -> Option<JsonObject> {
    lenient::parse_object(text)
}

/// Tolerant parsing for near-valid JSON: repairs trailing commas,
/// single-quoted strings, and bare object keys, then hands the result to
/// the strict parser.
pub mod lenient {
    use super::JsonObject;
    use serde_json::Value;

    pub fn parse_object(text: &str) -> Option<JsonObject> {
        match serde_json::from_str::<Value>(&repair(text)) {
            Ok(Value::Object(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Single-pass repair. Tracks string state so repairs never touch
    /// quoted content.
    fn repair(text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut in_string = false;
        let mut quote = '"';
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if in_string {
                if c == '\\' && i + 1 < chars.len() {
                    // \' is not a JSON escape once the string is
                    // double-quoted
                    if quote == '\'' && chars[i + 1] == '\'' {
                        out.push('\'');
                    } else {
                        out.push(c);
                        out.push(chars[i + 1]);
                    }
                    i += 2;
                    continue;
                }
                if c == quote {
                    in_string = false;
                    out.push('"');
                } else if c == '"' {
                    // double quote inside a single-quoted string
                    out.push('\\');
                    out.push('"');
                } else {
                    out.push(c);
                }
                i += 1;
                continue;
            }

            match c {
                '"' | '\'' => {
                    in_string = true;
                    quote = c;
                    out.push('"');
                    i += 1;
                }
                ',' => {
                    let mut j = i + 1;
                    while j < chars.len() && chars[j].is_whitespace() {
                        j += 1;
                    }
                    // trailing comma before a closing bracket: drop it
                    if !(j < chars.len() && (chars[j] == '}' || chars[j] == ']')) {
                        out.push(c);
                    }
                    i += 1;
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut j = i;
                    while j < chars.len()
                        && (chars[j].is_ascii_alphanumeric() || chars[j] == '_')
                    {
                        j += 1;
                    }
                    let mut k = j;
                    while k < chars.len() && chars[k].is_whitespace() {
                        k += 1;
                    }
                    let word: String = chars[i..j].iter().collect();
                    if k < chars.len() && chars[k] == ':' {
                        // bare object key
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    } else {
                        out.push_str(&word);
                    }
                    i = j;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out
    }

}
