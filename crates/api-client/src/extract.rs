//! Minimal scanning extraction over loosely structured response text.
//!
//! This is deliberately not a JSON parser. The upstream API's bodies are only
//! partially and defensively consumed, so these helpers scan for literal
//! patterns and uniformly report absence as emptiness: a missing key, a
//! malformed document, and an empty document are indistinguishable, and none
//! of them raise. Callers depend on that leniency; do not swap in a strict
//! parser.

/// Returns the first quoted string value following `"key"` anywhere in
/// `content`, or `""` if the key is absent or the value is not a quoted
/// string (numbers and `null` are not accepted).
///
/// First match wins: if the key recurs in a nested object earlier in the
/// blob, that occurrence is returned, not necessarily the logically intended
/// one. Callers avoid the ambiguity by feeding per-object spans from
/// [`extract_array_of_objects`]. No escape decoding is performed.
pub fn extract_value(content: &str, key: &str) -> String {
    let needle = format!("\"{key}\"");
    let Some(pos_key) = content.find(&needle) else {
        return String::new();
    };

    let Some(pos_colon) = content[pos_key..].find(':').map(|i| pos_key + i) else {
        return String::new();
    };

    let Some(first) = content[pos_colon..].find('"').map(|i| pos_colon + i) else {
        return String::new();
    };

    let Some(second) = content[first + 1..].find('"').map(|i| first + 1 + i) else {
        return String::new();
    };

    content[first + 1..second].to_string()
}

/// Numeric companion to [`extract_value`]: returns the bare number following
/// `"key":`, or `0.0` when the key is absent or the value does not parse.
/// Same scanning discipline, same absent-means-default contract.
pub fn extract_number(content: &str, key: &str) -> f64 {
    let needle = format!("\"{key}\"");
    let Some(pos_key) = content.find(&needle) else {
        return 0.0;
    };

    let Some(pos_colon) = content[pos_key..].find(':').map(|i| pos_key + i) else {
        return 0.0;
    };

    let rest = content[pos_colon + 1..].trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
        .unwrap_or(rest.len());

    rest[..end].parse::<f64>().unwrap_or(0.0)
}

/// Captures every top-level `{...}` span inside the first `[`-opened array
/// of `content`, verbatim.
///
/// Scanning tracks a string-mode flag toggled by unescaped `"` and a brace
/// depth counter active only outside string mode, so braces inside string
/// values never confuse the depth. Nested objects are not treated specially:
/// a captured top-level span may itself contain raw nested objects, which is
/// intentional — callers only look up flat keys within each span. Empty
/// input or input without `[` yields an empty vector.
pub fn extract_array_of_objects(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let Some(pos) = content.find('[') else {
        return items;
    };

    let bytes = content.as_bytes();
    let mut depth = 0i32;
    let mut start = 0usize;
    let mut in_string = false;
    let mut prev = 0u8;

    for (i, &c) in bytes.iter().enumerate().skip(pos) {
        if c == b'"' && prev != b'\\' {
            in_string = !in_string;
        }

        if !in_string {
            if c == b'{' {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            } else if c == b'}' {
                depth -= 1;
                if depth == 0 {
                    items.push(content[start..=i].to_string());
                }
            }
        }
        prev = c;
    }

    items
}

/// Case-insensitive lookup of a `key: value` header line; the value is
/// returned trimmed, or `""` when no header matches. The key must be the
/// line's header name, not merely appear somewhere in it.
pub fn extract_header_value(headers: &[String], key: &str) -> String {
    let prefix = format!("{}:", key.to_ascii_lowercase());

    for header in headers {
        if header.to_ascii_lowercase().starts_with(&prefix) {
            return header[prefix.len()..].trim().to_string();
        }
    }

    String::new()
}
