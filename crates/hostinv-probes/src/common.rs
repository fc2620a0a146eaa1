//! Helpers shared by the grammars

use hostinv_inventory::ParseFailure;
use regex::Regex;
use serde_json::{Map, Value};

/// Compile a grammar pattern
pub(crate) fn regex(pattern: &str) -> Result<Regex, ParseFailure> {
    Regex::new(pattern).map_err(|e| ParseFailure::new(format!("bad pattern {pattern:?}: {e}")))
}

/// JSON payload that may be one object or an array of objects
///
/// PowerShell's `ConvertTo-Json` emits a bare object when a pipeline yields a
/// single item. Empty output means no items. Array elements that are not
/// objects are counted in the second value.
pub(crate) fn json_objects(raw: &str) -> Result<(Vec<Map<String, Value>>, usize), ParseFailure> {
    let raw = raw.trim_start_matches('\u{feff}').trim();
    if raw.is_empty() {
        return Ok((Vec::new(), 0));
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| ParseFailure::new(format!("invalid JSON: {e}")))?;
    match value {
        Value::Object(object) => Ok((vec![object], 0)),
        Value::Array(items) => {
            let total = items.len();
            let objects: Vec<_> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(object) => Some(object),
                    _ => None,
                })
                .collect();
            let skipped = total - objects.len();
            Ok((objects, skipped))
        }
        other => Err(ParseFailure::new(format!(
            "expected a JSON object or array, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar JSON member rendered as text; blank strings count as absent
pub(crate) fn json_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split `addr:port` (or `addr.port` with `sep = '.'`) at the last separator
///
/// Brackets around IPv6 addresses and `%iface` scopes are dropped, and a
/// wildcard `*` becomes `0.0.0.0`.
pub(crate) fn split_endpoint(endpoint: &str, sep: char) -> Option<(String, u16)> {
    let (address, port) = endpoint.rsplit_once(sep)?;
    let port = port.parse::<u16>().ok()?;

    let address = address.trim_start_matches('[').trim_end_matches(']');
    let address = address.split('%').next().unwrap_or(address);
    let address = if address == "*" || address.is_empty() {
        "0.0.0.0"
    } else {
        address
    };
    Some((address.to_string(), port))
}

/// Fold protocol spellings (`tcp6`, `tcp46`, `udp4`) onto `TCP`/`UDP`
pub(crate) fn normalize_protocol(proto: &str) -> Option<&'static str> {
    let proto = proto.to_ascii_lowercase();
    if proto.starts_with("tcp") {
        Some("TCP")
    } else if proto.starts_with("udp") {
        Some("UDP")
    } else {
        None
    }
}

/// `Key: value` with the key trimmed
pub(crate) fn key_value(line: &str, sep: char) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(sep)?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Split one CSV line, honouring double quotes
pub(crate) fn csv_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

/// Decode the five predefined XML entities
pub(crate) fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
