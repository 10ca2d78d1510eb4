//! Credential redaction applied to every structured field before it is written.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Replacement written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

const MAX_FIELD_LEN: usize = 512;

const DENYLIST_KEYS: [&str; 9] = [
    "token",
    "access",
    "refresh",
    "authorization",
    "cookie",
    "password",
    "secret",
    "credential",
    "bearer",
];

/// Redact credential-looking fields in place.
///
/// A field is redacted when its key matches the denylist (case-insensitive
/// substring) and its value carries text, or when a string value itself looks
/// like a bearer header, a JWT, or a long opaque key. Strings longer than
/// 512 bytes are replaced by their digest.
pub fn redact_fields(fields: &mut HashMap<String, Value>) {
    for (key, value) in fields.iter_mut() {
        *value = sanitize_value(key, value);
    }
}

fn sanitize_value(key: &str, value: &Value) -> Value {
    match value {
        Value::String(_) | Value::Object(_) | Value::Array(_) if is_sensitive_key(key) => {
            Value::String(REDACTED.to_string())
        }
        Value::String(s) => sanitize_string(s),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), sanitize_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_value(key, item))
                .collect::<Vec<_>>(),
        ),
        _ => value.clone(),
    }
}

fn sanitize_string(raw: &str) -> Value {
    if looks_like_sensitive_value(raw) {
        return Value::String(REDACTED.to_string());
    }
    if raw.len() > MAX_FIELD_LEN {
        return Value::String(format!("[TRUNCATED:{}]", sha256_prefixed(raw)));
    }
    Value::String(raw.to_string())
}

fn looks_like_sensitive_value(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("bearer ") {
        return true;
    }
    // header.payload.signature
    if raw.matches('.').count() == 2 && raw.len() > 40 && !raw.contains(' ') {
        return true;
    }
    is_long_hex(raw) || is_long_base64(raw)
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

fn is_long_hex(value: &str) -> bool {
    value.len() > 48 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_long_base64(value: &str) -> bool {
    value.len() > 48
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '_')
}

fn sha256_prefixed(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    format!("sha256:{:x}", digest)
}
