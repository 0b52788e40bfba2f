//! Canonical value serialization
//!
//! Deterministic textual forms for row values. Record identities and change
//! detection both compare values by their canonical serialized form, so two
//! structurally equal values must always produce byte-identical output,
//! regardless of how they were constructed or which store round-trip
//! produced them.
//!
//! Nested payloads are serialized with object keys in sorted order and a
//! bounded recursion depth; anything nested past the bound is replaced with
//! the fixed [`CYCLIC_PLACEHOLDER`] token instead of diverging. If structured
//! serialization fails for any reason, [`canonical_row`] degrades to a
//! deterministic fallback (sorted field-name list plus count) rather than
//! erroring.

use serde_json::Value;
use std::fmt::Write;

/// Placeholder substituted for values nested beyond the recursion bound.
pub const CYCLIC_PLACEHOLDER: &str = "[Cyclic]";

/// Maximum nesting depth before a value is replaced with the placeholder.
const MAX_DEPTH: usize = 64;

/// Canonical string form of a single scalar-ish value.
///
/// Strings are returned as-is (no surrounding quotes), numbers and booleans
/// in their JSON text form, and structured values as canonical JSON. This is
/// the form used for single-field record identities: the row value `1`
/// becomes `"1"`, `"a@x.com"` stays `"a@x.com"`, and an ISO-8601 timestamp
/// string passes through unchanged.
pub fn canonical_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical_json(other),
    }
}

/// Canonical JSON text of a value: sorted object keys, no whitespace,
/// depth-bounded.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    if write_canonical(&mut out, value, 0).is_err() {
        return fallback_for(value);
    }
    out
}

/// Canonical JSON object built from an explicit field ordering.
///
/// Unlike [`canonical_json`], the top-level field order is the caller's
/// (typically primary-key specification order), so composite identities are
/// stable under the configured order rather than alphabetical order.
pub fn canonical_row(fields: &[(&str, &Value)]) -> String {
    let mut out = String::new();
    let result = (|| -> std::fmt::Result {
        out.push('{');
        for (i, (name, value)) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_json_string(&mut out, name)?;
            out.push(':');
            write_canonical(&mut out, value, 1)?;
        }
        out.push('}');
        Ok(())
    })();

    match result {
        Ok(()) => out,
        Err(_) => {
            // Deterministic last resort: sorted field names plus count.
            let mut names: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
            names.sort_unstable();
            format!("{{fields:[{}],count:{}}}", names.join(","), names.len())
        },
    }
}

fn write_canonical(out: &mut String, value: &Value, depth: usize) -> std::fmt::Result {
    if depth > MAX_DEPTH {
        return write_json_string(out, CYCLIC_PLACEHOLDER);
    }

    match value {
        Value::Null => out.write_str("null"),
        Value::Bool(b) => write!(out, "{}", b),
        // serde_json renders numbers in their JSON text form, which keeps
        // 64-bit integers in exact decimal notation.
        Value::Number(n) => write!(out, "{}", n),
        Value::String(s) => write_json_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item, depth + 1)?;
            }
            out.push(']');
            Ok(())
        },
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(out, key)?;
                out.push(':');
                if let Some(item) = map.get(*key) {
                    write_canonical(out, item, depth + 1)?;
                }
            }
            out.push('}');
            Ok(())
        },
    }
}

fn write_json_string(out: &mut String, s: &str) -> std::fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| std::fmt::Error)?;
    out.write_str(&quoted)
}

fn fallback_for(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
            names.sort_unstable();
            format!("{{fields:[{}],count:{}}}", names.join(","), names.len())
        },
        _ => String::from(CYCLIC_PLACEHOLDER),
    }
}
