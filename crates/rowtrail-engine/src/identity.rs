//! Identity resolution
//!
//! Derives a stable string identity for a row from the configured
//! primary-key specification. The identity is a pure function of the row's
//! key field values: repeat calls with structurally equal rows produce
//! byte-identical output, which is what makes table+record lookups over the
//! audit trail possible.

use serde_json::Value as JsonValue;

use rowtrail_common::canon::{canonical_row, canonical_value};

use crate::config::{KeySpec, PrimaryKeyMap};
use crate::error::{AuditError, Result};
use crate::record::Row;

/// Resolve the identity string for one row
///
/// # Errors
///
/// - [`AuditError::Configuration`] when no key specification exists for
///   `table`
/// - [`AuditError::MissingKey`] when one or more configured key fields are
///   null or absent on the row
pub fn resolve_identity(row: &Row, table: &str, pk_map: &PrimaryKeyMap) -> Result<String> {
    let spec = pk_map.require(table)?;

    let missing: Vec<String> = spec
        .fields()
        .iter()
        .filter(|field| row.get(**field).is_none_or(JsonValue::is_null))
        .map(|field| (*field).to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AuditError::MissingKey {
            table: table.to_string(),
            fields: missing,
        });
    }

    match spec {
        KeySpec::Single(field) => {
            // Presence was checked above; an absent field here is a logic
            // error, not a recoverable condition.
            let value = row.get(field).ok_or_else(|| {
                AuditError::IdentityResolution(format!(
                    "Key field '{}' vanished between presence check and resolution",
                    field
                ))
            })?;
            Ok(canonical_value(value))
        },
        KeySpec::Composite(fields) => {
            let mut pairs: Vec<(&str, &JsonValue)> = Vec::with_capacity(fields.len());
            for field in fields {
                let value = row.get(field).ok_or_else(|| {
                    AuditError::IdentityResolution(format!(
                        "Key field '{}' vanished between presence check and resolution",
                        field
                    ))
                })?;
                pairs.push((field.as_str(), value));
            }
            Ok(canonical_row(&pairs))
        },
    }
}
