//! Audit record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A row snapshot, as reported by the mutating statement or an explicit read
pub type Row = serde_json::Map<String, JsonValue>;

/// Kind of mutating statement being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INSERT" => Ok(Self::Insert),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("Unknown audit action: {}", other)),
        }
    }
}

/// Persisted audit log entry
///
/// One durable entry describing a single row's creation, modification, or
/// removal. `record_id` is non-unique across time: a row mutated many times
/// accumulates many entries under the same identity.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditRecord {
    /// Store-assigned, monotonically increasing identifier
    pub id: i64,
    /// Identity of the actor who triggered the change
    pub actor_id: Option<String>,
    /// Client IP address (IPv4 or IPv6)
    pub ip_address: Option<String>,
    /// Client user agent string
    pub user_agent: Option<String>,
    /// One of INSERT/UPDATE/DELETE
    pub action: String,
    /// Affected logical table
    pub table_name: String,
    /// Stable row identity derived from the primary-key specification
    pub record_id: String,
    /// Row snapshot before the change; null for INSERT, null for UPDATE
    /// with capture disabled, always present for DELETE
    pub old_values: Option<JsonValue>,
    /// Row snapshot after the change; present for INSERT/UPDATE, always
    /// null for DELETE
    pub new_values: Option<JsonValue>,
    /// Field names that differ between old and new values; only present for
    /// UPDATE with before-state capture enabled
    pub changed_fields: Option<Vec<String>>,
    /// Caller-supplied structured context
    pub metadata: Option<JsonValue>,
    /// Correlation identifier shared by records of one logical operation
    pub transaction_id: Option<String>,
    /// Store-assigned insert timestamp
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker for the audit row itself
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for one audit log entry, before store-assigned fields exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub actor_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: String,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
    pub changed_fields: Option<Vec<String>>,
    pub metadata: Option<JsonValue>,
    pub transaction_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(AuditAction::Insert.as_str(), "INSERT");
        assert_eq!(AuditAction::Update.as_str(), "UPDATE");
        assert_eq!(AuditAction::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("insert".parse::<AuditAction>(), Ok(AuditAction::Insert));
        assert_eq!("UPDATE".parse::<AuditAction>(), Ok(AuditAction::Update));
        assert!("TRUNCATE".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&AuditAction::Delete).expect("serialize");
        assert_eq!(json, r#""DELETE""#);

        let action: AuditAction = serde_json::from_str(r#""INSERT""#).expect("deserialize");
        assert_eq!(action, AuditAction::Insert);
    }
}
