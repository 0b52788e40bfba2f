//! Engine configuration
//!
//! The primary-key specification is supplied by the integrating application
//! at engine initialization and is read-only afterward; it is config, not
//! schema introspection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AuditError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default name of the audit table.
pub const DEFAULT_AUDIT_TABLE: &str = "audit_logs";

/// Default before-state capture setting for UPDATE statements.
pub const DEFAULT_CAPTURE_BEFORE: bool = true;

/// Primary-key specification for one table: a single field or an ordered
/// composite field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    /// Single-column primary key
    Single(String),
    /// Composite primary key; field order is identity order
    Composite(Vec<String>),
}

impl KeySpec {
    /// The configured key fields, in specification order
    pub fn fields(&self) -> Vec<&str> {
        match self {
            KeySpec::Single(field) => vec![field.as_str()],
            KeySpec::Composite(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

/// Mapping from table name to primary-key specification
///
/// Constructed once at engine initialization via the builder and read-only
/// afterward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimaryKeyMap {
    tables: HashMap<String, KeySpec>,
}

impl PrimaryKeyMap {
    /// Create a builder for the primary-key map
    pub fn builder() -> PrimaryKeyMapBuilder {
        PrimaryKeyMapBuilder::default()
    }

    /// Look up the key specification for a table
    pub fn get(&self, table: &str) -> Option<&KeySpec> {
        self.tables.get(table)
    }

    /// Look up the key specification, failing when the table has no entry
    pub fn require(&self, table: &str) -> Result<&KeySpec> {
        self.tables.get(table).ok_or_else(|| {
            AuditError::Configuration(format!(
                "No primary-key specification configured for table '{}'",
                table
            ))
        })
    }

    /// Number of configured tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether any table is configured
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Builder for [`PrimaryKeyMap`]
#[derive(Debug, Clone, Default)]
pub struct PrimaryKeyMapBuilder {
    tables: HashMap<String, KeySpec>,
}

impl PrimaryKeyMapBuilder {
    /// Register a single-column primary key for a table
    pub fn single(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.tables.insert(table.into(), KeySpec::Single(field.into()));
        self
    }

    /// Register a composite primary key for a table; field order is
    /// identity order
    pub fn composite<I, S>(mut self, table: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.insert(
            table.into(),
            KeySpec::Composite(fields.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Build the map, validating every entry
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a table name or key field is not
    /// a valid identifier, or when a composite spec is empty.
    pub fn build(self) -> Result<PrimaryKeyMap> {
        for (table, spec) in &self.tables {
            validate_identifier(table)?;
            let fields = spec.fields();
            if fields.is_empty() {
                return Err(AuditError::Configuration(format!(
                    "Empty composite key specification for table '{}'",
                    table
                )));
            }
            for field in fields {
                validate_identifier(field)?;
            }
        }
        Ok(PrimaryKeyMap { tables: self.tables })
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of the audit table records are written to
    pub audit_table: String,

    /// Whether to capture before-state for UPDATE statements. DELETE
    /// before-state comes from the returning strategy and is unaffected.
    pub capture_before: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audit_table: DEFAULT_AUDIT_TABLE.to_string(),
            capture_before: DEFAULT_CAPTURE_BEFORE,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with a custom audit table name
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the table name is not a valid
    /// identifier.
    pub fn with_audit_table(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self {
            audit_table: table,
            ..Self::default()
        })
    }

    /// Disable before-state capture for UPDATE statements
    pub fn without_before_capture(mut self) -> Self {
        self.capture_before = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.audit_table)
    }
}

/// Validate an SQL identifier (table or column name)
///
/// # Rules
/// - Must not be empty
/// - Must not exceed 255 characters
/// - Must contain only letters, digits, and underscores
/// - Must not start with a digit
///
/// Identifiers are interpolated into DDL and predicates, so anything outside
/// this pattern is rejected before it reaches SQL text.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AuditError::Configuration(
            "Identifier is required and cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        // Truncate by characters, not bytes; slicing could split a codepoint
        let preview: String = name.chars().take(32).collect();
        return Err(AuditError::Configuration(format!(
            "Identifier '{}...' exceeds 255 characters",
            preview
        )));
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(AuditError::Configuration(format!(
            "Identifier '{}' cannot start with a digit",
            name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuditError::Configuration(format!(
            "Identifier '{}' can only contain letters, digits, and underscores",
            name
        )));
    }

    Ok(())
}
