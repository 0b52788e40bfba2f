//! Before-state snapshot acquisition
//!
//! Two strategies exist for obtaining row state around a mutation:
//!
//! - *Explicit read*: run a read against the target table, filtered by the
//!   statement's target predicate, before the mutation executes and inside
//!   the same transaction. Used only when before-state capture is enabled
//!   for UPDATE.
//! - *Returning*: rely on the mutating statement reporting affected-row
//!   content itself (`RETURNING`). Used unconditionally for DELETE removed
//!   state and for INSERT/UPDATE after-state; those rows arrive on the
//!   [`MutationDescriptor`](crate::engine::MutationDescriptor) and need no
//!   code here.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::validate_identifier;
use crate::error::Result;
use crate::record::Row;
use crate::store::AuditStore;

/// Column/value conjunction identifying the rows a statement targets
///
/// An empty predicate matches every row of the table, mirroring an
/// unfiltered UPDATE.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    conditions: Vec<(String, JsonValue)>,
}

impl Predicate {
    /// Create an empty predicate (matches all rows)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition on a column
    pub fn eq(mut self, column: impl Into<String>, value: JsonValue) -> Self {
        self.conditions.push((column.into(), value));
        self
    }

    /// The conditions, in insertion order
    pub fn conditions(&self) -> &[(String, JsonValue)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Validate every referenced column name
    pub fn validate(&self) -> Result<()> {
        for (column, _) in &self.conditions {
            validate_identifier(column)?;
        }
        Ok(())
    }
}

/// Fetch the rows a mutation is about to affect (explicit-read strategy)
///
/// Runs inside the caller's transaction so the snapshot is consistent with
/// the row versions the subsequent mutation will touch, under whatever
/// isolation level the store provides. Zero matching rows yields an empty
/// vec, not an error. Store failures surface as
/// [`AuditError::Storage`](crate::error::AuditError::Storage) and are never
/// swallowed: a read failure here is indistinguishable from "no change
/// needed", and silently skipping the audit record is not acceptable.
pub async fn fetch_before<S>(store: &mut S, table: &str, predicate: &Predicate) -> Result<Vec<Row>>
where
    S: AuditStore + ?Sized,
{
    validate_identifier(table)?;
    predicate.validate()?;

    let rows = store.fetch_rows(table, predicate).await?;

    debug!(
        table = %table,
        conditions = predicate.conditions().len(),
        rows = rows.len(),
        "Fetched before-state snapshot"
    );

    Ok(rows)
}
