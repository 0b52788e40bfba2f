//! Engine facade and interception seam
//!
//! The data-access layer observes a mutating statement, gathers its
//! affected-row content (returning strategy), and hands the engine a
//! [`MutationDescriptor`]. The engine derives and persists the audit
//! records inside the caller's transaction. This explicit adapter replaces
//! run-time structural interception: the integrating application wires it
//! up once.

use tracing::{info, instrument};

use crate::builder::build_records;
use crate::config::{EngineConfig, PrimaryKeyMap};
use crate::context::AuditContext;
use crate::error::Result;
use crate::record::{AuditAction, AuditRecord, Row};
use crate::snapshot::{fetch_before, Predicate};
use crate::store::AuditStore;
use crate::writer::write_records;

/// One observed mutating statement, as reported by the data-access layer
///
/// `after_rows` (INSERT/UPDATE) and `before_rows` (DELETE) must carry full
/// row content, not just affected counts — the caller ensures the mutating
/// statement requests RETURNING-style reporting even when its own caller
/// did not ask for it.
#[derive(Debug, Clone)]
pub struct MutationDescriptor {
    pub action: AuditAction,
    pub table_name: String,
    pub before_rows: Option<Vec<Row>>,
    pub after_rows: Option<Vec<Row>>,
    pub context: AuditContext,
}

impl MutationDescriptor {
    /// Describe an INSERT with its reported rows
    pub fn insert(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            action: AuditAction::Insert,
            table_name: table.into(),
            before_rows: None,
            after_rows: Some(rows),
            context: AuditContext::new(),
        }
    }

    /// Describe an UPDATE with optional before-state and reported after-state
    pub fn update(table: impl Into<String>, before: Option<Vec<Row>>, after: Vec<Row>) -> Self {
        Self {
            action: AuditAction::Update,
            table_name: table.into(),
            before_rows: before,
            after_rows: Some(after),
            context: AuditContext::new(),
        }
    }

    /// Describe a DELETE with its removed rows
    pub fn delete(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            action: AuditAction::Delete,
            table_name: table.into(),
            before_rows: Some(rows),
            after_rows: None,
            context: AuditContext::new(),
        }
    }

    /// Attach the ambient context for this operation
    pub fn with_context(mut self, context: AuditContext) -> Self {
        self.context = context;
        self
    }
}

/// Change-capture audit engine
///
/// Holds only read-only state (configuration and the primary-key map);
/// concurrent operations share it freely and interleave at the store level
/// under the enclosing transactions' isolation.
#[derive(Debug, Clone)]
pub struct AuditEngine {
    config: EngineConfig,
    pk_map: PrimaryKeyMap,
}

impl AuditEngine {
    /// Create an engine from validated configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the audit table name is invalid.
    pub fn new(config: EngineConfig, pk_map: PrimaryKeyMap) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, pk_map })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pk_map(&self) -> &PrimaryKeyMap {
        &self.pk_map
    }

    /// Provision the audit table through the given store
    pub async fn provision<S>(&self, store: &mut S) -> Result<()>
    where
        S: AuditStore + ?Sized,
    {
        store.provision(&self.config.audit_table).await
    }

    /// Explicit-read strategy: fetch a mutation's before-state
    ///
    /// Returns `None` when before-state capture is disabled, so the
    /// interception layer can call this unconditionally ahead of every
    /// UPDATE. Must run inside the same transaction as the mutation.
    pub async fn capture_before<S>(
        &self,
        store: &mut S,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Option<Vec<Row>>>
    where
        S: AuditStore + ?Sized,
    {
        if !self.config.capture_before {
            return Ok(None);
        }
        fetch_before(store, table, predicate).await.map(Some)
    }

    /// Derive and persist the audit records for one mutating statement
    ///
    /// Build and write run as one sequential unit inside the caller's
    /// transaction. Zero affected rows yields zero records without error;
    /// any failure aborts the whole batch and propagates for the caller to
    /// fail the transaction with.
    #[instrument(skip(self, store, descriptor), fields(
        action = %descriptor.action,
        table = %descriptor.table_name,
    ))]
    pub async fn record_mutation<S>(
        &self,
        store: &mut S,
        descriptor: MutationDescriptor,
    ) -> Result<Vec<AuditRecord>>
    where
        S: AuditStore + ?Sized,
    {
        let records = build_records(
            descriptor.action,
            &descriptor.table_name,
            &self.pk_map,
            &descriptor.context,
            descriptor.before_rows.as_deref(),
            descriptor.after_rows.as_deref(),
            self.config.capture_before,
        )?;

        let written = write_records(store, &self.config.audit_table, &records).await?;

        info!(records = written.len(), "Recorded mutation");
        Ok(written)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryAuditStore;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    fn engine() -> AuditEngine {
        AuditEngine::new(
            EngineConfig::default(),
            PrimaryKeyMap::builder().single("users", "id").build().unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_insert_mutation() {
        let mut store = MemoryAuditStore::new();
        let descriptor =
            MutationDescriptor::insert("users", vec![row(json!({"id": 1, "name": "A"}))]);

        let written = engine().record_mutation(&mut store, descriptor).await.unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].action, "INSERT");
        assert_eq!(written[0].record_id, "1");
    }

    #[tokio::test]
    async fn test_zero_row_delete_yields_no_records() {
        let mut store = MemoryAuditStore::new();
        let descriptor = MutationDescriptor::delete("users", Vec::new());

        let written = engine().record_mutation(&mut store, descriptor).await.unwrap();
        assert!(written.is_empty());
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_capture_before_respects_toggle() {
        let mut store = MemoryAuditStore::new()
            .with_table("users", vec![row(json!({"id": 1, "name": "A"}))]);

        let enabled = engine();
        let rows = enabled
            .capture_before(&mut store, "users", &Predicate::new().eq("id", json!(1)))
            .await
            .unwrap();
        assert_eq!(rows.map(|r| r.len()), Some(1));

        let disabled = AuditEngine::new(
            EngineConfig::default().without_before_capture(),
            PrimaryKeyMap::builder().single("users", "id").build().unwrap(),
        )
        .unwrap();
        let rows = disabled
            .capture_before(&mut store, "users", &Predicate::new().eq("id", json!(1)))
            .await
            .unwrap();
        assert!(rows.is_none());
    }

    #[tokio::test]
    async fn test_failed_build_writes_nothing() {
        let mut store = MemoryAuditStore::new();
        // Table has no key spec configured
        let descriptor = MutationDescriptor::insert("orders", vec![row(json!({"id": 1}))]);

        let result = engine().record_mutation(&mut store, descriptor).await;
        assert!(result.is_err());
        assert!(store.records().is_empty());
    }
}
