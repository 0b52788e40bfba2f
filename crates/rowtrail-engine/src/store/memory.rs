//! In-memory store for tests
//!
//! Behaves like the Postgres store at the trait surface: provisioning is
//! idempotent, fetches filter preloaded table rows by value equality, and
//! inserts assign monotonically increasing ids and timestamps. Exposed
//! publicly so integration tests of embedding applications can drive the
//! engine without a database.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};

use rowtrail_common::canon::canonical_json;

use crate::config::validate_identifier;
use crate::error::Result;
use crate::record::{AuditRecord, NewAuditRecord, Row};
use crate::snapshot::Predicate;
use crate::store::AuditStore;

/// In-memory audit store (test double)
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    tables: HashMap<String, Vec<Row>>,
    records: Vec<AuditRecord>,
    provisioned: HashSet<String>,
    next_id: i64,
}

impl MemoryAuditStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Preload a data table with rows for the explicit-read strategy
    pub fn with_table(mut self, table: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(table.into(), rows);
        self
    }

    /// Every audit record written so far, in insertion order
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Audit table names that have been provisioned
    pub fn provisioned_tables(&self) -> &HashSet<String> {
        &self.provisioned
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn provision(&mut self, audit_table: &str) -> Result<()> {
        validate_identifier(audit_table)?;
        self.provisioned.insert(audit_table.to_string());
        Ok(())
    }

    async fn fetch_rows(&mut self, table: &str, predicate: &Predicate) -> Result<Vec<Row>> {
        validate_identifier(table)?;
        predicate.validate()?;

        let rows = self.tables.get(table).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| {
                predicate.conditions().iter().all(|(column, expected)| {
                    let actual = row.get(column).unwrap_or(&JsonValue::Null);
                    canonical_json(actual) == canonical_json(expected)
                })
            })
            .collect())
    }

    async fn insert_records(
        &mut self,
        audit_table: &str,
        records: &[NewAuditRecord],
    ) -> Result<Vec<AuditRecord>> {
        validate_identifier(audit_table)?;

        let now = Utc::now();
        let mut written = Vec::with_capacity(records.len());
        for record in records {
            let persisted = AuditRecord {
                id: self.next_id,
                actor_id: record.actor_id.clone(),
                ip_address: record.ip_address.clone(),
                user_agent: record.user_agent.clone(),
                action: record.action.as_str().to_string(),
                table_name: record.table_name.clone(),
                record_id: record.record_id.clone(),
                old_values: record.old_values.clone(),
                new_values: record.new_values.clone(),
                changed_fields: record.changed_fields.clone(),
                metadata: record.metadata.clone(),
                transaction_id: record.transaction_id.clone(),
                created_at: now,
                deleted_at: None,
            };
            self.next_id += 1;
            self.records.push(persisted.clone());
            written.push(persisted);
        }
        Ok(written)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::AuditAction;
    use serde_json::json;

    fn sample_record() -> NewAuditRecord {
        NewAuditRecord {
            actor_id: None,
            ip_address: None,
            user_agent: None,
            action: AuditAction::Insert,
            table_name: "users".to_string(),
            record_id: "1".to_string(),
            old_values: None,
            new_values: Some(json!({"id": 1})),
            changed_fields: None,
            metadata: None,
            transaction_id: Some("txn".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let mut store = MemoryAuditStore::new();
        let written = store
            .insert_records("audit_logs", &[sample_record(), sample_record()])
            .await
            .unwrap();
        assert_eq!(written[0].id, 1);
        assert_eq!(written[1].id, 2);
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let mut store = MemoryAuditStore::new();
        store.provision("audit_logs").await.unwrap();
        store.provision("audit_logs").await.unwrap();
        assert_eq!(store.provisioned_tables().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_rows_unknown_table_is_empty() {
        let mut store = MemoryAuditStore::new();
        let rows = store.fetch_rows("ghosts", &Predicate::new()).await.unwrap();
        assert!(rows.is_empty());
    }
}
