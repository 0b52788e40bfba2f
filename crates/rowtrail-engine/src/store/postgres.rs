//! PostgreSQL store implementation
//!
//! Borrows the caller's `PgConnection` — typically obtained from a
//! transaction the interception layer already opened around the mutation —
//! so audit reads and writes commit and roll back together with the change
//! they describe.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgConnection;
use tracing::debug;

use crate::config::validate_identifier;
use crate::error::Result;
use crate::record::{AuditRecord, NewAuditRecord, Row};
use crate::schema;
use crate::snapshot::Predicate;
use crate::store::AuditStore;

/// sqlx-backed audit store over a borrowed Postgres connection
pub struct PgAuditStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgAuditStore<'c> {
    /// Wrap a connection; pass `tx.as_mut()` to run inside a transaction
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    async fn run_provision(&mut self, audit_table: &str) -> Result<()> {
        sqlx::query(&schema::create_table_sql(audit_table)?)
            .execute(&mut *self.conn)
            .await?;

        // Widening is safe on freshly created tables too; the DDL is a
        // no-op when the column is already VARCHAR(255).
        for statement in schema::widen_action_sql(audit_table)? {
            sqlx::query(&statement).execute(&mut *self.conn).await?;
        }

        for statement in schema::create_index_sql(audit_table)? {
            sqlx::query(&statement).execute(&mut *self.conn).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl AuditStore for PgAuditStore<'_> {
    async fn provision(&mut self, audit_table: &str) -> Result<()> {
        validate_identifier(audit_table)?;

        // Serialize concurrent first runs on the documented advisory key.
        // Session-level lock: released explicitly below, including on the
        // error path, so a failed provision does not wedge other sessions.
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(schema::ADVISORY_LOCK_KEY)
            .execute(&mut *self.conn)
            .await?;

        let result = self.run_provision(audit_table).await;

        let unlock = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(schema::ADVISORY_LOCK_KEY)
            .execute(&mut *self.conn)
            .await;

        result?;
        unlock?;

        debug!(audit_table = %audit_table, "Audit table provisioned");
        Ok(())
    }

    async fn fetch_rows(&mut self, table: &str, predicate: &Predicate) -> Result<Vec<Row>> {
        validate_identifier(table)?;
        predicate.validate()?;

        // Rows come back as jsonb so the engine stays agnostic of the
        // target table's column types; predicate values are compared in
        // their jsonb rendering for the same reason.
        let mut sql = format!("SELECT to_jsonb(t) FROM {} t", table);
        for (i, (column, _)) in predicate.conditions().iter().enumerate() {
            if i == 0 {
                sql.push_str(" WHERE ");
            } else {
                sql.push_str(" AND ");
            }
            sql.push_str(&format!("to_jsonb(t.{}) = ${}", column, i + 1));
        }

        let mut query = sqlx::query_scalar::<_, JsonValue>(&sql);
        for (_, value) in predicate.conditions() {
            query = query.bind(Json(value.clone()));
        }

        let values = query.fetch_all(&mut *self.conn).await?;

        let mut rows = Vec::with_capacity(values.len());
        for value in values {
            rows.push(serde_json::from_value::<Row>(value)?);
        }
        Ok(rows)
    }

    async fn insert_records(
        &mut self,
        audit_table: &str,
        records: &[NewAuditRecord],
    ) -> Result<Vec<AuditRecord>> {
        validate_identifier(audit_table)?;

        let sql = format!(
            r#"
            INSERT INTO {table} (
                actor_id, ip_address, user_agent, action, table_name,
                record_id, old_values, new_values, changed_fields,
                metadata, transaction_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {columns}
            "#,
            table = audit_table,
            columns = schema::AUDIT_COLUMNS,
        );

        let mut written = Vec::with_capacity(records.len());
        for record in records {
            let persisted = sqlx::query_as::<_, AuditRecord>(&sql)
                .bind(&record.actor_id)
                .bind(&record.ip_address)
                .bind(&record.user_agent)
                .bind(record.action.as_str())
                .bind(&record.table_name)
                .bind(&record.record_id)
                .bind(&record.old_values)
                .bind(&record.new_values)
                .bind(&record.changed_fields)
                .bind(&record.metadata)
                .bind(&record.transaction_id)
                .fetch_one(&mut *self.conn)
                .await?;
            written.push(persisted);
        }

        debug!(
            audit_table = %audit_table,
            records = written.len(),
            "Inserted audit records"
        );

        Ok(written)
    }
}
