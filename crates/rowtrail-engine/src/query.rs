//! Read-side queries over the audit table
//!
//! Lookups matching the provisioned indexes: by table+record, by actor,
//! recent-first, by action, recent-per-table. Reads do not participate in
//! mutation transactions and run against a pool.

use sqlx::PgPool;
use tracing::debug;

use crate::config::validate_identifier;
use crate::error::Result;
use crate::record::{AuditAction, AuditRecord};
use crate::schema::AUDIT_COLUMNS;

// ============================================================================
// Query Constants
// ============================================================================

/// Default number of audit records returned per query
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Maximum number of audit records a single query can return.
/// Prevents excessive memory usage and query timeouts.
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// Filter parameters for audit record queries
#[derive(Debug, Clone)]
pub struct AuditQuery {
    /// Filter by audited table name
    pub table_name: Option<String>,
    /// Filter by row identity
    pub record_id: Option<String>,
    /// Filter by actor
    pub actor_id: Option<String>,
    /// Filter by action kind
    pub action: Option<AuditAction>,
    /// Filter by correlation id
    pub transaction_id: Option<String>,
    /// Start timestamp for range query
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// End timestamp for range query
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Include soft-deleted audit rows
    pub include_deleted: bool,
    /// Maximum number of results to return
    pub limit: i64,
    /// Offset for pagination
    pub offset: i64,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            table_name: None,
            record_id: None,
            actor_id: None,
            action: None,
            transaction_id: None,
            start_time: None,
            end_time: None,
            include_deleted: false,
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
        }
    }
}

/// Query audit records with filters, newest first
pub async fn query_audit_records(
    pool: &PgPool,
    audit_table: &str,
    query: AuditQuery,
) -> Result<Vec<AuditRecord>> {
    validate_identifier(audit_table)?;

    let limit = query.limit.min(MAX_QUERY_LIMIT);

    let mut sql = format!("SELECT {} FROM {} WHERE 1=1", AUDIT_COLUMNS, audit_table);

    let mut bind_count = 1;
    let mut conditions = Vec::new();

    if query.table_name.is_some() {
        conditions.push(format!("table_name = ${}", bind_count));
        bind_count += 1;
    }
    if query.record_id.is_some() {
        conditions.push(format!("record_id = ${}", bind_count));
        bind_count += 1;
    }
    if query.actor_id.is_some() {
        conditions.push(format!("actor_id = ${}", bind_count));
        bind_count += 1;
    }
    if query.action.is_some() {
        conditions.push(format!("action = ${}", bind_count));
        bind_count += 1;
    }
    if query.transaction_id.is_some() {
        conditions.push(format!("transaction_id = ${}", bind_count));
        bind_count += 1;
    }
    if query.start_time.is_some() {
        conditions.push(format!("created_at >= ${}", bind_count));
        bind_count += 1;
    }
    if query.end_time.is_some() {
        conditions.push(format!("created_at <= ${}", bind_count));
        bind_count += 1;
    }
    if !query.include_deleted {
        conditions.push("deleted_at IS NULL".to_string());
    }

    for condition in conditions {
        sql.push_str(" AND ");
        sql.push_str(&condition);
    }

    sql.push_str(" ORDER BY created_at DESC, id DESC");
    sql.push_str(&format!(" LIMIT ${}", bind_count));
    bind_count += 1;
    sql.push_str(&format!(" OFFSET ${}", bind_count));

    let mut query_builder = sqlx::query_as::<_, AuditRecord>(&sql);

    if let Some(table_name) = query.table_name {
        query_builder = query_builder.bind(table_name);
    }
    if let Some(record_id) = query.record_id {
        query_builder = query_builder.bind(record_id);
    }
    if let Some(actor_id) = query.actor_id {
        query_builder = query_builder.bind(actor_id);
    }
    if let Some(action) = query.action {
        query_builder = query_builder.bind(action.as_str());
    }
    if let Some(transaction_id) = query.transaction_id {
        query_builder = query_builder.bind(transaction_id);
    }
    if let Some(start_time) = query.start_time {
        query_builder = query_builder.bind(start_time);
    }
    if let Some(end_time) = query.end_time {
        query_builder = query_builder.bind(end_time);
    }

    query_builder = query_builder.bind(limit).bind(query.offset);

    let records = query_builder.fetch_all(pool).await?;

    debug!(count = records.len(), "Queried audit records");

    Ok(records)
}

/// Get the audit trail for one logical row
///
/// Every entry for the given table+record identity, newest first — the
/// lookup the `idx_*_table_record` index exists for.
pub async fn get_record_trail(
    pool: &PgPool,
    audit_table: &str,
    table_name: &str,
    record_id: &str,
    limit: Option<i64>,
) -> Result<Vec<AuditRecord>> {
    validate_identifier(audit_table)?;

    let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT);

    let sql = format!(
        "SELECT {} FROM {} \
         WHERE table_name = $1 AND record_id = $2 AND deleted_at IS NULL \
         ORDER BY created_at DESC, id DESC LIMIT $3",
        AUDIT_COLUMNS, audit_table
    );

    let records = sqlx::query_as::<_, AuditRecord>(&sql)
        .bind(table_name)
        .bind(record_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    debug!(
        table = %table_name,
        record_id = %record_id,
        count = records.len(),
        "Retrieved record trail"
    );

    Ok(records)
}

/// Get the most recent audit records for one actor
pub async fn get_actor_records(
    pool: &PgPool,
    audit_table: &str,
    actor_id: &str,
    limit: Option<i64>,
) -> Result<Vec<AuditRecord>> {
    validate_identifier(audit_table)?;

    let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT);

    let sql = format!(
        "SELECT {} FROM {} \
         WHERE actor_id = $1 AND deleted_at IS NULL \
         ORDER BY created_at DESC, id DESC LIMIT $2",
        AUDIT_COLUMNS, audit_table
    );

    let records = sqlx::query_as::<_, AuditRecord>(&sql)
        .bind(actor_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    debug!(
        actor_id = %actor_id,
        count = records.len(),
        "Retrieved actor records"
    );

    Ok(records)
}
