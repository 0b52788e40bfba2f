//! Audit table DDL
//!
//! SQL text for provisioning the audit store. All statements are generated
//! against a validated identifier; provisioning itself (advisory lock,
//! execution order) lives in the Postgres store implementation.

use crate::config::validate_identifier;
use crate::error::Result;

/// Advisory lock key guarding concurrent first-run provisioning.
///
/// Fixed, documented value (ASCII "rowtrail" as a 64-bit integer). Any two
/// processes provisioning concurrently against the same database serialize
/// on this key.
pub const ADVISORY_LOCK_KEY: i64 = 0x726f_7774_7261_696c;

/// Column list of the audit table, in persisted order
pub const AUDIT_COLUMNS: &str = "id, actor_id, ip_address, user_agent, action, table_name, \
     record_id, old_values, new_values, changed_fields, metadata, \
     transaction_id, created_at, deleted_at";

/// CREATE TABLE statement for the audit table
pub fn create_table_sql(audit_table: &str) -> Result<String> {
    validate_identifier(audit_table)?;
    Ok(format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            actor_id VARCHAR(255),
            ip_address VARCHAR(45),
            user_agent TEXT,
            action VARCHAR(255) NOT NULL,
            table_name VARCHAR(255) NOT NULL,
            record_id VARCHAR(255) NOT NULL,
            old_values JSONB,
            new_values JSONB,
            changed_fields TEXT[],
            metadata JSONB,
            transaction_id VARCHAR(255),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            deleted_at TIMESTAMPTZ
        )
        "#,
        table = audit_table
    ))
}

/// Index statements covering the supported query patterns: lookup by
/// table+record, by actor, recent-first, by action, recent-per-table
pub fn create_index_sql(audit_table: &str) -> Result<Vec<String>> {
    validate_identifier(audit_table)?;
    Ok(vec![
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_table_record ON {t} (table_name, record_id)",
            t = audit_table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_actor ON {t} (actor_id) WHERE actor_id IS NOT NULL",
            t = audit_table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_created_at ON {t} (created_at DESC)",
            t = audit_table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_action ON {t} (action)",
            t = audit_table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_table_created ON {t} (table_name, created_at DESC)",
            t = audit_table
        ),
    ])
}

/// Upgrade statements widening a previously narrower `action` column
///
/// Earlier deployments constrained `action` with a CHECK and a narrower
/// type; both are widened in place so provisioning an existing table is
/// safe.
pub fn widen_action_sql(audit_table: &str) -> Result<Vec<String>> {
    validate_identifier(audit_table)?;
    Ok(vec![
        format!(
            "ALTER TABLE {t} DROP CONSTRAINT IF EXISTS {t}_action_check",
            t = audit_table
        ),
        format!(
            "ALTER TABLE {t} ALTER COLUMN action TYPE VARCHAR(255)",
            t = audit_table
        ),
    ])
}
