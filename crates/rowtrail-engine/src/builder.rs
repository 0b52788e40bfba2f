//! Audit record derivation
//!
//! Assembles one [`NewAuditRecord`] per affected row from the snapshots a
//! mutating statement reported. A batch is all-or-nothing: any row whose
//! identity cannot be resolved aborts the remaining records, and nothing is
//! handed to the writer.

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::PrimaryKeyMap;
use crate::context::AuditContext;
use crate::diff::diff;
use crate::error::{AuditError, Result};
use crate::identity::resolve_identity;
use crate::record::{AuditAction, NewAuditRecord, Row};

/// Build the audit records for one mutating statement
///
/// One record per row in whichever of `before`/`after` has entries. When
/// both are present they must correspond row-for-row. Every record of the
/// batch shares one transaction id, taken from the context or generated
/// once per call.
///
/// For UPDATE with before-state capture disabled, `old_values` and
/// `changed_fields` are absent even when a before snapshot was supplied;
/// DELETE before-state comes from the returning strategy and is unaffected
/// by the capture flag.
///
/// # Errors
///
/// - [`AuditError::Configuration`] when before/after lengths disagree or a
///   snapshot required by the action is missing
/// - [`AuditError::MissingKey`] / [`AuditError::Configuration`] from
///   identity resolution, aborting the batch
pub fn build_records(
    action: AuditAction,
    table: &str,
    pk_map: &PrimaryKeyMap,
    context: &AuditContext,
    before: Option<&[Row]>,
    after: Option<&[Row]>,
    capture_before: bool,
) -> Result<Vec<NewAuditRecord>> {
    if let (Some(before_rows), Some(after_rows)) = (before, after) {
        if before_rows.len() != after_rows.len() {
            return Err(AuditError::Configuration(format!(
                "Before/after row counts disagree for table '{}': {} vs {}",
                table,
                before_rows.len(),
                after_rows.len()
            )));
        }
    }

    let row_count = before
        .map(<[Row]>::len)
        .max(after.map(<[Row]>::len))
        .unwrap_or(0);

    // One correlation id per statement, shared by every record of the batch
    let transaction_id = context
        .transaction_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut records = Vec::with_capacity(row_count);

    for i in 0..row_count {
        let before_row = before.and_then(|rows| rows.get(i));
        let after_row = after.and_then(|rows| rows.get(i));

        let identity_row = after_row.or(before_row).ok_or_else(|| {
            AuditError::IdentityResolution(format!(
                "Row {} of table '{}' has neither before nor after state",
                i, table
            ))
        })?;
        let record_id = resolve_identity(identity_row, table, pk_map)?;

        let (old_values, new_values, changed_fields) = match action {
            AuditAction::Insert => {
                let after_row = require_snapshot(after_row, "after", action, table, i)?;
                (None, Some(to_value(after_row)), None)
            },
            AuditAction::Update => {
                let after_row = require_snapshot(after_row, "after", action, table, i)?;
                let captured = if capture_before { before_row } else { None };
                let changed = captured.map(|old| diff(old, after_row));
                (captured.map(to_value), Some(to_value(after_row)), changed)
            },
            AuditAction::Delete => {
                let before_row = require_snapshot(before_row, "before", action, table, i)?;
                (Some(to_value(before_row)), None, None)
            },
        };

        records.push(NewAuditRecord {
            actor_id: context.actor_id.clone(),
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            action,
            table_name: table.to_string(),
            record_id,
            old_values,
            new_values,
            changed_fields,
            metadata: context.metadata.clone(),
            transaction_id: Some(transaction_id.clone()),
        });
    }

    Ok(records)
}

fn require_snapshot<'a>(
    row: Option<&'a Row>,
    side: &str,
    action: AuditAction,
    table: &str,
    index: usize,
) -> Result<&'a Row> {
    row.ok_or_else(|| {
        AuditError::Configuration(format!(
            "{} on table '{}' did not report {}-state for row {}",
            action, table, side, index
        ))
    })
}

fn to_value(row: &Row) -> JsonValue {
    JsonValue::Object(row.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    fn users_map() -> PrimaryKeyMap {
        PrimaryKeyMap::builder().single("users", "id").build().unwrap()
    }

    #[test]
    fn test_insert_record() {
        let after = vec![row(json!({"id": 1, "email": "a@x.com", "name": "A"}))];
        let records = build_records(
            AuditAction::Insert,
            "users",
            &users_map(),
            &AuditContext::new(),
            None,
            Some(&after),
            true,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.action, AuditAction::Insert);
        assert_eq!(record.table_name, "users");
        assert_eq!(record.record_id, "1");
        assert!(record.old_values.is_none());
        assert_eq!(
            record.new_values,
            Some(json!({"id": 1, "email": "a@x.com", "name": "A"}))
        );
        assert!(record.changed_fields.is_none());
        assert!(record.transaction_id.is_some());
    }

    #[test]
    fn test_update_with_capture() {
        let before = vec![row(json!({"id": 1, "name": "A"}))];
        let after = vec![row(json!({"id": 1, "name": "B"}))];
        let records = build_records(
            AuditAction::Update,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&before),
            Some(&after),
            true,
        )
        .unwrap();

        let record = &records[0];
        assert_eq!(record.old_values, Some(json!({"id": 1, "name": "A"})));
        assert_eq!(record.new_values, Some(json!({"id": 1, "name": "B"})));
        assert_eq!(record.changed_fields, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_update_without_capture_nulls_before_side() {
        let before = vec![row(json!({"id": 1, "name": "A"}))];
        let after = vec![row(json!({"id": 1, "name": "B"}))];
        let records = build_records(
            AuditAction::Update,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&before),
            Some(&after),
            false,
        )
        .unwrap();

        let record = &records[0];
        assert!(record.old_values.is_none());
        assert!(record.changed_fields.is_none());
        assert_eq!(record.new_values, Some(json!({"id": 1, "name": "B"})));
    }

    #[test]
    fn test_empty_diff_update_still_produces_record() {
        let rows = vec![row(json!({"id": 1, "name": "A"}))];
        let records = build_records(
            AuditAction::Update,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&rows),
            Some(&rows.clone()),
            true,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].changed_fields, Some(Vec::new()));
    }

    #[test]
    fn test_delete_record() {
        let before = vec![row(json!({"id": 1, "name": "B"}))];
        let records = build_records(
            AuditAction::Delete,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&before),
            None,
            true,
        )
        .unwrap();

        let record = &records[0];
        assert_eq!(record.old_values, Some(json!({"id": 1, "name": "B"})));
        assert!(record.new_values.is_none());
        assert!(record.changed_fields.is_none());
    }

    #[test]
    fn test_zero_rows_builds_zero_records() {
        let records = build_records(
            AuditAction::Delete,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&[]),
            None,
            true,
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_bulk_batch_shares_transaction_id() {
        let before: Vec<Row> = (1..=3).map(|i| row(json!({"id": i, "name": "A"}))).collect();
        let after: Vec<Row> = (1..=3).map(|i| row(json!({"id": i, "name": "B"}))).collect();
        let records = build_records(
            AuditAction::Update,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&before),
            Some(&after),
            true,
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        let txn = records[0].transaction_id.clone().unwrap();
        assert!(records.iter().all(|r| r.transaction_id.as_deref() == Some(txn.as_str())));
        let ids: Vec<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_caller_supplied_transaction_id_wins() {
        let context = AuditContext::builder().transaction_id("txn-42").build();
        let after = vec![row(json!({"id": 1}))];
        let records = build_records(
            AuditAction::Insert,
            "users",
            &users_map(),
            &context,
            None,
            Some(&after),
            true,
        )
        .unwrap();
        assert_eq!(records[0].transaction_id.as_deref(), Some("txn-42"));
    }

    #[test]
    fn test_context_fields_are_copied() {
        let context = AuditContext::builder()
            .actor_id("user-9")
            .ip_address("10.0.0.1")
            .user_agent("svc/2.0")
            .metadata(json!({"reason": "backfill"}))
            .build();
        let after = vec![row(json!({"id": 1}))];
        let records = build_records(
            AuditAction::Insert,
            "users",
            &users_map(),
            &context,
            None,
            Some(&after),
            true,
        )
        .unwrap();

        let record = &records[0];
        assert_eq!(record.actor_id.as_deref(), Some("user-9"));
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.user_agent.as_deref(), Some("svc/2.0"));
        assert_eq!(record.metadata, Some(json!({"reason": "backfill"})));
    }

    #[test]
    fn test_mismatched_batch_lengths() {
        let before = vec![row(json!({"id": 1}))];
        let after = vec![row(json!({"id": 1})), row(json!({"id": 2}))];
        let result = build_records(
            AuditAction::Update,
            "users",
            &users_map(),
            &AuditContext::new(),
            Some(&before),
            Some(&after),
            true,
        );
        assert!(matches!(result, Err(AuditError::Configuration(_))));
    }

    #[test]
    fn test_unresolvable_row_aborts_batch() {
        // Second row lacks the key field; no partial batch comes back
        let after = vec![row(json!({"id": 1})), row(json!({"email": "x@y.z"}))];
        let result = build_records(
            AuditAction::Insert,
            "users",
            &users_map(),
            &AuditContext::new(),
            None,
            Some(&after),
            true,
        );
        assert!(matches!(result, Err(AuditError::MissingKey { .. })));
    }
}
