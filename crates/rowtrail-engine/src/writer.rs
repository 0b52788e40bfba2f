//! Audit record persistence
//!
//! Writes one statement's derived records as a batch through the store
//! seam. The store runs inside the caller's transaction, so a rollback of
//! the mutation rolls the audit trail back with it and a commit makes both
//! durable together. No retries happen here; retry policy belongs to the
//! surrounding transaction/connection layer.

use tracing::debug;

use crate::config::validate_identifier;
use crate::error::Result;
use crate::record::{AuditRecord, NewAuditRecord};
use crate::store::AuditStore;

/// Persist a batch of audit records
///
/// An empty batch short-circuits without touching the store. Persistence
/// failures surface as [`AuditError::Storage`](crate::error::AuditError::Storage);
/// the caller decides whether to fail the containing transaction
/// (recommended: yes, so "the row changed but no audit record exists" can
/// never be observed).
pub async fn write_records<S>(
    store: &mut S,
    audit_table: &str,
    records: &[NewAuditRecord],
) -> Result<Vec<AuditRecord>>
where
    S: AuditStore + ?Sized,
{
    validate_identifier(audit_table)?;

    if records.is_empty() {
        return Ok(Vec::new());
    }

    let written = store.insert_records(audit_table, records).await?;

    debug!(
        audit_table = %audit_table,
        records = written.len(),
        "Audit batch written"
    );

    Ok(written)
}
