//! Store seam
//!
//! The engine reaches its relational store through the [`AuditStore`] trait
//! (dependency injection): a generic execute/query surface covering the three
//! operations the engine needs. The production implementation is
//! [`PgAuditStore`] over a borrowed sqlx `PgConnection`, which composes into
//! whatever transaction the interception layer already runs in.
//! [`MemoryAuditStore`] backs tests.

mod memory;
mod postgres;

pub use memory::MemoryAuditStore;
pub use postgres::PgAuditStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{AuditRecord, NewAuditRecord, Row};
use crate::snapshot::Predicate;

/// Transactional store surface consumed by the audit engine
///
/// Implementations take `&mut self` because every call belongs to one
/// logical operation's transaction; the engine performs no locking or
/// retries of its own on top of this seam.
#[async_trait]
pub trait AuditStore: Send {
    /// Idempotently create the audit table, sequence, and indexes
    ///
    /// Safe to run repeatedly and safe under a concurrent first-run race.
    async fn provision(&mut self, audit_table: &str) -> Result<()>;

    /// Read the rows of `table` matching `predicate`
    ///
    /// Zero matches yields an empty vec. Used by the explicit-read snapshot
    /// strategy, inside the caller's transaction.
    async fn fetch_rows(&mut self, table: &str, predicate: &Predicate) -> Result<Vec<Row>>;

    /// Persist one statement's audit records as a batch
    ///
    /// Returns the records as persisted, with store-assigned ids and
    /// timestamps.
    async fn insert_records(
        &mut self,
        audit_table: &str,
        records: &[NewAuditRecord],
    ) -> Result<Vec<AuditRecord>>;
}
