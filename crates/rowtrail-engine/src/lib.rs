//! Rowtrail Audit Engine
//!
//! Change-capture and audit-record derivation for relational stores:
//! intercepted INSERT/UPDATE/DELETE statements become one durable audit
//! record per affected row — who changed what, when, and how — persisted in
//! the same transaction as the mutation.
//!
//! # Architecture
//!
//! The engine is a pipeline of small components, each independent of any
//! one data-access crate:
//!
//! - **Identity resolution** ([`identity`]): stable string identity per row
//!   from a configured primary-key specification
//! - **Snapshot acquisition** ([`snapshot`]): explicit-read before-state,
//!   plus the returning strategy carried on descriptors
//! - **Change detection** ([`diff`]): changed-field computation over
//!   canonical value forms
//! - **Record derivation** ([`builder`], [`record`]): one record per
//!   affected row, batch-atomic
//! - **Persistence** ([`writer`], [`store`]): batched writes through the
//!   [`AuditStore`] seam, inside the caller's transaction
//! - **Facade** ([`engine`]): [`AuditEngine`] and the
//!   [`MutationDescriptor`] collaborator interface the data-access layer
//!   fills in
//!
//! Reads over the recorded trail live in [`query`], and [`schema`] holds
//! the provisioning DDL.
//!
//! # Example
//!
//! ```no_run
//! use rowtrail_engine::{
//!     AuditContext, AuditEngine, EngineConfig, MutationDescriptor, PgAuditStore, PrimaryKeyMap,
//! };
//! use serde_json::json;
//!
//! # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
//! let engine = AuditEngine::new(
//!     EngineConfig::default(),
//!     PrimaryKeyMap::builder().single("users", "id").build()?,
//! )?;
//!
//! let mut tx = pool.begin().await?;
//! {
//!     let mut store = PgAuditStore::new(tx.as_mut());
//!     // ... the application executes its INSERT with RETURNING here ...
//!     let rows = vec![json!({"id": 1, "email": "a@x.com"})
//!         .as_object()
//!         .cloned()
//!         .unwrap_or_default()];
//!     let descriptor = MutationDescriptor::insert("users", rows)
//!         .with_context(AuditContext::builder().actor_id("user-42").build());
//!     engine.record_mutation(&mut store, descriptor).await?;
//! }
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod diff;
pub mod engine;
pub mod error;
pub mod identity;
pub mod query;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod writer;

// Re-export the primary API surface
pub use config::{EngineConfig, KeySpec, PrimaryKeyMap};
pub use context::AuditContext;
pub use engine::{AuditEngine, MutationDescriptor};
pub use error::{AuditError, Result};
pub use query::AuditQuery;
pub use record::{AuditAction, AuditRecord, NewAuditRecord, Row};
pub use snapshot::Predicate;
pub use store::{AuditStore, MemoryAuditStore, PgAuditStore};
