//! Postgres store integration tests
//!
//! These run against a real database via `#[sqlx::test]` and are ignored by
//! default; run them with `DATABASE_URL` pointing at a PostgreSQL instance:
//!
//! ```text
//! cargo test -p rowtrail-engine --test pg_store -- --ignored
//! ```

use rowtrail_engine::{
    AuditContext, AuditEngine, AuditQuery, AuditStore, EngineConfig, MutationDescriptor,
    PgAuditStore, Predicate, PrimaryKeyMap, Row,
};
use serde_json::json;
use sqlx::PgPool;

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test rows must be objects"),
    }
}

fn users_engine() -> AuditEngine {
    AuditEngine::new(
        EngineConfig::default(),
        PrimaryKeyMap::builder()
            .single("users", "id")
            .build()
            .expect("valid pk map"),
    )
    .expect("valid engine config")
}

async fn create_users_table(pool: &PgPool) -> sqlx::Result<()> {
    sqlx::query(
        "CREATE TABLE users (id BIGINT PRIMARY KEY, email TEXT NOT NULL, name TEXT NOT NULL)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL instance"]
async fn provision_is_idempotent(pool: PgPool) -> sqlx::Result<()> {
    let mut conn = pool.acquire().await?;
    let mut store = PgAuditStore::new(conn.as_mut());

    store.provision("audit_logs").await.expect("first provision");
    store.provision("audit_logs").await.expect("second provision");

    let exists: bool = sqlx::query_scalar("SELECT to_regclass('audit_logs') IS NOT NULL")
        .fetch_one(&pool)
        .await?;
    assert!(exists);
    Ok(())
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL instance"]
async fn mutation_and_audit_share_one_transaction(pool: PgPool) -> sqlx::Result<()> {
    create_users_table(&pool).await?;
    let engine = users_engine();

    {
        let mut conn = pool.acquire().await?;
        let mut store = PgAuditStore::new(conn.as_mut());
        engine.provision(&mut store).await.expect("provision");
    }

    // Committed transaction: both the row and its audit record are durable
    let mut tx = pool.begin().await?;
    let inserted: serde_json::Value = sqlx::query_scalar(
        "INSERT INTO users (id, email, name) VALUES (1, 'a@x.com', 'A') RETURNING to_jsonb(users)",
    )
    .fetch_one(tx.as_mut())
    .await?;
    {
        let mut store = PgAuditStore::new(tx.as_mut());
        let descriptor = MutationDescriptor::insert(
            "users",
            vec![row(inserted)],
        )
        .with_context(AuditContext::builder().actor_id("tester").build());
        engine
            .record_mutation(&mut store, descriptor)
            .await
            .expect("record mutation");
    }
    tx.commit().await?;

    // Rolled-back transaction: neither the row nor its audit record survive
    let mut tx = pool.begin().await?;
    let inserted: serde_json::Value = sqlx::query_scalar(
        "INSERT INTO users (id, email, name) VALUES (2, 'b@x.com', 'B') RETURNING to_jsonb(users)",
    )
    .fetch_one(tx.as_mut())
    .await?;
    {
        let mut store = PgAuditStore::new(tx.as_mut());
        let descriptor = MutationDescriptor::insert("users", vec![row(inserted)]);
        engine
            .record_mutation(&mut store, descriptor)
            .await
            .expect("record mutation");
    }
    tx.rollback().await?;

    let records = rowtrail_engine::query::query_audit_records(
        &pool,
        "audit_logs",
        AuditQuery::default(),
    )
    .await
    .expect("query records");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_id, "1");
    assert_eq!(records[0].actor_id.as_deref(), Some("tester"));
    Ok(())
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL instance"]
async fn fetch_rows_applies_predicate(pool: PgPool) -> sqlx::Result<()> {
    create_users_table(&pool).await?;
    sqlx::query(
        "INSERT INTO users (id, email, name) VALUES (1, 'a@x.com', 'A'), (2, 'b@x.com', 'B')",
    )
    .execute(&pool)
    .await?;

    let mut conn = pool.acquire().await?;
    let mut store = PgAuditStore::new(conn.as_mut());

    let rows = store
        .fetch_rows("users", &Predicate::new().eq("id", json!(2)))
        .await
        .expect("fetch rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&json!("B")));

    let rows = store
        .fetch_rows("users", &Predicate::new().eq("id", json!(99)))
        .await
        .expect("fetch rows");
    assert!(rows.is_empty());
    Ok(())
}

#[sqlx::test]
#[ignore = "requires a PostgreSQL instance"]
async fn record_trail_returns_history_newest_first(pool: PgPool) -> sqlx::Result<()> {
    let engine = users_engine();
    {
        let mut conn = pool.acquire().await?;
        let mut store = PgAuditStore::new(conn.as_mut());
        engine.provision(&mut store).await.expect("provision");

        let descriptor =
            MutationDescriptor::insert("users", vec![row(json!({"id": 7, "name": "A"}))]);
        engine
            .record_mutation(&mut store, descriptor)
            .await
            .expect("insert record");

        let descriptor = MutationDescriptor::update(
            "users",
            Some(vec![row(json!({"id": 7, "name": "A"}))]),
            vec![row(json!({"id": 7, "name": "B"}))],
        );
        engine
            .record_mutation(&mut store, descriptor)
            .await
            .expect("update record");
    }

    let trail =
        rowtrail_engine::query::get_record_trail(&pool, "audit_logs", "users", "7", None)
            .await
            .expect("trail");

    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].action, "UPDATE");
    assert_eq!(trail[1].action, "INSERT");
    assert_eq!(trail[0].changed_fields, Some(vec!["name".to_string()]));
    Ok(())
}
