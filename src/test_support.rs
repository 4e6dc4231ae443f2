//! Fixtures for tests that need a real schema

use crate::db_migration::run_migrations;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Fresh in-memory database with every migration applied.
///
/// Capped at one connection: each SQLite memory connection is its own database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub async fn insert_conversation(pool: &SqlitePool, id: i64, topic: &str, description: &str) {
    sqlx::query("INSERT INTO conversations (id, topic, description) VALUES (?, ?, ?)")
        .bind(id)
        .bind(topic)
        .bind(description)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_statement(
    pool: &SqlitePool,
    conversation_id: i64,
    tid: i64,
    pid: i64,
    body: &str,
    active: i64,
    moderation: i64,
) {
    sqlx::query(
        "INSERT INTO statements (conversation_id, tid, pid, body, active, moderation) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(conversation_id)
    .bind(tid)
    .bind(pid)
    .bind(body)
    .bind(active)
    .bind(moderation)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_vote(
    pool: &SqlitePool,
    conversation_id: i64,
    pid: i64,
    tid: i64,
    vote: i64,
    important: bool,
    created: i64,
) {
    sqlx::query(
        "INSERT INTO votes (conversation_id, pid, tid, vote, high_priority, created) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(conversation_id)
    .bind(pid)
    .bind(tid)
    .bind(vote)
    .bind(important as i64)
    .bind(created)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn insert_xid(pool: &SqlitePool, conversation_id: i64, pid: i64, xid: &str) {
    sqlx::query("INSERT INTO participant_xids (conversation_id, pid, xid) VALUES (?, ?, ?)")
        .bind(conversation_id)
        .bind(pid)
        .bind(xid)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_clustering(pool: &SqlitePool, conversation_id: i64, math_tick: i64, data: &str) {
    sqlx::query("INSERT INTO clustering_results (conversation_id, math_tick, data) VALUES (?, ?, ?)")
        .bind(conversation_id)
        .bind(math_tick)
        .bind(data)
        .execute(pool)
        .await
        .unwrap();
}
