// tests/common/mod.rs
// Shared test setup: in-memory sqlite with the full schema

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE tasks (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            priority TEXT,
            deadline INTEGER,
            estimated_duration INTEGER,
            completed_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE task_shares (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role TEXT NOT NULL DEFAULT 'viewer',
            granted_by TEXT NOT NULL REFERENCES users(id),
            granted_at INTEGER NOT NULL,
            UNIQUE(task_id, user_id)
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

pub async fn insert_user(pool: &SqlitePool, id: &str, email: &str) {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, is_active, created_at, updated_at)
         VALUES (?, ?, 'x', TRUE, 0, 0)",
    )
    .bind(id)
    .bind(email)
    .execute(pool)
    .await
    .unwrap();
}
