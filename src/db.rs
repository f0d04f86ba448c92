use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String, // argon2 PHC string
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: OffsetDateTime,
    pub user_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: OffsetDateTime,
}

/// Fields an edit may overwrite. Date and owner are fixed at creation.
#[derive(Debug, Clone)]
pub struct ExpenseChanges {
    pub description: String,
    pub amount: f64,
    pub category: String,
}

pub async fn connect_pool(database_url: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse database url {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to `:memory:` is its own database, so pin the pool to one.
    let mut pool_opts = SqlitePoolOptions::new().max_connections(5);
    if database_url.contains(":memory:") {
        pool_opts = pool_opts
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }
    let pool = pool_opts
        .connect_with(opts)
        .await
        .with_context(|| format!("connect to sqlite via {}", database_url))?;
    Ok(pool)
}

/// Creates the tables when they do not exist yet.
pub async fn create_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE CHECK (length(username) > 0),
            password_hash TEXT NOT NULL
        );"#,
        r#"
        CREATE TABLE IF NOT EXISTS expenses (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL,
            amount      REAL NOT NULL,
            category    TEXT NOT NULL,
            date        TEXT NOT NULL,
            user_id     INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id)
        );"#,
        r#"CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses (user_id, date);"#,
    ];
    for s in &stmts {
        sqlx::query(s).execute(pool).await.with_context(|| {
            format!(
                "create schema: {}",
                s.trim()[..s.trim().len().min(40)].replace('\n', " ")
            )
        })?;
    }
    Ok(())
}

pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .is_ok()
}
