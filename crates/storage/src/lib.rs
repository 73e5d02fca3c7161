use anyhow::{Context, Result};
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{Role, UserId};

mod db;
mod password;

pub use db::{Db, DbError, Fetched, Param, Params, QueryType, Record, RecordExt};
pub use password::{hash_password, new_salt, verify_password};

/// Owns the SQLite pool. Request handlers get a [`Db`] from it; session
/// persistence lives here because it sits outside the dispatch pipeline.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn db(&self) -> Db {
        Db::new(self.pool.clone())
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserId> {
        let salt = new_salt();
        let values = Params::new()
            .with("username", username)
            .with("email", email)
            .with("role", role.as_str())
            .with("password_hash", hash_password(&salt, password))
            .with("salt", salt);
        let id = self
            .db()
            .insert("users", &values)
            .await
            .with_context(|| format!("failed to create user '{username}'"))?;
        Ok(UserId(id))
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<Map<String, Value>>> {
        let row = sqlx::query("SELECT data FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.get(0);
        let data = serde_json::from_str(&raw)
            .with_context(|| format!("session '{session_id}' holds malformed data"))?;
        Ok(Some(data))
    }

    pub async fn save_session(&self, session_id: &str, data: &Map<String, Value>) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, data, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(session_id)
        .bind(serde_json::to_string(data)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes sessions untouched for longer than `ttl_seconds`.
    pub async fn purge_sessions(&self, ttl_seconds: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE updated_at < datetime('now', ?)")
                .bind(format!("-{} seconds", ttl_seconds.max(0)))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(parent) = sqlite_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(&parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url.strip_prefix("sqlite:")?;
    if rest.starts_with(":memory:") {
        return None;
    }
    let path = rest
        .trim_start_matches("//")
        .split('?')
        .next()
        .filter(|path| !path.is_empty())?;
    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
