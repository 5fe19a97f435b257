//! Data Access Layer
//!
//! Postgres-backed [`SessionStore`]. Each session is one row: a few columns for
//! lookup plus the whole serialized session as JSONB, replaced on every save.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use talkativ_core::{
    session::{Session, SessionStatus},
    store::SessionStore,
};
use uuid::Uuid;

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Ended => "ended",
    }
}

fn decode(value: serde_json::Value) -> Result<Session> {
    serde_json::from_value(value).context("stored session is not valid JSON for a session")
}

#[async_trait]
impl SessionStore for Db {
    async fn load(&self, session_id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT session_json FROM coaching_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| decode(r.try_get("session_json")?)).transpose()
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let session_json = serde_json::to_value(session)?;
        sqlx::query(
            r#"
            INSERT INTO coaching_sessions (id, user_id, persona_id, status, session_json, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (id) DO UPDATE
            SET status = EXCLUDED.status,
                session_json = EXCLUDED.session_json,
                updated_at = NOW()
            "#,
        )
        .bind(session.session_id)
        .bind(&session.user_id)
        .bind(&session.persona_id)
        .bind(status_label(session.status))
        .bind(session_json)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(
            r#"
            SELECT session_json
            FROM coaching_sessions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| decode(r.try_get("session_json")?))
            .collect()
    }
}
