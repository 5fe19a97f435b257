//! Persistence seam for sessions.
//!
//! A store is a key-value map from session id to the serialized session.
//! The orchestrator writes through it on every state change, and reads from
//! it when a session is not in memory.

use crate::session::Session;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Inserts or replaces the whole session record.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Sessions started by `user_id`, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>>;
}

/// Process-local store. Sessions do not survive a restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemorySessionStore::new();
        let session = Session::new("user_1", "sujin_friend", None, "야! 왔어?");
        store.save(&session).await.unwrap();

        assert_eq!(store.load(session.session_id).await.unwrap(), Some(session));
        assert_eq!(store.load(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_for_user_is_newest_first() {
        let store = InMemorySessionStore::new();
        let mut older = Session::new("user_1", "sujin_friend", None, "안녕");
        older.created_at -= Duration::minutes(5);
        let newer = Session::new("user_1", "professor_kim", None, "어서 오세요.");
        let other = Session::new("user_2", "professor_kim", None, "어서 오세요.");
        for s in [&older, &newer, &other] {
            store.save(s).await.unwrap();
        }

        let listed = store.list_for_user("user_1").await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|s| s.session_id).collect();
        assert_eq!(ids, vec![newer.session_id, older.session_id]);
    }
}
