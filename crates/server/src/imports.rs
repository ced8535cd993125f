//! Uploaded import tables waiting for a mapping and confirmation.
//!
//! Sessions live in memory only and expire after [`SESSION_TTL_MINUTES`];
//! a restart drops pending imports.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use bow_import::{ImportTarget, Table};

pub const SESSION_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target: ImportTarget,
    pub filename: String,
    pub table: Table,
    pub created_at: DateTime<Utc>,
}

impl ImportSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(SESSION_TTL_MINUTES)
    }
}

#[derive(Default)]
pub struct ImportSessions {
    inner: Mutex<HashMap<Uuid, ImportSession>>,
}

impl ImportSessions {
    pub async fn insert(&self, session: ImportSession, now: DateTime<Utc>) {
        let mut sessions = self.inner.lock().await;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.id, session);
    }

    /// The caller's live session. Other users' sessions look missing.
    pub async fn get(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Option<ImportSession> {
        let mut sessions = self.inner.lock().await;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.get(&id).filter(|s| s.user_id == user_id).cloned()
    }

    pub async fn remove(&self, id: Uuid, user_id: Uuid) -> bool {
        let mut sessions = self.inner.lock().await;
        match sessions.get(&id) {
            Some(s) if s.user_id == user_id => sessions.remove(&id).is_some(),
            _ => false,
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: Uuid, created_at: DateTime<Utc>) -> ImportSession {
        ImportSession {
            id: Uuid::new_v4(),
            user_id,
            target: ImportTarget::Risks,
            filename: "risks.csv".into(),
            table: Table::new(vec!["Title".into()], vec![vec!["Flood".into()]]),
            created_at,
        }
    }

    #[tokio::test]
    async fn sessions_are_private_to_their_owner() {
        let sessions = ImportSessions::default();
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let s = session(owner, now);
        let id = s.id;
        sessions.insert(s, now).await;

        assert!(sessions.get(id, owner, now).await.is_some());
        assert!(sessions.get(id, Uuid::new_v4(), now).await.is_none());
        assert!(!sessions.remove(id, Uuid::new_v4()).await);
        assert!(sessions.remove(id, owner).await);
        assert!(sessions.get(id, owner, now).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let sessions = ImportSessions::default();
        let start = Utc::now();
        let owner = Uuid::new_v4();
        let s = session(owner, start);
        let id = s.id;
        sessions.insert(s, start).await;

        let later = start + Duration::minutes(SESSION_TTL_MINUTES) + Duration::seconds(1);
        assert!(sessions.get(id, owner, later).await.is_none());
        assert_eq!(sessions.len().await, 0);
    }
}
