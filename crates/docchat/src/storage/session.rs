//! SQLite persistence for per-user chat history
//!
//! Not part of the retrieval core: a simple keyed log of completed
//! exchanges, scoped by an opaque user id.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::types::ChatMessage;

/// One persisted chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// Unix milliseconds
    pub created_at: i64,
    /// Unix milliseconds
    pub updated_at: i64,
}

/// SQLite-backed session store
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT    PRIMARY KEY,
                user_id       TEXT    NOT NULL,
                title         TEXT    NOT NULL,
                messages_json TEXT    NOT NULL DEFAULT '[]',
                created_at    INTEGER NOT NULL,
                updated_at    INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user
                ON sessions(user_id, updated_at DESC);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All sessions for a user, newest first
    pub fn sessions_for_user(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, messages_json, created_at, updated_at
             FROM sessions WHERE user_id = ?1 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, user_id, title, messages_json, created_at, updated_at) = row?;
            let messages: Vec<ChatMessage> =
                serde_json::from_str(&messages_json).unwrap_or_default();
            sessions.push(ChatSession {
                id,
                user_id,
                title,
                messages,
                created_at,
                updated_at,
            });
        }
        Ok(sessions)
    }

    /// Insert or update a session; `created_at` is preserved on update
    pub fn upsert_session(&self, session: &ChatSession) -> Result<()> {
        let messages_json = serde_json::to_string(&session.messages)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (id, user_id, title, messages_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 title         = excluded.title,
                 messages_json = excluded.messages_json,
                 updated_at    = excluded.updated_at",
            params![
                session.id,
                session.user_id,
                session.title,
                messages_json,
                session.created_at,
                session.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Delete a session, only if it belongs to the user; idempotent
    pub fn delete_session(&self, user_id: &str, session_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
            params![session_id, user_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, user: &str, updated_at: i64) -> ChatSession {
        ChatSession {
            id: id.to_string(),
            user_id: user.to_string(),
            title: format!("session {}", id),
            messages: vec![
                ChatMessage::user("hello"),
                ChatMessage::assistant("hi there"),
            ],
            created_at: 1000,
            updated_at,
        }
    }

    #[test]
    fn upsert_and_list_roundtrip() {
        let store = SessionStore::in_memory().unwrap();
        store.upsert_session(&session("s1", "u1", 2000)).unwrap();

        let sessions = store.sessions_for_user("u1").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "s1");
        assert_eq!(sessions[0].messages.len(), 2);
        assert_eq!(sessions[0].messages[0].content, "hello");
    }

    #[test]
    fn sessions_are_listed_newest_first() {
        let store = SessionStore::in_memory().unwrap();
        store.upsert_session(&session("old", "u1", 1000)).unwrap();
        store.upsert_session(&session("new", "u1", 3000)).unwrap();

        let sessions = store.sessions_for_user("u1").unwrap();
        assert_eq!(sessions[0].id, "new");
        assert_eq!(sessions[1].id, "old");
    }

    #[test]
    fn upsert_updates_in_place_and_preserves_created_at() {
        let store = SessionStore::in_memory().unwrap();
        store.upsert_session(&session("s1", "u1", 2000)).unwrap();

        let mut updated = session("s1", "u1", 5000);
        updated.title = "renamed".to_string();
        updated.created_at = 9999;
        store.upsert_session(&updated).unwrap();

        let sessions = store.sessions_for_user("u1").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "renamed");
        assert_eq!(sessions[0].created_at, 1000);
        assert_eq!(sessions[0].updated_at, 5000);
    }

    #[test]
    fn delete_is_scoped_to_the_owning_user() {
        let store = SessionStore::in_memory().unwrap();
        store.upsert_session(&session("s1", "u1", 2000)).unwrap();

        store.delete_session("u2", "s1").unwrap();
        assert_eq!(store.sessions_for_user("u1").unwrap().len(), 1);

        store.delete_session("u1", "s1").unwrap();
        assert!(store.sessions_for_user("u1").unwrap().is_empty());

        // Idempotent
        store.delete_session("u1", "s1").unwrap();
    }

    #[test]
    fn users_only_see_their_own_sessions() {
        let store = SessionStore::in_memory().unwrap();
        store.upsert_session(&session("a", "u1", 2000)).unwrap();
        store.upsert_session(&session("b", "u2", 2000)).unwrap();

        assert_eq!(store.sessions_for_user("u1").unwrap().len(), 1);
        assert_eq!(store.sessions_for_user("u2").unwrap().len(), 1);
        assert!(store.sessions_for_user("u3").unwrap().is_empty());
    }
}
