//! SQLite database layer for transcript and knowledge storage

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params, params_from_iter};
use tracing::{debug, info, warn};
use uuid::Uuid;

use quorum_core::ports::{KnowledgeStore, TranscriptStore};
use quorum_core::types::{DispatchMode, KnowledgeEntry, StoredMessage};

/// A knowledge row with its storage id, as listed by management commands
#[derive(Debug, Clone)]
pub struct KnowledgeRow {
    pub id: String,
    pub layer: String,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// SQLite database wrapper (thread-safe via Arc<Mutex>)
pub struct ChatDb {
    conn: Arc<Mutex<Connection>>,
}

impl ChatDb {
    /// Open (or create) the database at `path` and initialize the schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        info!("Initializing chat database at {:?}", path.as_ref());
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory database, useful for tests and throwaway sessions
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                model TEXT NOT NULL DEFAULT '',
                mode TEXT NOT NULL DEFAULT 'single',
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS knowledge (
                id TEXT PRIMARY KEY,
                layer TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_layer ON knowledge(layer)",
            [],
        )?;
        Ok(())
    }

    /// Append one transcript row
    pub async fn append_message(
        &self,
        session_id: &str,
        user_name: &str,
        role: &str,
        content: &str,
        model: &str,
        mode: &str,
    ) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let row = (
            session_id.to_owned(),
            user_name.to_owned(),
            role.to_owned(),
            content.to_owned(),
            model.to_owned(),
            mode.to_owned(),
        );

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "INSERT INTO messages (session_id, user_name, role, content, model, mode, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![row.0, row.1, row.2, row.3, row.4, row.5, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// The most recent `limit` messages for a session, oldest first
    pub async fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let conn = Arc::clone(&self.conn);
        let session_id = session_id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT role, content, model, mode, created_at
                 FROM messages
                 WHERE session_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let mut messages = stmt
                .query_map(params![session_id, limit as i64], Self::row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            debug!("loaded {} messages for session {}", messages.len(), session_id);
            Ok(messages)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<StoredMessage> {
        Ok(StoredMessage {
            role: row.get(0)?,
            content: row.get(1)?,
            model: row.get(2)?,
            mode: row.get(3)?,
            created_at: row.get::<_, String>(4)?.parse().unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Insert a knowledge entry, returning its id
    pub async fn add_knowledge(&self, layer: &str, title: &str, content: &str) -> Result<String> {
        let conn = Arc::clone(&self.conn);
        let id = Uuid::new_v4().to_string();
        let row = (id.clone(), layer.to_owned(), title.to_owned(), content.to_owned());

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO knowledge (id, layer, title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![row.0, row.1, row.2, row.3, now],
            )?;
            Ok(row.0)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Update an entry's title and content. Returns false if the id is unknown.
    pub async fn update_knowledge(&self, id: &str, title: &str, content: &str) -> Result<bool> {
        let conn = Arc::clone(&self.conn);
        let row = (id.to_owned(), title.to_owned(), content.to_owned());

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let changed = conn.execute(
                "UPDATE knowledge SET title = ?2, content = ?3, updated_at = ?4 WHERE id = ?1",
                params![row.0, row.1, row.2, Utc::now().to_rfc3339()],
            )?;
            Ok(changed > 0)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Delete an entry. Returns false if the id is unknown.
    pub async fn delete_knowledge(&self, id: &str) -> Result<bool> {
        let conn = Arc::clone(&self.conn);
        let id = id.to_owned();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let changed = conn.execute("DELETE FROM knowledge WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// All entries belonging to any of the given layers
    pub async fn knowledge_for_layers(&self, layers: &[String]) -> Result<Vec<KnowledgeEntry>> {
        if layers.is_empty() {
            return Ok(vec![]);
        }
        let conn = Arc::clone(&self.conn);
        let layers = layers.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let placeholders = vec!["?"; layers.len()].join(", ");
            let sql = format!(
                "SELECT layer, title, content FROM knowledge
                 WHERE layer IN ({placeholders})
                 ORDER BY layer ASC, updated_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params_from_iter(layers.iter()), |row| {
                    Ok(KnowledgeEntry {
                        layer: row.get(0)?,
                        title: row.get(1)?,
                        content: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Every stored knowledge row, for management listings
    pub async fn all_knowledge(&self) -> Result<Vec<KnowledgeRow>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(
                "SELECT id, layer, title, content, updated_at FROM knowledge
                 ORDER BY layer ASC, updated_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(KnowledgeRow {
                        id: row.get(0)?,
                        layer: row.get(1)?,
                        title: row.get(2)?,
                        content: row.get(3)?,
                        updated_at: row.get::<_, String>(4)?.parse().unwrap_or_else(|_| Utc::now()),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    /// Distinct layer names currently in the knowledge base
    pub async fn layers(&self) -> Result<Vec<String>> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare("SELECT DISTINCT layer FROM knowledge ORDER BY layer")?;
            let layers = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(layers)
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}

fn lock(conn: &Arc<Mutex<Connection>>) -> std::sync::MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| {
        warn!("Database mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

#[async_trait]
impl TranscriptStore for ChatDb {
    async fn append(
        &self,
        session_id: &str,
        user_name: &str,
        role: &str,
        content: &str,
        model_label: &str,
        mode: DispatchMode,
    ) -> Result<()> {
        self.append_message(session_id, user_name, role, content, model_label, &mode.to_string())
            .await
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        self.recent_messages(session_id, limit).await
    }
}

#[async_trait]
impl KnowledgeStore for ChatDb {
    async fn entries_for(&self, layers: &[String]) -> Result<Vec<KnowledgeEntry>> {
        self.knowledge_for_layers(layers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> ChatDb {
        ChatDb::in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_append_and_read_back_in_order() {
        let db = db().await;
        db.append_message("s1", "alice", "user", "first", "", "single").await.unwrap();
        db.append_message("s1", "alice", "assistant", "second", "Llama 3.3 70B", "single")
            .await
            .unwrap();

        let messages = db.recent_messages("s1", 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].model, "Llama 3.3 70B");
    }

    #[tokio::test]
    async fn test_recent_keeps_newest_when_over_limit() {
        let db = db().await;
        for i in 0..10 {
            db.append_message("s1", "alice", "user", &format!("turn {i}"), "", "single")
                .await
                .unwrap();
        }

        let messages = db.recent_messages("s1", 3).await.unwrap();
        assert_eq!(messages.len(), 3);
        // Oldest-first ordering over the newest three rows.
        assert_eq!(messages[0].content, "turn 7");
        assert_eq!(messages[2].content, "turn 9");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let db = db().await;
        db.append_message("s1", "alice", "user", "mine", "", "single").await.unwrap();
        db.append_message("s2", "bob", "user", "theirs", "", "single").await.unwrap();

        let messages = db.recent_messages("s1", 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "mine");
    }

    #[tokio::test]
    async fn test_knowledge_layer_filtering() {
        let db = db().await;
        db.add_knowledge("company", "Mission", "Ship useful software.").await.unwrap();
        db.add_knowledge("engineering", "Deploys", "Fridays are frozen.").await.unwrap();
        db.add_knowledge("sales", "Pricing", "See the sheet.").await.unwrap();

        let layers = vec!["company".to_string(), "engineering".to_string()];
        let entries = db.knowledge_for_layers(&layers).await.unwrap();
        assert_eq!(entries.len(), 2);
        // layer ASC ordering
        assert_eq!(entries[0].layer, "company");
        assert_eq!(entries[1].layer, "engineering");
    }

    #[tokio::test]
    async fn test_knowledge_empty_layers_query() {
        let db = db().await;
        db.add_knowledge("company", "Mission", "Ship useful software.").await.unwrap();
        let entries = db.knowledge_for_layers(&[]).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_knowledge() {
        let db = db().await;
        let id = db.add_knowledge("company", "Mission", "v1").await.unwrap();

        assert!(db.update_knowledge(&id, "Mission", "v2").await.unwrap());
        let entries = db.knowledge_for_layers(&["company".to_string()]).await.unwrap();
        assert_eq!(entries[0].content, "v2");

        assert!(db.delete_knowledge(&id).await.unwrap());
        assert!(!db.delete_knowledge(&id).await.unwrap());
        assert!(db.knowledge_for_layers(&["company".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_false() {
        let db = db().await;
        assert!(!db.update_knowledge("nope", "t", "c").await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_layers() {
        let db = db().await;
        db.add_knowledge("sales", "A", "a").await.unwrap();
        db.add_knowledge("company", "B", "b").await.unwrap();
        db.add_knowledge("company", "C", "c").await.unwrap();

        let layers = db.layers().await.unwrap();
        assert_eq!(layers, vec!["company".to_string(), "sales".to_string()]);
    }

    #[tokio::test]
    async fn test_on_disk_database_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quorum.db");
        {
            let db = ChatDb::new(&path).unwrap();
            db.append_message("s1", "alice", "user", "persisted", "", "single")
                .await
                .unwrap();
        }
        let db = ChatDb::new(&path).unwrap();
        let messages = db.recent_messages("s1", 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "persisted");
    }

    #[tokio::test]
    async fn test_port_impls_roundtrip() {
        let db = db().await;
        TranscriptStore::append(&db, "s1", "alice", "user", "via port", "", DispatchMode::Compare)
            .await
            .unwrap();
        let messages = TranscriptStore::recent(&db, "s1", 10).await.unwrap();
        assert_eq!(messages[0].mode, "compare");

        db.add_knowledge("company", "Mission", "Ship useful software.").await.unwrap();
        let entries = KnowledgeStore::entries_for(&db, &["company".to_string()]).await.unwrap();
        assert_eq!(entries.len(), 1);
    }
}
