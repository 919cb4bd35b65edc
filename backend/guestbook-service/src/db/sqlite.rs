use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;

use super::{into_messages, MessageRow, MessageStore, RootFilter, StoreResult, MESSAGE_COLUMNS};
use crate::models::{Message, MessageId, MessageStatus, NewMessage};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        message TEXT NOT NULL,
        language TEXT NOT NULL DEFAULT 'global',
        parent_id INTEGER,
        is_admin_reply BOOLEAN NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'approved', 'rejected')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        ip TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_status ON messages (status)",
    "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_parent_id ON messages (parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_language ON messages (language)",
];

/// Timestamps are stored as fixed-width RFC 3339 text so that lexical order
/// in `ORDER BY created_at` matches chronological order.
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// `sqlite::memory:` URLs get a single long-lived connection, since every
    /// new connection would otherwise open its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        tracing::info!(in_memory, "SQLite connection pool established");

        Ok(Self { pool })
    }
}

fn push_root_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a RootFilter) {
    qb.push(" WHERE parent_id IS NULL");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(language) = &filter.language {
        qb.push(" AND language = ").push_bind(language.as_str());
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        tracing::info!("Ensuring SQLite messages schema");
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn insert(&self, message: NewMessage) -> StoreResult<Message> {
        let now = timestamp_now();
        let row: MessageRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO messages
                (name, email, message, language, parent_id, is_admin_reply, status, created_at, updated_at, ip)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.body)
        .bind(&message.language)
        .bind(message.parent_id)
        .bind(message.is_admin_reply)
        .bind(message.status.as_str())
        .bind(&now)
        .bind(&now)
        .bind(&message.ip)
        .fetch_one(&self.pool)
        .await?;

        Message::try_from(row)
    }

    async fn get(&self, id: MessageId) -> StoreResult<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM messages WHERE id = ?",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::try_from).transpose()
    }

    async fn list_roots(&self, filter: &RootFilter) -> StoreResult<Vec<Message>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM messages", MESSAGE_COLUMNS));
        push_root_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ")
                .push_bind(limit)
                .push(" OFFSET ")
                .push_bind(filter.offset);
        }

        let rows: Vec<MessageRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_messages(rows)
    }

    async fn list_replies(
        &self,
        parent_ids: &[MessageId],
        status: Option<MessageStatus>,
    ) -> StoreResult<Vec<Message>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM messages", MESSAGE_COLUMNS));
        qb.push(" WHERE parent_id IN (");
        {
            let mut ids = qb.separated(", ");
            for id in parent_ids {
                ids.push_bind(*id);
            }
        }
        qb.push(")");
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let rows: Vec<MessageRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_messages(rows)
    }

    async fn count_roots(&self, filter: &RootFilter) -> StoreResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM messages");
        push_root_filter(&mut qb, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> StoreResult<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "UPDATE messages SET status = ?, updated_at = ? WHERE id = ? RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(status.as_str())
        .bind(timestamp_now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::try_from).transpose()
    }

    async fn delete_cascade(&self, id: MessageId) -> StoreResult<Vec<MessageId>> {
        let replies: Vec<i64> =
            sqlx::query_scalar("DELETE FROM messages WHERE parent_id = ? RETURNING id")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        let root: Option<i64> = sqlx::query_scalar("DELETE FROM messages WHERE id = ? RETURNING id")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(root.into_iter().chain(replies).collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
