//! Persistence adapter for guestbook messages.
//!
//! [`MessageStore`] is the only seam that talks to a database. PostgreSQL and
//! SQLite implementations are interchangeable and chosen from configuration;
//! nothing above this module knows which one is active.

mod postgres;
mod sqlite;

pub use postgres::PgMessageStore;
pub use sqlite::SqliteMessageStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::models::{Message, MessageId, MessageStatus, NewMessage};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("store call timed out")]
    Timeout,

    #[error("malformed row: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Selection of root messages for feed listings.
#[derive(Debug, Clone, Default)]
pub struct RootFilter {
    /// `None` matches every language.
    pub language: Option<String>,
    /// `None` matches every status.
    pub status: Option<MessageStatus>,
    /// `None` returns every match and ignores `offset`.
    pub limit: Option<i64>,
    pub offset: i64,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create the messages table and its indexes if absent. Safe on every boot.
    async fn ensure_schema(&self) -> StoreResult<()>;

    async fn insert(&self, message: NewMessage) -> StoreResult<Message>;

    async fn get(&self, id: MessageId) -> StoreResult<Option<Message>>;

    /// Root messages matching the filter, newest first.
    async fn list_roots(&self, filter: &RootFilter) -> StoreResult<Vec<Message>>;

    /// Replies to any of `parent_ids`, oldest first.
    async fn list_replies(
        &self,
        parent_ids: &[MessageId],
        status: Option<MessageStatus>,
    ) -> StoreResult<Vec<Message>>;

    /// Number of roots matching the filter, ignoring limit and offset.
    async fn count_roots(&self, filter: &RootFilter) -> StoreResult<i64>;

    async fn update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> StoreResult<Option<Message>>;

    /// Delete `id` and every row whose parent is `id`. Not atomic: replies go
    /// first, so a failure in between leaves the root without its replies.
    async fn delete_cascade(&self, id: MessageId) -> StoreResult<Vec<MessageId>>;

    async fn health_check(&self) -> StoreResult<()>;
}

/// Build the store selected by configuration.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn MessageStore>> {
    let store: Arc<dyn MessageStore> = match config.resolved_backend()? {
        StoreBackend::Postgres => {
            Arc::new(PgMessageStore::connect(&config.url, config.max_connections).await?)
        }
        StoreBackend::Sqlite => {
            Arc::new(SqliteMessageStore::connect(&config.url, config.max_connections).await?)
        }
    };
    Ok(store)
}

pub(crate) const MESSAGE_COLUMNS: &str = "id, name, email, message, language, parent_id, \
     is_admin_reply, status, created_at, updated_at, ip";

/// Raw row shape shared by both backends.
#[derive(Debug, FromRow)]
pub(crate) struct MessageRow {
    id: i64,
    name: String,
    email: Option<String>,
    message: String,
    language: String,
    parent_id: Option<i64>,
    is_admin_reply: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ip: Option<String>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> StoreResult<Self> {
        let status = row
            .status
            .parse::<MessageStatus>()
            .map_err(|e| StoreError::Malformed(format!("row {}: {}", row.id, e)))?;

        Ok(Message {
            id: row.id,
            name: row.name,
            email: row.email,
            body: row.message,
            language: row.language,
            parent_id: row.parent_id,
            is_admin_reply: row.is_admin_reply,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            ip: row.ip,
        })
    }
}

pub(crate) fn into_messages(rows: Vec<MessageRow>) -> StoreResult<Vec<Message>> {
    rows.into_iter().map(Message::try_from).collect()
}
