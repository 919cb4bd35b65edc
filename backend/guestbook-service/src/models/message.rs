use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type MessageId = i64;

/// Moderation state of a message. Public reads only ever see `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Approved,
    Rejected,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Approved => "approved",
            MessageStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MessageStatus::Pending),
            "approved" => Ok(MessageStatus::Approved),
            "rejected" => Ok(MessageStatus::Rejected),
            other => Err(format!("unknown message status '{}'", other)),
        }
    }
}

/// A stored guestbook entry, either a root message or a reply to one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "message")]
    pub body: String,
    pub language: String,
    pub parent_id: Option<MessageId>,
    pub is_admin_reply: bool,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl Message {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Strips the fields that never leave the service on public reads.
    pub fn redacted(self) -> Self {
        Self {
            email: None,
            ip: None,
            ..self
        }
    }
}

/// Validated input for `MessageStore::insert`. Id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub name: String,
    pub email: Option<String>,
    pub body: String,
    pub language: String,
    pub parent_id: Option<MessageId>,
    pub is_admin_reply: bool,
    pub status: MessageStatus,
    pub ip: Option<String>,
}

/// A root message with its replies, oldest reply first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    #[serde(flatten)]
    pub message: Message,
    pub replies: Vec<Message>,
    pub reply_count: usize,
}

impl Thread {
    pub fn redacted(self) -> Self {
        Self {
            message: self.message.redacted(),
            replies: self.replies.into_iter().map(Message::redacted).collect(),
            reply_count: self.reply_count,
        }
    }
}
