// Guestbook service - validation, moderation policy and threading over the message store
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::ValidateEmail;

use crate::config::Config;
use crate::db::{MessageStore, RootFilter, StoreError, StoreResult};
use crate::error::{AppError, Result};
use crate::language;
use crate::models::{Message, MessageId, MessageStatus, NewMessage, Thread};
use crate::services::moderation::{self, ModerationPolicy};
use crate::services::thread;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_BODY_CHARS: usize = 2000;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A visitor submission as received, before validation.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub name: String,
    pub email: Option<String>,
    pub body: String,
    pub language: Option<String>,
    pub parent_id: Option<MessageId>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl Pagination {
    fn new(total: i64, request: PageRequest) -> Self {
        let limit = request.limit as i64;
        Self {
            total,
            page: request.page,
            limit: request.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }

    /// Everything on a single page.
    fn unpaged(total: i64) -> Self {
        Self {
            total,
            page: 1,
            limit: u32::try_from(total).unwrap_or(u32::MAX),
            total_pages: total.min(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub threads: Vec<Thread>,
    pub pagination: Pagination,
}

pub struct GuestbookService {
    store: Arc<dyn MessageStore>,
    policy: ModerationPolicy,
    timeout: Duration,
    admin_name: String,
}

impl GuestbookService {
    pub fn new(store: Arc<dyn MessageStore>, config: &Config) -> Self {
        Self {
            store,
            policy: config.moderation.default_status,
            timeout: Duration::from_secs(config.database.timeout_secs),
            admin_name: config.admin.display_name.clone(),
        }
    }

    /// Run a store call under the configured deadline.
    async fn timed<T>(&self, call: impl Future<Output = StoreResult<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(StoreError::Timeout.into()),
        }
    }

    /// Approved threads for visitors, with contact fields stripped.
    pub async fn public_feed(&self, language: Option<String>, page: PageRequest) -> Result<FeedPage> {
        let mut feed = self
            .feed(language, Some(MessageStatus::Approved), Some(page))
            .await?;
        feed.threads = feed.threads.into_iter().map(Thread::redacted).collect();
        Ok(feed)
    }

    /// Threads in every status, for moderation. Without a page request
    /// every root is returned.
    pub async fn admin_feed(
        &self,
        language: Option<String>,
        page: Option<PageRequest>,
    ) -> Result<FeedPage> {
        self.feed(language, None, page).await
    }

    async fn feed(
        &self,
        language: Option<String>,
        status: Option<MessageStatus>,
        page: Option<PageRequest>,
    ) -> Result<FeedPage> {
        let filter = RootFilter {
            language,
            status,
            limit: page.map(|p| p.limit as i64),
            offset: page.map(|p| p.offset()).unwrap_or(0),
        };

        let total = self.timed(self.store.count_roots(&filter)).await?;
        let roots = self.timed(self.store.list_roots(&filter)).await?;
        let root_ids: Vec<MessageId> = roots.iter().map(|m| m.id).collect();
        let replies = self.timed(self.store.list_replies(&root_ids, status)).await?;

        Ok(FeedPage {
            threads: thread::aggregate(roots, replies),
            pagination: match page {
                Some(page) => Pagination::new(total, page),
                None => Pagination::unpaged(total),
            },
        })
    }

    pub async fn submit(&self, submission: Submission) -> Result<Message> {
        let name = validate_name(&submission.name)?;
        let body = validate_body(&submission.body)?;
        let email = validate_email(submission.email.as_deref())?;
        let mut language = language::normalize_checked(submission.language.as_deref())?;

        if let Some(parent_id) = submission.parent_id {
            let parent = self.root_parent(parent_id).await?;
            // Visitors only see approved threads, so anything else looks missing.
            if parent.status != MessageStatus::Approved {
                return Err(not_found(parent_id));
            }
            language = parent.language;
        }

        let message = self
            .timed(self.store.insert(NewMessage {
                name,
                email,
                body,
                language,
                parent_id: submission.parent_id,
                is_admin_reply: false,
                status: self.policy.initial_status(),
                ip: submission.ip,
            }))
            .await?;

        tracing::info!(
            message_id = message.id,
            status = %message.status,
            language = %message.language,
            "Message submitted"
        );
        Ok(message)
    }

    pub async fn admin_reply(&self, parent_id: MessageId, body: &str) -> Result<Message> {
        let body = validate_body(body)?;
        let parent = self.root_parent(parent_id).await?;

        let reply = self
            .timed(self.store.insert(NewMessage {
                name: self.admin_name.clone(),
                email: None,
                body,
                language: parent.language,
                parent_id: Some(parent.id),
                is_admin_reply: true,
                status: MessageStatus::Approved,
                ip: None,
            }))
            .await?;

        tracing::info!(message_id = reply.id, parent_id, "Admin reply posted");
        Ok(reply)
    }

    pub async fn set_status(&self, id: MessageId, target: MessageStatus) -> Result<Message> {
        let current = self
            .timed(self.store.get(id))
            .await?
            .ok_or_else(|| not_found(id))?;

        moderation::check_transition(&current, target)?;

        let updated = self
            .timed(self.store.update_status(id, target))
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(
            message_id = id,
            from = %current.status,
            to = %updated.status,
            "Message reviewed"
        );
        Ok(updated)
    }

    pub async fn delete(&self, id: MessageId) -> Result<Vec<MessageId>> {
        let deleted = self.timed(self.store.delete_cascade(id)).await?;
        if deleted.is_empty() {
            return Err(not_found(id));
        }

        tracing::info!(message_id = id, deleted = ?deleted, "Message deleted");
        Ok(deleted)
    }

    pub async fn health(&self) -> Result<()> {
        self.timed(self.store.health_check()).await
    }

    /// Load a reply target, which must exist and be a root.
    async fn root_parent(&self, parent_id: MessageId) -> Result<Message> {
        let parent = self
            .timed(self.store.get(parent_id))
            .await?
            .ok_or_else(|| not_found(parent_id))?;

        if !parent.is_root() {
            return Err(AppError::validation(
                "INVALID_PARENT",
                "Replies can only be attached to a top-level message",
            ));
        }
        Ok(parent)
    }
}

fn not_found(id: MessageId) -> AppError {
    AppError::NotFound(format!("Message {} not found", id))
}

fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::validation("NAME_REQUIRED", "Name is required"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::validation(
            "NAME_TOO_LONG",
            format!("Name must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    Ok(name.to_string())
}

fn validate_body(raw: &str) -> Result<String> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(AppError::validation("MESSAGE_REQUIRED", "Message is required"));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(AppError::validation(
            "MESSAGE_TOO_LONG",
            format!("Message must be at most {} characters", MAX_BODY_CHARS),
        ));
    }
    Ok(body.to_string())
}

fn validate_email(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(email) if email.validate_email() => Ok(Some(email.to_string())),
        Some(_) => Err(AppError::validation(
            "INVALID_EMAIL",
            "Email address is not valid",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Store whose calls never complete.
    struct StalledStore;

    #[async_trait]
    impl MessageStore for StalledStore {
        async fn ensure_schema(&self) -> StoreResult<()> {
            std::future::pending().await
        }
        async fn insert(&self, _: NewMessage) -> StoreResult<Message> {
            std::future::pending().await
        }
        async fn get(&self, _: MessageId) -> StoreResult<Option<Message>> {
            std::future::pending().await
        }
        async fn list_roots(&self, _: &RootFilter) -> StoreResult<Vec<Message>> {
            std::future::pending().await
        }
        async fn list_replies(
            &self,
            _: &[MessageId],
            _: Option<MessageStatus>,
        ) -> StoreResult<Vec<Message>> {
            std::future::pending().await
        }
        async fn count_roots(&self, _: &RootFilter) -> StoreResult<i64> {
            std::future::pending().await
        }
        async fn update_status(
            &self,
            _: MessageId,
            _: MessageStatus,
        ) -> StoreResult<Option<Message>> {
            std::future::pending().await
        }
        async fn delete_cascade(&self, _: MessageId) -> StoreResult<Vec<MessageId>> {
            std::future::pending().await
        }
        async fn health_check(&self) -> StoreResult<()> {
            std::future::pending().await
        }
    }

    fn stalled_service() -> GuestbookService {
        GuestbookService {
            store: Arc::new(StalledStore),
            policy: ModerationPolicy::AutoApprove,
            timeout: Duration::from_millis(50),
            admin_name: "Admin".into(),
        }
    }

    #[tokio::test]
    async fn test_stalled_store_call_times_out() {
        let service = stalled_service();

        let err = service
            .public_feed(None, PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Timeout)));
        assert_eq!(err.error_code(), "DATABASE_ERROR");

        let err = service.delete(1).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Timeout)));

        assert!(matches!(
            service.health().await,
            Err(AppError::Store(StoreError::Timeout))
        ));
    }

    #[tokio::test]
    async fn test_validation_runs_before_store() {
        let service = stalled_service();
        let err = service
            .submit(Submission {
                name: "".into(),
                body: "hi".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NAME_REQUIRED");
    }

    #[test]
    fn test_page_request_defaults_and_clamps() {
        assert_eq!(PageRequest::default(), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PageRequest::new(Some(1), Some(10));
        assert_eq!(Pagination::new(0, page).total_pages, 0);
        assert_eq!(Pagination::new(10, page).total_pages, 1);
        assert_eq!(Pagination::new(11, page).total_pages, 2);
    }

    #[test]
    fn test_unpaged_is_a_single_page() {
        assert_eq!(
            Pagination::unpaged(12),
            Pagination { total: 12, page: 1, limit: 12, total_pages: 1 }
        );
        assert_eq!(Pagination::unpaged(0).total_pages, 0);
    }

    #[test]
    fn test_name_is_trimmed_and_required() {
        assert_eq!(validate_name("  Ann ").unwrap(), "Ann");
        assert_eq!(validate_name("   ").unwrap_err().error_code(), "NAME_REQUIRED");
        let long = "n".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(validate_name(&long).unwrap_err().error_code(), "NAME_TOO_LONG");
    }

    #[test]
    fn test_body_limit_counts_characters() {
        let at_limit = "留".repeat(MAX_BODY_CHARS);
        assert!(validate_body(&at_limit).is_ok());

        let over = "a".repeat(MAX_BODY_CHARS + 1);
        assert_eq!(validate_body(&over).unwrap_err().error_code(), "MESSAGE_TOO_LONG");
        assert_eq!(validate_body("").unwrap_err().error_code(), "MESSAGE_REQUIRED");
    }

    #[test]
    fn test_email_is_optional_but_checked() {
        assert_eq!(validate_email(None).unwrap(), None);
        assert_eq!(validate_email(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_email(Some(" ann@example.com ")).unwrap().as_deref(),
            Some("ann@example.com")
        );
        assert_eq!(
            validate_email(Some("not-an-email")).unwrap_err().error_code(),
            "INVALID_EMAIL"
        );
    }
}
