//! Shared fixtures: an in-memory SQLite store behind the real router.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use guestbook_service::config::{
    AdminConfig, Config, DatabaseConfig, LoggingConfig, ModerationConfig, ServerConfig,
};
use guestbook_service::db::{MessageStore, SqliteMessageStore};
use guestbook_service::services::ModerationPolicy;
use guestbook_service::{build_router, AppState};

pub const API_KEY: &str = "test-admin-key-0123456789";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

pub fn test_config(policy: ModerationPolicy) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".into(),
            backend: None,
            max_connections: 1,
            timeout_secs: 5,
        },
        moderation: ModerationConfig {
            default_status: policy,
        },
        admin: AdminConfig {
            api_key: API_KEY.into(),
            username: Some(ADMIN_USER.into()),
            password: Some(ADMIN_PASSWORD.into()),
            password_hash: None,
            display_name: "Admin".into(),
        },
        logging: LoggingConfig::default(),
    }
}

pub async fn memory_store() -> Arc<dyn MessageStore> {
    let store = SqliteMessageStore::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory SQLite");
    store.ensure_schema().await.expect("Failed to create schema");
    Arc::new(store)
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn MessageStore>,
}

impl TestApp {
    pub async fn new(policy: ModerationPolicy) -> Self {
        Self::with_config(test_config(policy)).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = memory_store().await;
        let router = build_router(AppState::new(store.clone(), config));
        Self { router, store }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router should not fail");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(method, uri, body, Some(API_KEY)).await
    }

    /// Submit a visitor message and return its id.
    pub async fn submit(&self, name: &str, message: &str, language: Option<&str>) -> i64 {
        let mut body = serde_json::json!({ "name": name, "message": message });
        if let Some(language) = language {
            body["language"] = Value::from(language);
        }
        let (status, json) = self.post("/api/messages", body).await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {}", json);
        json["data"]["id"].as_i64().expect("id should be an integer")
    }

    pub async fn review(&self, id: i64, action: &str) -> (StatusCode, Value) {
        self.admin(
            Method::POST,
            "/api/admin/review",
            Some(serde_json::json!({ "id": id, "action": action })),
        )
        .await
    }

    pub async fn reply(&self, parent_id: i64, message: &str) -> (StatusCode, Value) {
        self.admin(
            Method::POST,
            "/api/admin/reply",
            Some(serde_json::json!({ "parent_id": parent_id, "message": message })),
        )
        .await
    }
}

/// Ids of the root messages in a feed response.
pub fn root_ids(feed: &Value) -> Vec<i64> {
    feed["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .map(|t| t["id"].as_i64().expect("thread id"))
        .collect()
}

/// Every message id in a feed response, roots and replies.
pub fn all_ids(feed: &Value) -> Vec<i64> {
    let mut ids = Vec::new();
    for thread in feed["data"].as_array().expect("data should be an array") {
        ids.push(thread["id"].as_i64().expect("thread id"));
        for reply in thread["replies"].as_array().expect("replies should be an array") {
            ids.push(reply["id"].as_i64().expect("reply id"));
        }
    }
    ids
}

pub fn assert_reply_counts(feed: &Value) {
    for thread in feed["data"].as_array().expect("data should be an array") {
        let replies = thread["replies"].as_array().expect("replies should be an array");
        assert_eq!(
            thread["reply_count"].as_u64(),
            Some(replies.len() as u64),
            "reply_count must equal replies.len() for thread {}",
            thread["id"]
        );
    }
}
