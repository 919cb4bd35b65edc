mod admin;
mod auth;
mod messages;

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{MessageId, Thread};
use crate::services::Pagination;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(messages::routes())
        .nest("/admin", admin::routes(state).merge(auth::routes()))
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub lang: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub data: Vec<Thread>,
    pub pagination: Pagination,
}

/// Message ids arrive as JSON numbers from scripts and as strings from forms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdParam {
    Number(i64),
    Text(String),
}

impl IdParam {
    pub fn parse(&self) -> Result<MessageId> {
        match self {
            IdParam::Number(id) if *id > 0 => Ok(*id),
            IdParam::Number(_) => Err(invalid_id()),
            IdParam::Text(raw) => parse_id(raw),
        }
    }
}

pub fn parse_id(raw: &str) -> Result<MessageId> {
    match raw.trim().parse::<MessageId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid_id()),
    }
}

fn invalid_id() -> AppError {
    AppError::validation("INVALID_ID", "Message id must be a positive integer")
}
