use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use super::{FeedQuery, FeedResponse, IdParam};
use crate::error::{AppError, Result};
use crate::language;
use crate::models::Message;
use crate::services::{PageRequest, Submission};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(submit_message))
}

async fn list_messages(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<FeedQuery>, AppError>,
) -> Result<Json<FeedResponse>> {
    let language = language::filter_from_query(query.lang.as_deref());
    let page = PageRequest::new(query.page, query.limit);

    let feed = state.guestbook().public_feed(language, page).await?;

    Ok(Json(FeedResponse {
        data: feed.threads,
        pagination: feed.pagination,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub parent_id: Option<IdParam>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub data: Message,
}

async fn submit_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(Json(payload), _): WithRejection<Json<SubmitMessageRequest>, AppError>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let parent_id = payload.parent_id.as_ref().map(IdParam::parse).transpose()?;

    let message = state
        .guestbook()
        .submit(Submission {
            name: payload.name,
            email: payload.email,
            body: payload.message,
            language: payload.language,
            parent_id,
            ip: client_ip(&headers),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            data: message.redacted(),
        }),
    ))
}

/// Best-effort client address from proxy headers.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| header("x-forwarded-for").and_then(|v| v.split(',').next()).map(str::trim))
        .or_else(|| header("x-real-ip"))
        .map(String::from)
}
