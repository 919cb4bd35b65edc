use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use super::{parse_id, FeedQuery, FeedResponse, IdParam};
use crate::error::{AppError, Result};
use crate::language;
use crate::middleware::require_admin;
use crate::models::{Message, MessageId, MessageStatus};
use crate::services::{moderation, PageRequest, ReviewAction};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_all_messages))
        .route("/messages/:id", delete(delete_message))
        .route("/messages/:id/status", put(update_status))
        .route("/review", post(review_message))
        .route("/reply", post(reply_to_message))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

async fn list_all_messages(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<FeedQuery>, AppError>,
) -> Result<Json<FeedResponse>> {
    let language = language::filter_from_query(query.lang.as_deref());
    let page = (query.page.is_some() || query.limit.is_some())
        .then(|| PageRequest::new(query.page, query.limit));

    let feed = state.guestbook().admin_feed(language, page).await?;

    Ok(Json(FeedResponse {
        data: feed.threads,
        pagination: feed.pagination,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub id: IdParam,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub status: MessageStatus,
    pub data: Message,
}

async fn review_message(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ReviewRequest>, AppError>,
) -> Result<Json<ReviewResponse>> {
    let id = payload.id.parse()?;
    let action: ReviewAction = payload.action.parse()?;

    apply_status(&state, id, action.target_status()).await
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateStatusRequest>, AppError>,
) -> Result<Json<ReviewResponse>> {
    let id = parse_id(&id)?;
    let status = moderation::parse_target_status(&payload.status)?;

    apply_status(&state, id, status).await
}

async fn apply_status(
    state: &AppState,
    id: MessageId,
    status: MessageStatus,
) -> Result<Json<ReviewResponse>> {
    let message = state.guestbook().set_status(id, status).await?;

    Ok(Json(ReviewResponse {
        success: true,
        status: message.status,
        data: message,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_ids: Vec<MessageId>,
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let id = parse_id(&id)?;
    let deleted_ids = state.guestbook().delete(id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        deleted_ids,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub parent_id: IdParam,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub success: bool,
    pub data: Message,
}

async fn reply_to_message(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ReplyRequest>, AppError>,
) -> Result<(StatusCode, Json<ReplyResponse>)> {
    let parent_id = payload.parent_id.parse()?;
    let reply = state.guestbook().admin_reply(parent_id, &payload.message).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReplyResponse {
            success: true,
            data: reply,
        }),
    ))
}
