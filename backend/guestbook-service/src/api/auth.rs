use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::services::AdminGate;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>> {
    payload.validate().map_err(|_| {
        AppError::validation("CREDENTIALS_REQUIRED", "Username and password are required")
    })?;

    let token = AdminGate::new(&state.config.admin).login(&payload.username, &payload.password)?;

    tracing::info!(username = %payload.username, "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        username: payload.username,
    }))
}
