use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::AppError;
use crate::services::AdminGate;
use crate::AppState;

/// Rejects the request with 401 unless it carries the admin bearer secret.
pub async fn require_admin(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());

    if let Err(e) = AdminGate::new(&state.config.admin).verify_bearer(token) {
        tracing::warn!(
            path = %request.uri().path(),
            has_token = token.is_some(),
            "Admin authorization failed"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
