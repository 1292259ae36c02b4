use anyhow::Context;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{app_error::AppError, app_state::AppState, roles::Identity, services::groups};

/// Extracts the token from `Authorization: Token <uuid>` or `Bearer <uuid>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(AppError::Unauthorized)?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized);
    }
    Uuid::parse_str(token.trim()).map_err(|_| AppError::Unauthorized)
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let mut conn = state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        groups::authenticate(&mut *conn, token).await
    }
}
