use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use utoipa::ToSchema;

/// Errors surfaced by every service operation and converted into a structured
/// error payload at the gateway.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Your cart is empty. Add items before placing an order.")]
    EmptyCart,

    #[error("{0}")]
    Conflict(String),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("Request was throttled. Try again later.")]
    Throttled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    EmptyCart,
    Conflict,
    Unauthorized,
    Throttled,
    Internal,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(format!("{} not found", what.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::EmptyCart => ErrorKind::EmptyCart,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::Throttled => ErrorKind::Throttled,
            AppError::Other(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput | ErrorKind::EmptyCart => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Throttled => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("Record not found".into()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                AppError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                AppError::Conflict(format!(
                    "Record is still referenced: {}",
                    info.message()
                ))
            }
            other => AppError::Other(other.into()),
        }
    }
}

// Malformed bodies, paths and query strings are invalid input like any other.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Other(err) => {
                tracing::error!("Unhandled error: {:?}", err);
                "Internal server error".to_string()
            }
            err => err.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.kind(),
                message,
            }),
        )
            .into_response()
    }
}

/// Standard success envelope returned by every endpoint with a body.
#[derive(Serialize, ToSchema, Debug)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn taxonomy_maps_to_http_status() {
        let cases = [
            (AppError::not_found("Order"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Forbidden("nope".into()),
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (
                AppError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
            ),
            (AppError::EmptyCart, StatusCode::BAD_REQUEST, "EMPTY_CART"),
            (
                AppError::Conflict("dup".into()),
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                AppError::Unauthorized,
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (
                AppError::Throttled,
                StatusCode::TOO_MANY_REQUESTS,
                "THROTTLED",
            ),
        ];

        for (err, status, kind) in cases {
            let (actual_status, body) = render(err).await;
            assert_eq!(actual_status, status);
            assert_eq!(body["error"], kind);
        }
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_details() {
        let (status, body) = render(AppError::Other(anyhow::anyhow!("db password wrong"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "INTERNAL");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn diesel_not_found_becomes_not_found() {
        let err: AppError = DieselError::NotFound.into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn not_found_helper_names_the_entity() {
        assert_eq!(AppError::not_found("Menu item").to_string(), "Menu item not found");
    }
}
