use crate::application::auth::AuthError;
use crate::application::catalog::CatalogError;
use crate::application::circulation::CirculationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをHTTPステータスと {"msg": "..."} ボディへ
/// マッピングする。
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl From<CirculationError> for ApiError {
    fn from(e: CirculationError) -> Self {
        let status = match e {
            // 400 Bad Request - 入力の欠落・不正
            CirculationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found - 対象の書籍が存在しない
            CirculationError::NotFound(_) => StatusCode::NOT_FOUND,

            // 422 Unprocessable Entity - ビジネスルール違反
            CirculationError::Exhausted(_) | CirculationError::Conflict(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 504 Gateway Timeout - 蔵書サービスからの応答なし
            CirculationError::Timeout => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            CirculationError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UsernameTaken => Self::bad_request(e.to_string()),
            AuthError::InvalidCredentials => Self::unauthorized(e.to_string()),
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            AuthError::Hashing(_) | AuthError::Token(_) | AuthError::Backend(_) => {
                tracing::error!("Auth service error: {}", e);
                Self::internal("An unexpected error occurred")
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::MissingFields
            | CatalogError::IsbnTooLong
            | CatalogError::DuplicateIsbn => Self::bad_request(e.to_string()),
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            CatalogError::Backend(_) => {
                tracing::error!("Catalog error: {}", e);
                Self::internal("An unexpected error occurred")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "Request failed: {}", self.msg);
        }

        let body = Json(ErrorResponse::new(self.msg));
        (self.status, body).into_response()
    }
}
