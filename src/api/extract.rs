use crate::domain::value_objects::Role;
use crate::ports::token_service::{TokenClaims, TokenService};
use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use std::sync::Arc;

use super::error::ApiError;
use super::handlers::AppState;

/// 認証済み利用者
///
/// `Authorization: Bearer <token>` ヘッダを検証し、クレームを取り出す。
/// 欠落・不正なトークンは401で拒否する。
#[derive(Debug, Clone)]
pub struct AuthUser(pub TokenClaims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization Header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

        let claims = state
            .auth
            .tokens
            .validate(token)
            .map_err(|_| ApiError::unauthorized("Invalid token"))?;

        Ok(AuthUser(claims))
    }
}

impl AuthUser {
    /// 許可ロールのいずれかを持つことを検査する
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.0.role) {
            return Ok(());
        }

        let allowed = roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ApiError::forbidden(format!(
            "Access denied: One of the following roles is required: {}",
            allowed
        )))
    }
}
