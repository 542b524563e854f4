use crate::ports::token_service::TokenError;
use crate::ports::user_store::UserStoreError;
use thiserror::Error;

/// 認証アプリケーション層のエラー
///
/// `UsernameTaken` と `InvalidCredentials` のDisplay文言は
/// そのままAPIレスポンスに載るため固定。
#[derive(Debug, Error)]
pub enum AuthError {
    /// ユーザー名が既に使われている
    #[error("Username already exists")]
    UsernameTaken,

    /// 利用者が存在しない、またはパスワード不一致
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// パスワードのハッシュ化・検証に失敗
    #[error("password hashing failed")]
    Hashing(#[source] bcrypt::BcryptError),

    /// トークン発行に失敗
    #[error("token issuance failed")]
    Token(#[source] TokenError),

    /// ストア障害
    #[error("authentication backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<UserStoreError> for AuthError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::DuplicateUsername => AuthError::UsernameTaken,
            UserStoreError::Backend(e) => AuthError::Backend(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
