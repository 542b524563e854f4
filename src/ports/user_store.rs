use crate::domain::user::{NewUser, User};
use crate::domain::value_objects::UserId;
use async_trait::async_trait;
use thiserror::Error;

/// 利用者ストアのエラー
#[derive(Debug, Error)]
pub enum UserStoreError {
    /// ユーザー名が既に使われている
    #[error("Username already exists")]
    DuplicateUsername,

    /// バックエンド障害
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, UserStoreError>;

/// 認証情報付きの利用者レコード
///
/// password_hash はログイン検証専用。APIレスポンスには含めないこと。
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: Option<String>,
}

/// 利用者ストアポート
#[allow(dead_code)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 利用者を登録する
    ///
    /// # エラー
    /// ユーザー名が重複している場合は`DuplicateUsername`
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    /// ユーザー名で取得する（認証情報付き）
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// IDで取得する
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>>;
}
