use crate::domain::user::User;
use crate::domain::value_objects::{Role, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// トークンサービスのエラー
#[derive(Debug, Error)]
pub enum TokenError {
    /// 署名不正・期限切れなど
    #[error("Invalid token")]
    Invalid,

    /// トークンの生成に失敗
    #[error("token creation failed")]
    Creation(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, TokenError>;

/// アクセストークンのクレーム
///
/// `sub` は利用者IDの文字列表現。`id` 以下は各サービスが
/// 利用者ストアを引かずに認可判定できるようにするための複製。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn user_id(&self) -> UserId {
        self.id
    }
}

/// トークンサービスポート
///
/// アクセストークンの発行と検証を抽象化する。CPUローカルな操作のため
/// 同期トレイトとする。
pub trait TokenService: Send + Sync {
    /// 利用者のアクセストークンを発行する
    fn issue(&self, user: &User) -> Result<String>;

    /// トークンを検証し、クレームを返す
    ///
    /// # エラー
    /// 署名不正または期限切れの場合は`TokenError::Invalid`
    fn validate(&self, token: &str) -> Result<TokenClaims>;
}
