#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// 利用者
///
/// 認証サービスで登録され、IDとロールはJWTクレームとして他サービスへ伝搬する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub role: Role,
}

/// 永続化前の利用者
///
/// password_hash はトークンクレームから補完された利用者では None になる。
/// その場合、登録が済むまでログインはできない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Role,
}
