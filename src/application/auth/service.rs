use crate::domain::user::{NewUser, User};
use crate::domain::value_objects::Role;
use crate::ports::token_service::{TokenClaims, TokenService};
use crate::ports::user_store::{UserStore, UserStoreError};
use std::sync::Arc;

use super::errors::{AuthError, Result};

/// 認証サービスの依存関係
#[derive(Clone)]
pub struct AuthDependencies {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenService>,
}

/// 利用者を登録する
///
/// ビジネスルール：
/// - ユーザー名は一意であること
/// - パスワードはbcryptでハッシュ化して保存する
/// - 新規利用者のロールは `user`
pub async fn register_user(
    deps: &AuthDependencies,
    username: &str,
    password: &str,
) -> Result<User> {
    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(AuthError::Hashing)?;

    let user = deps
        .users
        .insert_user(NewUser {
            username: username.to_string(),
            password_hash: Some(password_hash),
            name: None,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = user.id.value(), username = %user.username, "User registered");
    Ok(user)
}

/// ログインしてアクセストークンを発行する
///
/// ビジネスルール：
/// - 利用者が存在しない場合もパスワード不一致と同じ
///   `InvalidCredentials` を返す（ユーザー名の存在を漏らさない）
pub async fn login(deps: &AuthDependencies, username: &str, password: &str) -> Result<String> {
    let Some(record) = deps.users.find_by_username(username).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    // クレームから補完された利用者はパスワードを持たず、ログインできない
    let Some(password_hash) = record.password_hash.as_deref() else {
        return Err(AuthError::InvalidCredentials);
    };

    if !bcrypt::verify(password, password_hash).map_err(AuthError::Hashing)? {
        return Err(AuthError::InvalidCredentials);
    }

    let token = deps.tokens.issue(&record.user).map_err(AuthError::Token)?;
    tracing::info!(user_id = record.user.id.value(), "Login successful");
    Ok(token)
}

/// プロフィールを取得し、存在しなければクレームから補完する
///
/// 認証コンテキストと利用者コンテキストでストアが分かれた構成では、
/// 登録済みの利用者がこちらのストアに未登録のことがある。その場合は
/// クレームに複製された属性から行を作る。
pub async fn ensure_profile(deps: &AuthDependencies, claims: &TokenClaims) -> Result<User> {
    if let Some(user) = deps.users.find_by_id(claims.user_id()).await? {
        return Ok(user);
    }

    let draft = NewUser {
        username: claims.username.clone(),
        password_hash: None,
        name: claims.name.clone(),
        role: claims.role,
    };
    match deps.users.insert_user(draft).await {
        Ok(user) => {
            tracing::info!(user_id = user.id.value(), "Profile created from token claims");
            Ok(user)
        }
        // 並行リクエストが先に補完していた場合は作成済みの行を返す
        Err(UserStoreError::DuplicateUsername) => {
            let record = deps.users.find_by_username(&claims.username).await?;
            record
                .map(|r| r.user)
                .ok_or_else(|| AuthError::Backend("profile row vanished after insert".into()))
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// テスト
// ============================================================================
