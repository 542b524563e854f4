#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// 利用者ID - 認証コンテキストで発行され、全サービスで共有される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 書籍ID - 蔵書管理コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(i64);

impl BookId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 貸出ID - 1冊の書籍の1回の貸出を識別する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorrowingId(i64);

impl BorrowingId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 予約待ちエントリID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitingEntryId(i64);

impl WaitingEntryId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 利用者ロール
///
/// 認可はルーティング層で許可ロール集合に対して検査される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Librarian,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Librarian => "librarian",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "librarian" => Ok(Role::Librarian),
            _ => Err(format!(
                "Invalid role: {}. Must be one of: user, librarian",
                s
            )),
        }
    }
}

/// ISBNエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    /// 空文字
    Empty,
    /// 13文字を超える
    TooLong,
}

/// ISBN
///
/// 不変条件：空でなく、13文字以内（保管時のカラム幅と一致）。
/// 型システムでこの制約を強制し、不正な値を作成できないようにする。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Isbn(String);

impl Isbn {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Isbn {
    type Error = IsbnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IsbnError::Empty);
        }
        if value.len() > 13 {
            return Err(IsbnError::TooLong);
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Isbn {
    type Error = IsbnError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}
