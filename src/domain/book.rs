#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use super::{BookId, Isbn, IsbnError};

/// 書籍 - 蔵書管理コンテキストの集約
///
/// available_copies は在庫ミューテータだけが変更できる。
/// 不変条件：available_copies は負にならない（u32 で型レベルに保証）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub available_copies: u32,
}

impl Book {
    /// 貸出可能な在庫があるか
    pub fn has_copies(&self) -> bool {
        self.available_copies > 0
    }
}

/// 登録前の書籍
///
/// ビジネスルール：
/// - タイトルと著者は空でないこと
/// - ISBNが有効であること（IsbnのTryFromで検証済み）
/// - available_copies の既定値は1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub available_copies: u32,
}

/// 書籍登録時の検証エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookDraftError {
    /// タイトルが空
    EmptyTitle,
    /// 著者が空
    EmptyAuthor,
    /// ISBNが不正
    InvalidIsbn(IsbnError),
}

/// 入力値から登録用の書籍を組み立てる
///
/// # エラー
/// いずれかの必須項目が欠けている場合は`BookDraftError`を返す
pub fn new_book(
    title: &str,
    author: &str,
    isbn: &str,
    available_copies: u32,
) -> Result<NewBook, BookDraftError> {
    if title.trim().is_empty() {
        return Err(BookDraftError::EmptyTitle);
    }
    if author.trim().is_empty() {
        return Err(BookDraftError::EmptyAuthor);
    }
    let isbn = Isbn::try_from(isbn).map_err(BookDraftError::InvalidIsbn)?;

    Ok(NewBook {
        title: title.to_string(),
        author: author.to_string(),
        isbn,
        available_copies,
    })
}
