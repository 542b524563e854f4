use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::book::Book;

/// 汎用メッセージレスポンス
///
/// 成功・失敗を問わず、本文が1文のレスポンスは {"msg": "..."} 形。
#[derive(Debug, Serialize, Deserialize)]
pub struct MsgResponse {
    pub msg: String,
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub msg: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            msg: message.into(),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// 登録リクエスト（POST /auth/register）
///
/// 欠落フィールドはハンドラーで検査するためOptionで受ける。
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// ログインリクエスト（POST /auth/login）
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// ログインレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub msg: String,
    pub access_token: String,
}

// ============================================================================
// Books
// ============================================================================

/// 書籍登録リクエスト（POST /books/add）
#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub available_copies: Option<u32>,
}

/// 書籍ビュー
#[derive(Debug, Serialize, Deserialize)]
pub struct BookView {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub available_copies: u32,
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.value(),
            title: book.title,
            author: book.author,
            isbn: book.isbn.as_str().to_string(),
            available_copies: book.available_copies,
        }
    }
}

/// 書籍一覧レスポンス（GET /books/all_books, /books/search）
#[derive(Debug, Serialize, Deserialize)]
pub struct BooksResponse {
    pub books: Vec<BookView>,
}

/// 貸出中書籍ビュー（GET /books/borrowed_books）
#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowedBookView {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub return_by: DateTime<Utc>,
}

/// 貸出中書籍一覧レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowedBooksResponse {
    pub borrowed_books: Vec<BorrowedBookView>,
}

// ============================================================================
// User
// ============================================================================

/// 借用・返却リクエスト（POST /user/borrow, /user/return）
#[derive(Debug, Deserialize)]
pub struct CirculationRequest {
    pub user_id: Option<i64>,
    pub book_id: Option<i64>,
}

/// プロフィールレスポンス（GET /user/profile）
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub role: String,
    pub name: Option<String>,
    pub username: String,
}

/// 未返却貸出ビュー（GET /user/borrowings）
#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowingView {
    pub title: String,
    pub borrowed_on: DateTime<Utc>,
    pub return_by: DateTime<Utc>,
}

// ============================================================================
// Query parameters
// ============================================================================

/// タイトル検索のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub title: Option<String>,
}

/// 著者検索のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    pub author: Option<String>,
}

/// 利用者指定のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Option<i64>,
}
