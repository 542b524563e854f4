use crate::domain::book::{Book, NewBook};
use crate::domain::borrowing::{Borrowing, NewBorrowing};
use crate::domain::value_objects::{BookId, BorrowingId, UserId};
use crate::domain::waiting_list::WaitingListEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 蔵書ストアのエラー
///
/// 呼び出し側が分岐する違反（在庫切れ、重複借用など）は型付きで返し、
/// それ以外のバックエンド障害はまとめてラップする。
#[derive(Debug, Error)]
pub enum InventoryStoreError {
    /// ISBNが既に登録済み
    #[error("Book with this ISBN already exists")]
    DuplicateIsbn,

    /// 在庫ゼロの書籍に対する貸出（条件付き更新が0行だった）
    #[error("no copies available")]
    NoCopies,

    /// 同一 (利用者, 書籍) の未返却貸出が既に存在する
    #[error("an open borrowing already exists for this user and book")]
    BorrowingExists,

    /// 既に返却済みの貸出を閉じようとした
    #[error("borrowing already returned")]
    AlreadyReturned,

    /// バックエンド障害
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, InventoryStoreError>;

/// 蔵書ストアポート
///
/// 書籍・貸出・予約待ちリストの永続化を抽象化する。
///
/// 在庫不変条件（available_copies >= 0、openな貸出は (利用者, 書籍)
/// ごとに1件）の最終防衛線はこのポートの実装が持つ。複数インスタンス
/// 構成でもブローカーに頼らず、条件付き更新や一意制約で保証すること。
#[allow(dead_code)]
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// 書籍を登録する
    ///
    /// # エラー
    /// ISBNが重複している場合は`DuplicateIsbn`
    async fn add_book(&self, book: NewBook) -> Result<Book>;

    /// 書籍をIDで取得する
    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 全書籍を取得する
    async fn list_books(&self) -> Result<Vec<Book>>;

    /// タイトルの部分一致検索（大文字小文字を区別しない）
    async fn search_books_by_title(&self, query: &str) -> Result<Vec<Book>>;

    /// 著者の部分一致検索（大文字小文字を区別しない）
    async fn search_books_by_author(&self, query: &str) -> Result<Vec<Book>>;

    /// 同一 (利用者, 書籍) の未返却貸出を取得する
    async fn find_open_borrowing(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<Borrowing>>;

    /// 利用者の未返却貸出を書籍情報付きで取得する
    async fn open_borrowings_for_user(&self, user_id: UserId) -> Result<Vec<(Borrowing, Book)>>;

    /// 貸出を作成する
    ///
    /// 在庫の減算と貸出行の挿入をアトミックに行う。
    ///
    /// # エラー
    /// - `NoCopies`: 減算すると負になる場合（他の要求に先を越された）
    /// - `BorrowingExists`: openな貸出が既にある場合
    async fn create_borrowing(&self, borrowing: NewBorrowing) -> Result<Borrowing>;

    /// 貸出を閉じる
    ///
    /// returned_on の設定と在庫の加算をアトミックに行う。
    ///
    /// # エラー
    /// 既に返却済みの場合は`AlreadyReturned`
    async fn close_borrowing(
        &self,
        borrowing_id: BorrowingId,
        book_id: BookId,
        returned_on: DateTime<Utc>,
    ) -> Result<()>;

    /// 予約待ちエントリを追加する（重複排除しない）
    async fn add_waiting_entry(&self, user_id: UserId, book_id: BookId)
    -> Result<WaitingListEntry>;

    /// 書籍の予約待ちエントリをすべて取得する
    async fn waiting_entries(&self, book_id: BookId) -> Result<Vec<WaitingListEntry>>;

    /// 書籍の予約待ちエントリを一括削除する
    async fn clear_waiting_list(&self, book_id: BookId) -> Result<()>;
}
