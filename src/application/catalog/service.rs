use crate::domain::book::{Book, BookDraftError, new_book};
use crate::domain::borrowing::Borrowing;
use crate::domain::value_objects::{IsbnError, UserId};
use crate::ports::inventory_store::InventoryStore;
use std::sync::Arc;

use super::errors::{CatalogError, Result};

/// カタログサービスの依存関係
#[derive(Clone)]
pub struct CatalogDependencies {
    pub store: Arc<dyn InventoryStore>,
}

/// 書籍を登録する
///
/// ビジネスルール：
/// - タイトル・著者・ISBNは必須
/// - ISBNは一意であること
pub async fn add_book(
    deps: &CatalogDependencies,
    title: &str,
    author: &str,
    isbn: &str,
    available_copies: u32,
) -> Result<Book> {
    let draft = new_book(title, author, isbn, available_copies).map_err(|e| match e {
        BookDraftError::EmptyTitle | BookDraftError::EmptyAuthor => CatalogError::MissingFields,
        BookDraftError::InvalidIsbn(IsbnError::Empty) => CatalogError::MissingFields,
        BookDraftError::InvalidIsbn(IsbnError::TooLong) => CatalogError::IsbnTooLong,
    })?;

    let book = deps.store.add_book(draft).await?;
    tracing::info!(book_id = book.id.value(), title = %book.title, "Book added");
    Ok(book)
}

/// 全書籍を取得する
pub async fn all_books(deps: &CatalogDependencies) -> Result<Vec<Book>> {
    Ok(deps.store.list_books().await?)
}

/// タイトルの部分一致検索（大文字小文字を区別しない）
pub async fn search_by_title(deps: &CatalogDependencies, query: &str) -> Result<Vec<Book>> {
    Ok(deps.store.search_books_by_title(query).await?)
}

/// 著者の部分一致検索（大文字小文字を区別しない）
pub async fn search_by_author(deps: &CatalogDependencies, query: &str) -> Result<Vec<Book>> {
    Ok(deps.store.search_books_by_author(query).await?)
}

/// 利用者の未返却貸出を書籍情報付きで取得する
pub async fn borrowed_books(
    deps: &CatalogDependencies,
    user_id: UserId,
) -> Result<Vec<(Borrowing, Book)>> {
    Ok(deps.store.open_borrowings_for_user(user_id).await?)
}

// ============================================================================
// テスト
// ============================================================================
