use crate::domain::book::{Book, NewBook};
use crate::domain::borrowing::{Borrowing, NewBorrowing};
use crate::domain::value_objects::{BookId, BorrowingId, UserId, WaitingEntryId};
use crate::domain::waiting_list::{WaitingListEntry, WaitingStatus};
use crate::ports::inventory_store::{
    InventoryStore as InventoryStoreTrait, InventoryStoreError, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// InventoryStoreのインメモリ実装
///
/// スタンドアロン実行とテストで使用する。全状態を単一のMutexで守る
/// ことで、条件付き更新（在庫減算と貸出挿入）のアトミック性を保証する。
#[allow(dead_code)]
pub struct InventoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    books: HashMap<BookId, Book>,
    borrowings: HashMap<BorrowingId, Borrowing>,
    waiting: Vec<WaitingListEntry>,
    next_book_id: i64,
    next_borrowing_id: i64,
    next_entry_id: i64,
}

#[allow(dead_code)]
impl InventoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                books: HashMap::new(),
                borrowings: HashMap::new(),
                waiting: Vec::new(),
                next_book_id: 1,
                next_borrowing_id: 1,
                next_entry_id: 1,
            }),
        }
    }

    /// テスト用に在庫数を直接取得
    pub fn copies_of(&self, book_id: BookId) -> Option<u32> {
        self.inner
            .lock()
            .unwrap()
            .books
            .get(&book_id)
            .map(|b| b.available_copies)
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStoreTrait for InventoryStore {
    async fn add_book(&self, book: NewBook) -> Result<Book> {
        let mut inner = self.inner.lock().unwrap();

        if inner.books.values().any(|b| b.isbn == book.isbn) {
            return Err(InventoryStoreError::DuplicateIsbn);
        }

        let id = BookId::new(inner.next_book_id);
        inner.next_book_id += 1;

        let book = Book {
            id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            available_copies: book.available_copies,
        };
        inner.books.insert(id, book.clone());
        Ok(book)
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.inner.lock().unwrap().books.get(&book_id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let inner = self.inner.lock().unwrap();
        let mut books: Vec<Book> = inner.books.values().cloned().collect();
        books.sort_by_key(|b| b.id.value());
        Ok(books)
    }

    async fn search_books_by_title(&self, query: &str) -> Result<Vec<Book>> {
        let needle = query.to_lowercase();
        let inner = self.inner.lock().unwrap();
        let mut books: Vec<Book> = inner
            .books
            .values()
            .filter(|b| b.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        books.sort_by_key(|b| b.id.value());
        Ok(books)
    }

    async fn search_books_by_author(&self, query: &str) -> Result<Vec<Book>> {
        let needle = query.to_lowercase();
        let inner = self.inner.lock().unwrap();
        let mut books: Vec<Book> = inner
            .books
            .values()
            .filter(|b| b.author.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        books.sort_by_key(|b| b.id.value());
        Ok(books)
    }

    async fn find_open_borrowing(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<Borrowing>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .borrowings
            .values()
            .find(|b| b.user_id == user_id && b.book_id == book_id && b.is_open())
            .cloned())
    }

    async fn open_borrowings_for_user(&self, user_id: UserId) -> Result<Vec<(Borrowing, Book)>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<(Borrowing, Book)> = inner
            .borrowings
            .values()
            .filter(|b| b.user_id == user_id && b.is_open())
            .filter_map(|b| inner.books.get(&b.book_id).map(|book| (b.clone(), book.clone())))
            .collect();
        rows.sort_by_key(|(b, _)| b.id.value());
        Ok(rows)
    }

    /// 在庫減算と貸出挿入を単一ロック下で行う
    async fn create_borrowing(&self, borrowing: NewBorrowing) -> Result<Borrowing> {
        let mut inner = self.inner.lock().unwrap();

        let has_open = inner
            .borrowings
            .values()
            .any(|b| b.user_id == borrowing.user_id && b.book_id == borrowing.book_id && b.is_open());
        if has_open {
            return Err(InventoryStoreError::BorrowingExists);
        }

        let book = inner
            .books
            .get_mut(&borrowing.book_id)
            .ok_or_else(|| InventoryStoreError::Backend("no such book".into()))?;
        if book.available_copies == 0 {
            return Err(InventoryStoreError::NoCopies);
        }
        book.available_copies -= 1;

        let id = BorrowingId::new(inner.next_borrowing_id);
        inner.next_borrowing_id += 1;

        let record = Borrowing {
            id,
            book_id: borrowing.book_id,
            user_id: borrowing.user_id,
            borrowed_on: borrowing.borrowed_on,
            return_by: borrowing.return_by,
            returned_on: None,
        };
        inner.borrowings.insert(id, record.clone());
        Ok(record)
    }

    async fn close_borrowing(
        &self,
        borrowing_id: BorrowingId,
        book_id: BookId,
        returned_on: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        let borrowing = inner
            .borrowings
            .get_mut(&borrowing_id)
            .ok_or_else(|| InventoryStoreError::Backend("no such borrowing".into()))?;
        if !borrowing.is_open() {
            return Err(InventoryStoreError::AlreadyReturned);
        }
        borrowing.returned_on = Some(returned_on);

        if let Some(book) = inner.books.get_mut(&book_id) {
            book.available_copies += 1;
        }
        Ok(())
    }

    async fn add_waiting_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<WaitingListEntry> {
        let mut inner = self.inner.lock().unwrap();
        let id = WaitingEntryId::new(inner.next_entry_id);
        inner.next_entry_id += 1;

        let entry = WaitingListEntry {
            id,
            book_id,
            user_id,
            status: WaitingStatus::Waiting,
        };
        inner.waiting.push(entry.clone());
        Ok(entry)
    }

    async fn waiting_entries(&self, book_id: BookId) -> Result<Vec<WaitingListEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .waiting
            .iter()
            .filter(|e| e.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn clear_waiting_list(&self, book_id: BookId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.waiting.retain(|e| e.book_id != book_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::book::new_book;
    use crate::domain::borrowing::open_borrowing;

    async fn seeded_store(copies: u32) -> (InventoryStore, BookId) {
        let store = InventoryStore::new();
        let book = store
            .add_book(new_book("Dune", "Frank Herbert", "9780441172719", copies).unwrap())
            .await
            .unwrap();
        (store, book.id)
    }

    #[tokio::test]
    async fn test_add_book_rejects_duplicate_isbn() {
        let (store, _) = seeded_store(1).await;
        let result = store
            .add_book(new_book("Dune again", "Someone", "9780441172719", 1).unwrap())
            .await;
        assert!(matches!(result, Err(InventoryStoreError::DuplicateIsbn)));
    }

    #[tokio::test]
    async fn test_create_borrowing_decrements_copies() {
        let (store, book_id) = seeded_store(2).await;
        let record = store
            .create_borrowing(open_borrowing(UserId::new(1), book_id, Utc::now()))
            .await
            .unwrap();
        assert!(record.is_open());
        assert_eq!(store.copies_of(book_id), Some(1));
    }

    #[tokio::test]
    async fn test_create_borrowing_rejects_when_exhausted() {
        let (store, book_id) = seeded_store(0).await;
        let result = store
            .create_borrowing(open_borrowing(UserId::new(1), book_id, Utc::now()))
            .await;
        assert!(matches!(result, Err(InventoryStoreError::NoCopies)));
        assert_eq!(store.copies_of(book_id), Some(0));
    }

    #[tokio::test]
    async fn test_create_borrowing_rejects_duplicate_open() {
        let (store, book_id) = seeded_store(5).await;
        let user = UserId::new(1);
        store
            .create_borrowing(open_borrowing(user, book_id, Utc::now()))
            .await
            .unwrap();
        let result = store
            .create_borrowing(open_borrowing(user, book_id, Utc::now()))
            .await;
        assert!(matches!(result, Err(InventoryStoreError::BorrowingExists)));
        assert_eq!(store.copies_of(book_id), Some(4));
    }

    #[tokio::test]
    async fn test_close_borrowing_restores_copy_once() {
        let (store, book_id) = seeded_store(1).await;
        let user = UserId::new(1);
        let record = store
            .create_borrowing(open_borrowing(user, book_id, Utc::now()))
            .await
            .unwrap();
        assert_eq!(store.copies_of(book_id), Some(0));

        store
            .close_borrowing(record.id, book_id, Utc::now())
            .await
            .unwrap();
        assert_eq!(store.copies_of(book_id), Some(1));

        // 二重クローズは在庫を二重加算しない
        let again = store.close_borrowing(record.id, book_id, Utc::now()).await;
        assert!(matches!(again, Err(InventoryStoreError::AlreadyReturned)));
        assert_eq!(store.copies_of(book_id), Some(1));
    }

    #[tokio::test]
    async fn test_concurrent_borrows_never_go_negative() {
        let (store, book_id) = seeded_store(1).await;
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_borrowing(open_borrowing(UserId::new(i), book_id, Utc::now()))
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.copies_of(book_id), Some(0));
    }

    #[tokio::test]
    async fn test_waiting_list_round_trip() {
        let (store, book_id) = seeded_store(0).await;
        store
            .add_waiting_entry(UserId::new(1), book_id)
            .await
            .unwrap();
        store
            .add_waiting_entry(UserId::new(2), book_id)
            .await
            .unwrap();

        let entries = store.waiting_entries(book_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.status == WaitingStatus::Waiting));

        store.clear_waiting_list(book_id).await.unwrap();
        assert!(store.waiting_entries(book_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_contains() {
        let (store, _) = seeded_store(1).await;
        store
            .add_book(new_book("A Wizard of Earthsea", "Ursula K. Le Guin", "9780547773742", 1).unwrap())
            .await
            .unwrap();

        let by_title = store.search_books_by_title("wizard").await.unwrap();
        assert_eq!(by_title.len(), 1);

        let by_author = store.search_books_by_author("le guin").await.unwrap();
        assert_eq!(by_author.len(), 1);

        assert!(store.search_books_by_title("asimov").await.unwrap().is_empty());
    }
}
