use crate::domain::book::{Book, NewBook};
use crate::domain::borrowing::{Borrowing, NewBorrowing};
use crate::domain::value_objects::{BookId, BorrowingId, Isbn, UserId, WaitingEntryId};
use crate::domain::waiting_list::{WaitingListEntry, WaitingStatus};
use crate::ports::inventory_store::{
    InventoryStore as InventoryStoreTrait, InventoryStoreError, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

/// Index enforcing one open borrowing per (user, book); see migrations.
const OPEN_BORROWING_INDEX: &str = "borrowings_one_open_per_user_book";
const ISBN_UNIQUE_CONSTRAINT: &str = "books_isbn_key";

fn backend(e: sqlx::Error) -> InventoryStoreError {
    InventoryStoreError::Backend(Box::new(e))
}

fn invalid_data(message: String) -> InventoryStoreError {
    InventoryStoreError::Backend(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

fn violates_constraint(e: &sqlx::Error, constraint: &str) -> bool {
    match e {
        sqlx::Error::Database(db) => db.constraint() == Some(constraint),
        _ => false,
    }
}

fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let isbn: String = row.get("isbn");
    let isbn =
        Isbn::try_from(isbn).map_err(|e| invalid_data(format!("invalid isbn in row: {:?}", e)))?;

    let copies: i32 = row.get("available_copies");
    let available_copies = u32::try_from(copies)
        .map_err(|_| invalid_data(format!("available_copies out of range: {}", copies)))?;

    Ok(Book {
        id: BookId::new(row.get("id")),
        title: row.get("title"),
        author: row.get("author"),
        isbn,
        available_copies,
    })
}

fn map_row_to_borrowing(row: &PgRow) -> Borrowing {
    Borrowing {
        id: BorrowingId::new(row.get("id")),
        book_id: BookId::new(row.get("book_id")),
        user_id: UserId::new(row.get("user_id")),
        borrowed_on: row.get("borrowed_on"),
        return_by: row.get("return_by"),
        returned_on: row.get("returned_on"),
    }
}

fn map_row_to_waiting_entry(row: &PgRow) -> Result<WaitingListEntry> {
    let status: &str = row.get("status");
    let status = WaitingStatus::from_str(status)
        .map_err(|e| invalid_data(format!("invalid waiting status in row: {}", e)))?;

    Ok(WaitingListEntry {
        id: WaitingEntryId::new(row.get("id")),
        book_id: BookId::new(row.get("book_id")),
        user_id: UserId::new(row.get("user_id")),
        status,
    })
}

/// PostgreSQL implementation of InventoryStore
///
/// Stock invariants are enforced at the storage level so that multiple
/// service instances stay safe without broker coordination:
/// - conditional UPDATE keeps available_copies from going below zero
/// - a partial unique index keeps one open borrowing per (user, book)
#[allow(dead_code)]
pub struct InventoryStore {
    pool: PgPool,
}

#[allow(dead_code)]
impl InventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStoreTrait for InventoryStore {
    async fn add_book(&self, book: NewBook) -> Result<Book> {
        let copies = i32::try_from(book.available_copies)
            .map_err(|_| invalid_data("available_copies exceeds column range".to_string()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO books (title, author, isbn, available_copies)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.isbn.as_str())
        .bind(copies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if violates_constraint(&e, ISBN_UNIQUE_CONSTRAINT) {
                InventoryStoreError::DuplicateIsbn
            } else {
                backend(e)
            }
        })?;

        Ok(Book {
            id: BookId::new(row.get("id")),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            available_copies: book.available_copies,
        })
    }

    async fn find_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(
            "SELECT id, title, author, isbn, available_copies FROM books WHERE id = $1",
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, author, isbn, available_copies FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn search_books_by_title(&self, query: &str) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, isbn, available_copies
            FROM books
            WHERE title ILIKE $1
            ORDER BY id
            "#,
        )
        .bind(format!("%{}%", query))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn search_books_by_author(&self, query: &str) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, isbn, available_copies
            FROM books
            WHERE author ILIKE $1
            ORDER BY id
            "#,
        )
        .bind(format!("%{}%", query))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn find_open_borrowing(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<Borrowing>> {
        let row = sqlx::query(
            r#"
            SELECT id, book_id, user_id, borrowed_on, return_by, returned_on
            FROM borrowings
            WHERE user_id = $1 AND book_id = $2 AND returned_on IS NULL
            "#,
        )
        .bind(user_id.value())
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.as_ref().map(map_row_to_borrowing))
    }

    async fn open_borrowings_for_user(&self, user_id: UserId) -> Result<Vec<(Borrowing, Book)>> {
        let rows = sqlx::query(
            r#"
            SELECT
                br.id, br.book_id, br.user_id, br.borrowed_on, br.return_by, br.returned_on,
                b.id AS b_id, b.title, b.author, b.isbn, b.available_copies
            FROM borrowings br
            JOIN books b ON br.book_id = b.id
            WHERE br.user_id = $1 AND br.returned_on IS NULL
            ORDER BY br.id
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| {
                let borrowing = map_row_to_borrowing(row);
                let isbn: String = row.get("isbn");
                let isbn = Isbn::try_from(isbn)
                    .map_err(|e| invalid_data(format!("invalid isbn in row: {:?}", e)))?;
                let copies: i32 = row.get("available_copies");
                let book = Book {
                    id: BookId::new(row.get("b_id")),
                    title: row.get("title"),
                    author: row.get("author"),
                    isbn,
                    available_copies: u32::try_from(copies).map_err(|_| {
                        invalid_data(format!("available_copies out of range: {}", copies))
                    })?,
                };
                Ok((borrowing, book))
            })
            .collect()
    }

    /// Decrement and insert in one transaction
    ///
    /// The conditional UPDATE is the compare-and-swap: zero rows affected
    /// means another request took the last copy first. The partial unique
    /// index turns a duplicate open borrowing into a constraint violation.
    async fn create_borrowing(&self, borrowing: NewBorrowing) -> Result<Borrowing> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let updated = sqlx::query(
            "UPDATE books SET available_copies = available_copies - 1 WHERE id = $1 AND available_copies > 0",
        )
        .bind(borrowing.book_id.value())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if updated.rows_affected() == 0 {
            return Err(InventoryStoreError::NoCopies);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO borrowings (book_id, user_id, borrowed_on, return_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(borrowing.book_id.value())
        .bind(borrowing.user_id.value())
        .bind(borrowing.borrowed_on)
        .bind(borrowing.return_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if violates_constraint(&e, OPEN_BORROWING_INDEX) {
                InventoryStoreError::BorrowingExists
            } else {
                backend(e)
            }
        })?;

        tx.commit().await.map_err(backend)?;

        Ok(Borrowing {
            id: BorrowingId::new(row.get("id")),
            book_id: borrowing.book_id,
            user_id: borrowing.user_id,
            borrowed_on: borrowing.borrowed_on,
            return_by: borrowing.return_by,
            returned_on: None,
        })
    }

    /// Close and restore the copy in one transaction
    async fn close_borrowing(
        &self,
        borrowing_id: BorrowingId,
        book_id: BookId,
        returned_on: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let closed = sqlx::query(
            "UPDATE borrowings SET returned_on = $2 WHERE id = $1 AND returned_on IS NULL",
        )
        .bind(borrowing_id.value())
        .bind(returned_on)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if closed.rows_affected() == 0 {
            return Err(InventoryStoreError::AlreadyReturned);
        }

        sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn add_waiting_entry(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<WaitingListEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO waitinglist (book_id, user_id, status)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(book_id.value())
        .bind(user_id.value())
        .bind(WaitingStatus::Waiting.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(WaitingListEntry {
            id: WaitingEntryId::new(row.get("id")),
            book_id,
            user_id,
            status: WaitingStatus::Waiting,
        })
    }

    async fn waiting_entries(&self, book_id: BookId) -> Result<Vec<WaitingListEntry>> {
        let rows = sqlx::query(
            "SELECT id, book_id, user_id, status FROM waitinglist WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(map_row_to_waiting_entry).collect()
    }

    async fn clear_waiting_list(&self, book_id: BookId) -> Result<()> {
        sqlx::query("DELETE FROM waitinglist WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
