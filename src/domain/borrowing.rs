#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BorrowingId, UserId, book::Book};

/// 貸出期間（日数）
pub const BORROW_PERIOD_DAYS: i64 = 14;

/// 貸出 - 1冊の書籍の1回の貸出記録
///
/// returned_on が None の間は「未返却（open）」。
/// 不変条件：同一の (user_id, book_id) に対して open な貸出は最大1件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrowing {
    pub id: BorrowingId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub borrowed_on: DateTime<Utc>,
    pub return_by: DateTime<Utc>,
    pub returned_on: Option<DateTime<Utc>>,
}

impl Borrowing {
    /// 未返却か
    pub fn is_open(&self) -> bool {
        self.returned_on.is_none()
    }
}

/// 永続化前の貸出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowing {
    pub book_id: BookId,
    pub user_id: UserId,
    pub borrowed_on: DateTime<Utc>,
    pub return_by: DateTime<Utc>,
}

/// 貸出記録を組み立てる（純粋な関数）
///
/// 返却期限は貸出日から14日後。
pub fn open_borrowing(user_id: UserId, book_id: BookId, now: DateTime<Utc>) -> NewBorrowing {
    NewBorrowing {
        book_id,
        user_id,
        borrowed_on: now,
        return_by: now + Duration::days(BORROW_PERIOD_DAYS),
    }
}

/// 貸出判定の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowDecision {
    /// 書籍が存在しない
    BookMissing,
    /// 在庫なし（予約待ちリストに登録する）
    NoCopies,
    /// 同じ利用者が同じ書籍を借用中
    AlreadyBorrowed,
    /// 貸出可能
    Lend(NewBorrowing),
}

/// 貸出可否を判定する（純粋な関数）
///
/// 判定順序は以下の通りで、変更してはならない：
/// 1. 書籍の存在
/// 2. 在庫の有無（在庫なしなら重複借用より優先して予約待ちへ）
/// 3. 重複借用の有無
///
/// # 引数
/// * `book` - 対象の書籍（存在しない場合はNone）
/// * `existing` - 同一 (利用者, 書籍) の未返却貸出（なければNone）
/// * `user_id` - 借りる利用者
/// * `now` - 判定時刻
pub fn decide_borrow(
    book: Option<&Book>,
    existing: Option<&Borrowing>,
    user_id: UserId,
    now: DateTime<Utc>,
) -> BorrowDecision {
    let Some(book) = book else {
        return BorrowDecision::BookMissing;
    };

    if !book.has_copies() {
        return BorrowDecision::NoCopies;
    }

    if existing.is_some() {
        return BorrowDecision::AlreadyBorrowed;
    }

    BorrowDecision::Lend(open_borrowing(user_id, book.id, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Isbn;

    fn book_with_copies(copies: u32) -> Book {
        Book {
            id: BookId::new(1),
            title: "The Left Hand of Darkness".into(),
            author: "Ursula K. Le Guin".into(),
            isbn: Isbn::try_from("9780441478125").unwrap(),
            available_copies: copies,
        }
    }

    fn open_record() -> Borrowing {
        let now = Utc::now();
        Borrowing {
            id: BorrowingId::new(10),
            book_id: BookId::new(1),
            user_id: UserId::new(5),
            borrowed_on: now,
            return_by: now + Duration::days(BORROW_PERIOD_DAYS),
            returned_on: None,
        }
    }

    #[test]
    fn test_open_borrowing_sets_fourteen_day_period() {
        let now = Utc::now();
        let record = open_borrowing(UserId::new(5), BookId::new(1), now);
        assert_eq!(record.borrowed_on, now);
        assert_eq!(record.return_by, now + Duration::days(14));
    }

    #[test]
    fn test_decide_borrow_missing_book() {
        let decision = decide_borrow(None, None, UserId::new(5), Utc::now());
        assert_eq!(decision, BorrowDecision::BookMissing);
    }

    #[test]
    fn test_decide_borrow_no_copies() {
        let book = book_with_copies(0);
        let decision = decide_borrow(Some(&book), None, UserId::new(5), Utc::now());
        assert_eq!(decision, BorrowDecision::NoCopies);
    }

    #[test]
    fn test_decide_borrow_already_borrowed() {
        let book = book_with_copies(2);
        let open = open_record();
        let decision = decide_borrow(Some(&book), Some(&open), UserId::new(5), Utc::now());
        assert_eq!(decision, BorrowDecision::AlreadyBorrowed);
    }

    #[test]
    fn test_decide_borrow_lends_when_available() {
        let book = book_with_copies(1);
        let now = Utc::now();
        match decide_borrow(Some(&book), None, UserId::new(5), now) {
            BorrowDecision::Lend(record) => {
                assert_eq!(record.book_id, BookId::new(1));
                assert_eq!(record.user_id, UserId::new(5));
                assert_eq!(record.return_by, now + Duration::days(14));
            }
            other => panic!("expected Lend, got {:?}", other),
        }
    }

    #[test]
    fn test_no_copies_takes_precedence_over_duplicate_borrow() {
        // 在庫切れの判定は重複借用の判定より先に行われる
        let book = book_with_copies(0);
        let open = open_record();
        let decision = decide_borrow(Some(&book), Some(&open), UserId::new(5), Utc::now());
        assert_eq!(decision, BorrowDecision::NoCopies);
    }

    #[test]
    fn test_borrowing_is_open() {
        let mut record = open_record();
        assert!(record.is_open());
        record.returned_on = Some(Utc::now());
        assert!(!record.is_open());
    }
}
