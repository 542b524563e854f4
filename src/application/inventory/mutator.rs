use crate::domain::borrowing::{BorrowDecision, decide_borrow};
use crate::domain::messages::{BorrowRequest, InventoryResponse, ReturnRequest};
use crate::domain::value_objects::{BookId, UserId};
use crate::ports::inventory_store::{InventoryStore, InventoryStoreError};
use crate::ports::message_channel::MessageChannel;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use super::waiting_list::{DrainError, drain_and_notify};

/// 蔵書サービス側の依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞いは持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct InventoryDependencies {
    pub store: Arc<dyn InventoryStore>,
    pub channel: Arc<dyn MessageChannel>,
}

/// 借用要求の失敗理由
///
/// Displayの文言はそのまま応答ペイロードに載り、利用者サービス側が
/// 部分文字列で分類するため固定。
#[derive(Debug, Error)]
pub enum BorrowFailure {
    /// 書籍が存在しない
    #[error("Book with ID {} not found.", .0.value())]
    BookNotFound(BookId),

    /// 在庫なし（予約待ちリストに登録済み）
    #[error("No copies available for book {}. Subscribed.", .0.value())]
    NoCopies(BookId),

    /// 同じ利用者が同じ書籍を借用中
    #[error("User {} has already borrowed book {}.", .0.value(), .1.value())]
    AlreadyBorrowed(UserId, BookId),

    /// ストア障害
    #[error("Error processing borrow request: {0}")]
    Storage(#[from] InventoryStoreError),
}

/// 返却要求の失敗理由
#[derive(Debug, Error)]
pub enum ReturnFailure {
    /// 未返却の貸出が見つからない
    #[error("Book not found or not borrowed")]
    NotBorrowed,

    /// ストア障害
    #[error("Error processing return request: {0}")]
    Storage(#[from] InventoryStoreError),

    /// 予約待ち通知のドレイン失敗
    #[error("Error processing return request: {0}")]
    Drain(#[from] DrainError),
}

/// 借用要求を処理して応答を組み立てる
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 在庫があること（在庫なしの場合は予約待ちリストに登録する）
/// - 同一 (利用者, 書籍) の未返却貸出がないこと
///
/// 失敗しても必ずfailure応答を返す。「1要求につき1応答」の契約は
/// 呼び出し側のワーカーがこの戻り値を応答キューへ発行して満たす。
pub async fn process_borrow_request(
    deps: &InventoryDependencies,
    request: &BorrowRequest,
) -> InventoryResponse {
    match try_borrow(deps, request).await {
        Ok(message) => InventoryResponse::success(request.user_id, request.book_id, message),
        Err(failure) => {
            InventoryResponse::failure(request.user_id, request.book_id, failure.to_string())
        }
    }
}

async fn try_borrow(
    deps: &InventoryDependencies,
    request: &BorrowRequest,
) -> Result<String, BorrowFailure> {
    // 1. 書籍と既存貸出を取得。在庫なしの判定は重複借用より優先される
    //    ため、既存貸出は在庫がある場合だけ引く
    let book = deps.store.find_book(request.book_id).await?;
    let existing = match &book {
        Some(book) if book.has_copies() => {
            deps.store
                .find_open_borrowing(request.user_id, request.book_id)
                .await?
        }
        _ => None,
    };

    // 2. ドメイン層の純粋関数で貸出可否を判定
    match decide_borrow(book.as_ref(), existing.as_ref(), request.user_id, Utc::now()) {
        BorrowDecision::BookMissing => Err(BorrowFailure::BookNotFound(request.book_id)),
        BorrowDecision::NoCopies => Err(subscribe_waiter(deps, request).await),
        BorrowDecision::AlreadyBorrowed => Err(BorrowFailure::AlreadyBorrowed(
            request.user_id,
            request.book_id,
        )),
        // 3. 在庫減算と貸出行の挿入はストアがアトミックに行う
        BorrowDecision::Lend(borrowing) => match deps.store.create_borrowing(borrowing).await {
            Ok(_) => Ok(format!(
                "Book borrowed successfully for user {}.",
                request.user_id.value()
            )),
            // 判定と挿入の間に他の要求が最後の在庫を使った場合も予約待ちへ
            Err(InventoryStoreError::NoCopies) => Err(subscribe_waiter(deps, request).await),
            Err(InventoryStoreError::BorrowingExists) => Err(BorrowFailure::AlreadyBorrowed(
                request.user_id,
                request.book_id,
            )),
            Err(e) => Err(BorrowFailure::Storage(e)),
        },
    }
}

/// 予約待ちリストに登録し、在庫なし失敗を組み立てる
async fn subscribe_waiter(deps: &InventoryDependencies, request: &BorrowRequest) -> BorrowFailure {
    match deps
        .store
        .add_waiting_entry(request.user_id, request.book_id)
        .await
    {
        Ok(_) => BorrowFailure::NoCopies(request.book_id),
        Err(e) => BorrowFailure::Storage(e),
    }
}

/// 返却要求を処理して応答を組み立てる
///
/// ビジネスルール：
/// - 同一 (利用者, 書籍) の未返却貸出が存在すること
/// - 返却確定後、予約待ちリストをドレインして在庫復活を通知すること
pub async fn process_return_request(
    deps: &InventoryDependencies,
    request: &ReturnRequest,
) -> InventoryResponse {
    match try_return(deps, request).await {
        Ok(message) => InventoryResponse::success(request.user_id, request.book_id, message),
        Err(failure) => {
            InventoryResponse::failure(request.user_id, request.book_id, failure.to_string())
        }
    }
}

async fn try_return(
    deps: &InventoryDependencies,
    request: &ReturnRequest,
) -> Result<String, ReturnFailure> {
    // 1. 未返却の貸出を特定
    let Some(borrowing) = deps
        .store
        .find_open_borrowing(request.user_id, request.book_id)
        .await?
    else {
        return Err(ReturnFailure::NotBorrowed);
    };

    // 2. 応答メッセージ用にタイトルを引く
    let Some(book) = deps.store.find_book(request.book_id).await? else {
        return Err(ReturnFailure::NotBorrowed);
    };

    // 3. returned_on の設定と在庫の加算はストアがアトミックに行う
    match deps
        .store
        .close_borrowing(borrowing.id, request.book_id, Utc::now())
        .await
    {
        Ok(()) => {}
        // 同じ返却が並行して走った場合、勝者だけが成功する
        Err(InventoryStoreError::AlreadyReturned) => return Err(ReturnFailure::NotBorrowed),
        Err(e) => return Err(ReturnFailure::Storage(e)),
    }

    // 4. 予約待ちリストをドレインして在庫復活を通知
    drain_and_notify(&deps.store, &deps.channel, request.book_id).await?;

    Ok(format!("Book \"{}\" returned successfully", book.title))
}

// ============================================================================
// テスト
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory;
    use crate::domain::book::new_book;
    use crate::domain::messages::{AvailabilityNotice, channels};

    fn test_deps() -> (
        InventoryDependencies,
        Arc<memory::InventoryStore>,
        Arc<memory::MessageChannel>,
    ) {
        let store = Arc::new(memory::InventoryStore::new());
        let channel = Arc::new(memory::MessageChannel::new());
        let deps = InventoryDependencies {
            store: store.clone(),
            channel: channel.clone(),
        };
        (deps, store, channel)
    }

    async fn seed_book(store: &memory::InventoryStore, copies: u32) -> BookId {
        store
            .add_book(new_book("Dune", "Frank Herbert", "9780441172719", copies).unwrap())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_borrow_success_decrements_copies() {
        let (deps, store, _) = test_deps();
        let book_id = seed_book(&store, 2).await;

        let request = BorrowRequest {
            user_id: UserId::new(1),
            book_id,
        };
        let response = process_borrow_request(&deps, &request).await;

        assert!(response.is_success());
        assert_eq!(response.message, "Book borrowed successfully for user 1.");
        assert_eq!(store.copies_of(book_id), Some(1));
    }

    #[tokio::test]
    async fn test_borrow_missing_book_fails() {
        let (deps, store, _) = test_deps();

        let request = BorrowRequest {
            user_id: UserId::new(1),
            book_id: BookId::new(99),
        };
        let response = process_borrow_request(&deps, &request).await;

        assert!(!response.is_success());
        assert_eq!(response.message, "Book with ID 99 not found.");
        assert!(store.waiting_entries(BookId::new(99)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_borrow_exhausted_subscribes_waiter() {
        let (deps, store, _) = test_deps();
        let book_id = seed_book(&store, 0).await;

        let request = BorrowRequest {
            user_id: UserId::new(5),
            book_id,
        };
        let response = process_borrow_request(&deps, &request).await;

        assert!(!response.is_success());
        assert_eq!(
            response.message,
            format!("No copies available for book {}. Subscribed.", book_id.value())
        );

        // 在庫は変化せず、予約待ちエントリが1件増える
        assert_eq!(store.copies_of(book_id), Some(0));
        let entries = store.waiting_entries(book_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, UserId::new(5));
    }

    #[tokio::test]
    async fn test_borrow_duplicate_fails_without_side_effects() {
        let (deps, store, _) = test_deps();
        let book_id = seed_book(&store, 2).await;

        let request = BorrowRequest {
            user_id: UserId::new(1),
            book_id,
        };
        assert!(process_borrow_request(&deps, &request).await.is_success());

        let second = process_borrow_request(&deps, &request).await;
        assert!(!second.is_success());
        assert_eq!(
            second.message,
            format!("User 1 has already borrowed book {}.", book_id.value())
        );
        assert_eq!(store.copies_of(book_id), Some(1));
        assert!(store.waiting_entries(book_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_return_success_restores_copy_and_names_title() {
        let (deps, store, _) = test_deps();
        let book_id = seed_book(&store, 1).await;

        let user_id = UserId::new(1);
        let borrow = BorrowRequest { user_id, book_id };
        assert!(process_borrow_request(&deps, &borrow).await.is_success());
        assert_eq!(store.copies_of(book_id), Some(0));

        let request = ReturnRequest { user_id, book_id };
        let response = process_return_request(&deps, &request).await;

        assert!(response.is_success());
        assert_eq!(response.message, "Book \"Dune\" returned successfully");
        assert_eq!(store.copies_of(book_id), Some(1));
    }

    #[tokio::test]
    async fn test_return_without_borrowing_fails() {
        let (deps, store, _) = test_deps();
        let book_id = seed_book(&store, 1).await;

        let request = ReturnRequest {
            user_id: UserId::new(9),
            book_id,
        };
        let response = process_return_request(&deps, &request).await;

        assert!(!response.is_success());
        assert_eq!(response.message, "Book not found or not borrowed");
        assert_eq!(store.copies_of(book_id), Some(1));
    }

    #[tokio::test]
    async fn test_replayed_return_does_not_restore_twice() {
        let (deps, store, _) = test_deps();
        let book_id = seed_book(&store, 1).await;

        let user_id = UserId::new(1);
        assert!(
            process_borrow_request(&deps, &BorrowRequest { user_id, book_id })
                .await
                .is_success()
        );

        let request = ReturnRequest { user_id, book_id };
        assert!(process_return_request(&deps, &request).await.is_success());
        assert_eq!(store.copies_of(book_id), Some(1));

        // 同じ返却要求の再配送は失敗応答になり、在庫は加算されない
        let replay = process_return_request(&deps, &request).await;
        assert!(!replay.is_success());
        assert_eq!(replay.message, "Book not found or not borrowed");
        assert_eq!(store.copies_of(book_id), Some(1));
    }

    #[tokio::test]
    async fn test_return_notifies_waiters_and_clears_list() {
        let (deps, store, channel) = test_deps();
        let book_id = seed_book(&store, 1).await;

        let borrower = UserId::new(1);
        assert!(
            process_borrow_request(&deps, &BorrowRequest { user_id: borrower, book_id })
                .await
                .is_success()
        );

        // 在庫切れの間に2人が予約待ちに入る
        for waiter in [2, 3] {
            let response = process_borrow_request(
                &deps,
                &BorrowRequest {
                    user_id: UserId::new(waiter),
                    book_id,
                },
            )
            .await;
            assert!(!response.is_success());
        }
        assert_eq!(store.waiting_entries(book_id).await.unwrap().len(), 2);

        let response = process_return_request(
            &deps,
            &ReturnRequest {
                user_id: borrower,
                book_id,
            },
        )
        .await;
        assert!(response.is_success());

        // 待ち手ごとに1通知、発行後にリストは空
        assert!(store.waiting_entries(book_id).await.unwrap().is_empty());
        let mut consumer = channel.subscribe(channels::BOOK_AVAILABILITY).await.unwrap();
        for expected in [2, 3] {
            let delivery = consumer.next_delivery().await.unwrap().unwrap();
            let notice: AvailabilityNotice =
                serde_json::from_slice(delivery.payload()).unwrap();
            assert_eq!(notice.user_id, UserId::new(expected));
            assert_eq!(notice.book_id, book_id);
            delivery.ack().await.unwrap();
        }
    }
}
