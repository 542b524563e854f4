use crate::domain::messages::{BorrowRequest, InventoryResponse, ReturnRequest, channels};
use crate::domain::value_objects::{BookId, UserId};
use crate::ports::message_channel::MessageChannel;
use serde::Serialize;
use std::sync::Arc;

use super::correlation::{ExchangeKey, ExchangeKind, PendingExchanges, PollBudget};
use super::errors::{CirculationError, Result};

/// オーケストレータの依存関係
///
/// すべての依存が明示的なデータ構造として渡される。振る舞いは
/// 純粋な関数として定義する。
#[derive(Clone)]
pub struct CirculationDependencies {
    pub channel: Arc<dyn MessageChannel>,
    pub pending: Arc<PendingExchanges>,
    pub poll_budget: PollBudget,
}

/// 書籍の借用を要求する
///
/// 同期的なHTTP要求の裏で、永続キュー越しの要求・応答の往復を行う。
///
/// 流れ：
/// 1. 入力の検証
/// 2. 相関セルの登録（同一キーの同時要求は拒否）
/// 3. borrow_request_queue への発行
/// 4. 有界ポーリングでの応答待ち
/// 5. 応答の分類
pub async fn request_borrow(
    deps: &CirculationDependencies,
    user_id: i64,
    book_id: i64,
) -> Result<String> {
    let (user_id, book_id) = validate_ids(user_id, book_id)?;

    let key = ExchangeKey {
        kind: ExchangeKind::Borrow,
        user_id,
        book_id,
    };
    let registration = deps.pending.register(key).map_err(|_| {
        CirculationError::Conflict(
            "A borrow request for this user and book is already in flight".to_string(),
        )
    })?;

    // 発行に失敗して早期リターンすると、registrationのDropがセルを解除する
    let request = BorrowRequest { user_id, book_id };
    if let Err(e) = publish_json(deps, channels::BORROW_REQUEST, &request).await {
        tracing::error!(error = %e, "Error sending borrow request");
        return Err(e);
    }
    tracing::info!(
        user_id = user_id.value(),
        book_id = book_id.value(),
        "Sent borrow request"
    );

    let response = registration
        .wait(deps.poll_budget)
        .await
        .ok_or(CirculationError::Timeout)?;

    classify_borrow_response(response)
}

/// 書籍の返却を要求する
///
/// 借用と同じ往復を return_request_queue / return_response_queue で行う。
pub async fn request_return(
    deps: &CirculationDependencies,
    user_id: i64,
    book_id: i64,
) -> Result<String> {
    let (user_id, book_id) = validate_ids(user_id, book_id)?;

    let key = ExchangeKey {
        kind: ExchangeKind::Return,
        user_id,
        book_id,
    };
    let registration = deps.pending.register(key).map_err(|_| {
        CirculationError::Conflict(
            "A return request for this user and book is already in flight".to_string(),
        )
    })?;

    let request = ReturnRequest { user_id, book_id };
    if let Err(e) = publish_json(deps, channels::RETURN_REQUEST, &request).await {
        tracing::error!(error = %e, "Error sending return request");
        return Err(e);
    }
    tracing::info!(
        user_id = user_id.value(),
        book_id = book_id.value(),
        "Sent return request"
    );

    let response = registration
        .wait(deps.poll_budget)
        .await
        .ok_or(CirculationError::Timeout)?;

    classify_return_response(response)
}

fn validate_ids(user_id: i64, book_id: i64) -> Result<(UserId, BookId)> {
    if user_id <= 0 || book_id <= 0 {
        return Err(CirculationError::InvalidRequest(
            "User ID and Book ID are required".to_string(),
        ));
    }
    Ok((UserId::new(user_id), BookId::new(book_id)))
}

async fn publish_json<T: Serialize>(
    deps: &CirculationDependencies,
    queue: &str,
    message: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(message)
        .map_err(|e| CirculationError::InternalError(format!("Failed to encode request: {}", e)))?;

    deps.channel
        .publish(queue, &payload)
        .await
        .map_err(|e| CirculationError::InternalError(format!("Failed to publish request: {}", e)))
}

/// 借用応答を結果へ分類する
///
/// 在庫側の失敗メッセージは自由文のため、文言への部分一致で振り分ける。
/// 文言はワイヤ契約の一部として固定されている。
fn classify_borrow_response(response: InventoryResponse) -> Result<String> {
    if response.is_success() {
        return Ok(response.message);
    }

    let message = response.message;
    if message.contains("not found") {
        Err(CirculationError::NotFound(message))
    } else if message.contains("No copies available") {
        Err(CirculationError::Exhausted(message))
    } else if message.contains("already borrowed") {
        Err(CirculationError::Conflict(message))
    } else {
        Err(CirculationError::InternalError(message))
    }
}

/// 返却応答を結果へ分類する
fn classify_return_response(response: InventoryResponse) -> Result<String> {
    if response.is_success() {
        Ok(response.message)
    } else {
        Err(CirculationError::InternalError(response.message))
    }
}

// ============================================================================
// テスト
// ============================================================================
