use crate::domain::messages::{AvailabilityNotice, channels};
use crate::domain::value_objects::BookId;
use crate::ports::inventory_store::{InventoryStore, InventoryStoreError};
use crate::ports::message_channel::{ChannelError, MessageChannel};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// 予約待ちドレインのエラー
#[derive(Debug, Error)]
pub enum DrainError {
    /// ストア障害
    #[error("waiting list storage error: {0}")]
    Storage(#[from] InventoryStoreError),

    /// 通知のエンコード失敗
    #[error("failed to encode availability notice: {0}")]
    Encode(#[from] serde_json::Error),

    /// 通知の発行失敗
    #[error("failed to publish availability notice: {0}")]
    Publish(#[from] ChannelError),
}

/// 予約待ちリストをドレインして在庫復活を通知する
///
/// ビジネスルール：
/// - エントリ1件につき通知を1件発行する（重複購読者には重複通知）
/// - すべての通知を発行してからリストを一括削除する
///
/// 発行が途中で失敗した場合はエントリを残したまま中断する。残った
/// エントリは次の返却で再ドレインされるため、通知は欠落せず重複しうる。
///
/// # 戻り値
/// 通知した件数
pub async fn drain_and_notify(
    store: &Arc<dyn InventoryStore>,
    channel: &Arc<dyn MessageChannel>,
    book_id: BookId,
) -> Result<usize, DrainError> {
    let entries = store.waiting_entries(book_id).await?;
    if entries.is_empty() {
        return Ok(0);
    }

    for entry in &entries {
        let notice = AvailabilityNotice {
            user_id: entry.user_id,
            book_id,
            timestamp: Utc::now(),
        };
        let payload = serde_json::to_vec(&notice)?;
        channel
            .publish(channels::BOOK_AVAILABILITY, &payload)
            .await?;
        tracing::info!(
            user_id = entry.user_id.value(),
            book_id = book_id.value(),
            "Published book availability notification"
        );
    }

    store.clear_waiting_list(book_id).await?;
    Ok(entries.len())
}
