use crate::domain::messages::{AvailabilityNotice, InventoryResponse, channels};
use crate::ports::mailer::Mailer;
use crate::ports::message_channel::{Delivery, MessageChannel};
use std::sync::Arc;
use std::time::Duration;

use super::correlation::{ExchangeKey, ExchangeKind, PendingExchanges};

/// 購読が切れた後に再接続するまでの待ち時間
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// 応答キューのコンシューマループ
///
/// 種別ごとに1タスク。応答を相関レジストリへ引き渡し、処理後にackする。
/// 購読の失敗・切断時は少し待って再購読する。
pub async fn run_response_consumer(
    channel: Arc<dyn MessageChannel>,
    pending: Arc<PendingExchanges>,
    kind: ExchangeKind,
) {
    let queue = match kind {
        ExchangeKind::Borrow => channels::BORROW_RESPONSE,
        ExchangeKind::Return => channels::RETURN_RESPONSE,
    };

    loop {
        let mut consumer = match channel.subscribe(queue).await {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!(queue = %queue, error = %e, "Failed to subscribe, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        tracing::info!(queue = %queue, "Listening for {} responses", kind.as_str());

        loop {
            match consumer.next_delivery().await {
                Ok(Some(delivery)) => handle_response_delivery(&pending, kind, delivery).await,
                Ok(None) => {
                    tracing::info!(queue = %queue, "Response stream ended, reconnecting");
                    break;
                }
                Err(e) => {
                    tracing::error!(queue = %queue, error = %e, "Response consumer error, reconnecting");
                    break;
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn handle_response_delivery(
    pending: &PendingExchanges,
    kind: ExchangeKind,
    delivery: Delivery,
) {
    match serde_json::from_slice::<InventoryResponse>(delivery.payload()) {
        Ok(response) => {
            tracing::info!(
                user_id = response.user_id.value(),
                book_id = response.book_id.value(),
                status = ?response.status,
                message = %response.message,
                "{} response received",
                kind.as_str()
            );

            let key = ExchangeKey {
                kind,
                user_id: response.user_id,
                book_id: response.book_id,
            };
            if !pending.resolve(&key, response) {
                // 遅延応答・再配送された応答。無関係な待ち手に届けてはならない
                tracing::debug!(?key, "No waiter registered, dropping response");
            }
        }
        Err(e) => {
            // 不正なペイロードは再処理しても直らない
            tracing::warn!(error = %e, "Discarding malformed response payload");
        }
    }

    if let Err(e) = delivery.ack().await {
        tracing::error!(error = %e, "Failed to ack response delivery");
    }
}

/// book-availability トピックのコンシューマループ
///
/// 在庫復活通知をメーラーへ引き渡す。
pub async fn run_availability_consumer(channel: Arc<dyn MessageChannel>, mailer: Arc<dyn Mailer>) {
    loop {
        let mut consumer = match channel.subscribe(channels::BOOK_AVAILABILITY).await {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!(error = %e, "Failed to subscribe to availability topic, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        tracing::info!("Consumer for book availability notifications started");

        loop {
            match consumer.next_delivery().await {
                Ok(Some(delivery)) => handle_availability_delivery(mailer.as_ref(), delivery).await,
                Ok(None) => {
                    tracing::info!("Availability stream ended, reconnecting");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Availability consumer error, reconnecting");
                    break;
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn handle_availability_delivery(mailer: &dyn Mailer, delivery: Delivery) {
    match serde_json::from_slice::<AvailabilityNotice>(delivery.payload()) {
        Ok(notice) => {
            tracing::info!(
                user_id = notice.user_id.value(),
                book_id = notice.book_id.value(),
                timestamp = %notice.timestamp,
                "Received notification event: user is waiting for book"
            );

            if let Err(e) = mailer.send_availability_notice(&notice).await {
                tracing::error!(error = %e, "Failed to send availability notice");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed availability payload");
        }
    }

    if let Err(e) = delivery.ack().await {
        tracing::error!(error = %e, "Failed to ack availability delivery");
    }
}

// ============================================================================
// テスト
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::correlation::PollBudget;
    use super::*;
    use crate::adapters::{memory, mock};
    use crate::domain::value_objects::{BookId, UserId};
    use crate::ports::message_channel::MessageChannel as _;

    #[tokio::test]
    async fn test_response_consumer_resolves_waiter() {
        let channel = Arc::new(memory::MessageChannel::new());
        let pending = Arc::new(PendingExchanges::new());

        let key = ExchangeKey {
            kind: ExchangeKind::Borrow,
            user_id: UserId::new(1),
            book_id: BookId::new(2),
        };
        let registration = pending.register(key).unwrap();

        tokio::spawn(run_response_consumer(
            channel.clone(),
            pending.clone(),
            ExchangeKind::Borrow,
        ));

        let response = InventoryResponse::success(
            UserId::new(1),
            BookId::new(2),
            "Book borrowed successfully for user 1.",
        );
        channel
            .publish(
                channels::BORROW_RESPONSE,
                &serde_json::to_vec(&response).unwrap(),
            )
            .await
            .unwrap();

        let delivered = registration
            .wait(PollBudget::new(10, Duration::from_millis(100)))
            .await
            .unwrap();
        assert_eq!(delivered.message, "Book borrowed successfully for user 1.");
    }

    #[tokio::test]
    async fn test_malformed_response_is_acked_and_skipped() {
        let channel = Arc::new(memory::MessageChannel::new());
        let pending = Arc::new(PendingExchanges::new());

        tokio::spawn(run_response_consumer(
            channel.clone(),
            pending.clone(),
            ExchangeKind::Return,
        ));

        channel
            .publish(channels::RETURN_RESPONSE, b"not json")
            .await
            .unwrap();

        // 後続の正常な応答が処理されることを確認する
        let key = ExchangeKey {
            kind: ExchangeKind::Return,
            user_id: UserId::new(5),
            book_id: BookId::new(6),
        };
        let registration = pending.register(key).unwrap();

        let response = InventoryResponse::success(
            UserId::new(5),
            BookId::new(6),
            "Book \"Dune\" returned successfully",
        );
        channel
            .publish(
                channels::RETURN_RESPONSE,
                &serde_json::to_vec(&response).unwrap(),
            )
            .await
            .unwrap();

        let delivered = registration
            .wait(PollBudget::new(10, Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(delivered.is_success());
    }

    #[tokio::test]
    async fn test_availability_consumer_hands_notice_to_mailer() {
        let channel = Arc::new(memory::MessageChannel::new());
        let mailer = Arc::new(mock::Mailer::new());

        tokio::spawn(run_availability_consumer(channel.clone(), mailer.clone()));

        let notice = AvailabilityNotice {
            user_id: UserId::new(4),
            book_id: BookId::new(9),
            timestamp: chrono::Utc::now(),
        };
        channel
            .publish(
                channels::BOOK_AVAILABILITY,
                &serde_json::to_vec(&notice).unwrap(),
            )
            .await
            .unwrap();

        // コンシューマタスクが処理するまで少し待つ
        for _ in 0..50 {
            if !mailer.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, UserId::new(4));
        assert_eq!(sent[0].book_id, BookId::new(9));
    }
}
