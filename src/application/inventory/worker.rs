use crate::domain::messages::{BorrowRequest, InventoryResponse, ReturnRequest, channels};
use crate::ports::message_channel::{Delivery, MessageChannel};
use std::time::Duration;

use super::mutator::{InventoryDependencies, process_borrow_request, process_return_request};

/// 購読が切れた後に再接続するまでの待ち時間
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// 借用要求キューのワーカーループ
///
/// 要求を1件ずつ処理し、応答を発行してからackする。
/// 購読の失敗・切断時は少し待って再購読する。
pub async fn run_borrow_request_worker(deps: InventoryDependencies) {
    loop {
        let mut consumer = match deps.channel.subscribe(channels::BORROW_REQUEST).await {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!(
                    queue = %channels::BORROW_REQUEST,
                    error = %e,
                    "Failed to subscribe, retrying"
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        tracing::info!("Started listening for borrow requests");

        loop {
            match consumer.next_delivery().await {
                Ok(Some(delivery)) => handle_borrow_delivery(&deps, delivery).await,
                Ok(None) => {
                    tracing::info!("Borrow request stream ended, reconnecting");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Borrow request consumer error, reconnecting");
                    break;
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn handle_borrow_delivery(deps: &InventoryDependencies, delivery: Delivery) {
    match serde_json::from_slice::<BorrowRequest>(delivery.payload()) {
        Ok(request) => {
            tracing::info!(
                user_id = request.user_id.value(),
                book_id = request.book_id.value(),
                "Received borrow request"
            );
            let response = process_borrow_request(deps, &request).await;
            publish_response(deps, channels::BORROW_RESPONSE, &response).await;
        }
        Err(e) => {
            // 不正なペイロードは再処理しても直らない
            tracing::warn!(error = %e, "Discarding malformed borrow request");
        }
    }

    if let Err(e) = delivery.ack().await {
        tracing::error!(error = %e, "Failed to ack borrow request delivery");
    }
}

/// 返却要求キューのワーカーループ
pub async fn run_return_request_worker(deps: InventoryDependencies) {
    loop {
        let mut consumer = match deps.channel.subscribe(channels::RETURN_REQUEST).await {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::error!(
                    queue = %channels::RETURN_REQUEST,
                    error = %e,
                    "Failed to subscribe, retrying"
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        tracing::info!("Started listening for return requests");

        loop {
            match consumer.next_delivery().await {
                Ok(Some(delivery)) => handle_return_delivery(&deps, delivery).await,
                Ok(None) => {
                    tracing::info!("Return request stream ended, reconnecting");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Return request consumer error, reconnecting");
                    break;
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn handle_return_delivery(deps: &InventoryDependencies, delivery: Delivery) {
    match serde_json::from_slice::<ReturnRequest>(delivery.payload()) {
        Ok(request) => {
            tracing::info!(
                user_id = request.user_id.value(),
                book_id = request.book_id.value(),
                "Received return request"
            );
            let response = process_return_request(deps, &request).await;
            publish_response(deps, channels::RETURN_RESPONSE, &response).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed return request");
        }
    }

    if let Err(e) = delivery.ack().await {
        tracing::error!(error = %e, "Failed to ack return request delivery");
    }
}

/// 応答を応答キューへ発行する
///
/// 発行に失敗しても要求はackする。応答を失った要求は利用者サービス側の
/// タイムアウトで回収される。
async fn publish_response(
    deps: &InventoryDependencies,
    queue: &str,
    response: &InventoryResponse,
) {
    let payload = match serde_json::to_vec(response) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode inventory response");
            return;
        }
    };

    if let Err(e) = deps.channel.publish(queue, &payload).await {
        tracing::error!(queue = %queue, error = %e, "Failed to publish inventory response");
    } else {
        tracing::debug!(
            queue = %queue,
            user_id = response.user_id.value(),
            book_id = response.book_id.value(),
            status = ?response.status,
            "Inventory response published"
        );
    }
}

// ============================================================================
// テスト
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory;
    use crate::domain::book::new_book;
    use crate::domain::value_objects::UserId;
    use crate::ports::inventory_store::InventoryStore;
    use std::sync::Arc;

    async fn spawn_workers() -> (InventoryDependencies, Arc<memory::MessageChannel>) {
        let store = Arc::new(memory::InventoryStore::new());
        let channel = Arc::new(memory::MessageChannel::new());
        let deps = InventoryDependencies {
            store,
            channel: channel.clone(),
        };
        tokio::spawn(run_borrow_request_worker(deps.clone()));
        tokio::spawn(run_return_request_worker(deps.clone()));
        (deps, channel)
    }

    async fn next_response(
        channel: &memory::MessageChannel,
        queue: &str,
    ) -> InventoryResponse {
        let mut consumer = channel.subscribe(queue).await.unwrap();
        let delivery = consumer.next_delivery().await.unwrap().unwrap();
        let response = serde_json::from_slice(delivery.payload()).unwrap();
        delivery.ack().await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_borrow_worker_publishes_exactly_one_response() {
        let (deps, channel) = spawn_workers().await;
        let book = deps
            .store
            .add_book(new_book("Dune", "Frank Herbert", "9780441172719", 1).unwrap())
            .await
            .unwrap();

        let request = BorrowRequest {
            user_id: UserId::new(1),
            book_id: book.id,
        };
        channel
            .publish(channels::BORROW_REQUEST, &serde_json::to_vec(&request).unwrap())
            .await
            .unwrap();

        let response = next_response(&channel, channels::BORROW_RESPONSE).await;
        assert!(response.is_success());
        assert_eq!(response.user_id, request.user_id);
        assert_eq!(response.book_id, request.book_id);
        assert_eq!(response.message, "Book borrowed successfully for user 1.");
    }

    #[tokio::test]
    async fn test_return_worker_round_trip() {
        let (deps, channel) = spawn_workers().await;
        let book = deps
            .store
            .add_book(new_book("Dune", "Frank Herbert", "9780441172719", 1).unwrap())
            .await
            .unwrap();

        let user_id = UserId::new(2);
        channel
            .publish(
                channels::BORROW_REQUEST,
                &serde_json::to_vec(&BorrowRequest {
                    user_id,
                    book_id: book.id,
                })
                .unwrap(),
            )
            .await
            .unwrap();
        assert!(next_response(&channel, channels::BORROW_RESPONSE).await.is_success());

        channel
            .publish(
                channels::RETURN_REQUEST,
                &serde_json::to_vec(&ReturnRequest {
                    user_id,
                    book_id: book.id,
                })
                .unwrap(),
            )
            .await
            .unwrap();

        let response = next_response(&channel, channels::RETURN_RESPONSE).await;
        assert!(response.is_success());
        assert_eq!(response.message, "Book \"Dune\" returned successfully");
    }

    #[tokio::test]
    async fn test_malformed_request_is_acked_and_skipped() {
        let (deps, channel) = spawn_workers().await;
        let book = deps
            .store
            .add_book(new_book("Dune", "Frank Herbert", "9780441172719", 1).unwrap())
            .await
            .unwrap();

        channel
            .publish(channels::BORROW_REQUEST, b"not json")
            .await
            .unwrap();

        // 後続の正常な要求は処理される
        channel
            .publish(
                channels::BORROW_REQUEST,
                &serde_json::to_vec(&BorrowRequest {
                    user_id: UserId::new(3),
                    book_id: book.id,
                })
                .unwrap(),
            )
            .await
            .unwrap();

        let response = next_response(&channel, channels::BORROW_RESPONSE).await;
        assert!(response.is_success());
        assert_eq!(response.user_id, UserId::new(3));
    }
}
