use crate::domain::messages::InventoryResponse;
use crate::domain::value_objects::{BookId, UserId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// 交換の種別
///
/// 応答は (種別, 利用者, 書籍) でしか相関できないため、借用と返却を
/// 別のキー空間に分ける。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Borrow,
    Return,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Borrow => "borrow",
            ExchangeKind::Return => "return",
        }
    }
}

/// 進行中の交換を識別するキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeKey {
    pub kind: ExchangeKind,
    pub user_id: UserId,
    pub book_id: BookId,
}

/// 応答待ちの有界ポーリング予算
///
/// 待機は「1回あたりの上限 × 試行回数」で打ち切る。既定はおよそ20秒。
#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    pub attempts: u32,
    pub per_attempt: Duration,
}

impl PollBudget {
    pub fn new(attempts: u32, per_attempt: Duration) -> Self {
        Self {
            attempts,
            per_attempt,
        }
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            attempts: 10,
            per_attempt: Duration::from_secs(2),
        }
    }
}

/// 同一キーの交換が既に進行中
#[derive(Debug, Error, PartialEq, Eq)]
#[error("request already in flight for this user and book")]
pub struct AlreadyInFlight;

#[derive(Debug)]
struct Cell {
    /// 登録ごとに採番されるトークン。タイムアウトした登録のDropが
    /// 後継の登録を誤って消さないための照合に使う。
    token: u64,
    sender: oneshot::Sender<InventoryResponse>,
}

/// 進行中交換のレジストリ
///
/// 共有の応答キューを舐める代わりに、キーごとの一回きりの結果セルで
/// 応答を待ち手へ届ける。キーあたり同時に1件のみ登録できる。
#[derive(Debug)]
pub struct PendingExchanges {
    cells: Mutex<HashMap<ExchangeKey, Cell>>,
    next_token: AtomicU64,
}

impl PendingExchanges {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// キーに対する結果セルを登録する
    ///
    /// # エラー
    /// 同一キーが既に登録済みの場合は`AlreadyInFlight`
    pub fn register(&self, key: ExchangeKey) -> Result<Registration<'_>, AlreadyInFlight> {
        let mut cells = self.cells.lock().unwrap();
        if cells.contains_key(&key) {
            return Err(AlreadyInFlight);
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        cells.insert(key, Cell { token, sender });

        Ok(Registration {
            store: self,
            key,
            token,
            receiver,
        })
    }

    /// 応答を登録済みの待ち手へ届ける
    ///
    /// セルを取り除いてから送達するため、同じ応答が二度届くことはない。
    /// 待ち手がいなければ`false`を返し、応答は破棄される（遅延応答や
    /// 再配送された応答が無関係な待ち手に届いてはならない）。
    pub fn resolve(&self, key: &ExchangeKey, response: InventoryResponse) -> bool {
        let cell = self.cells.lock().unwrap().remove(key);
        match cell {
            // 送達直前に待ち手が諦めた場合、sendは失敗する
            Some(cell) => cell.sender.send(response).is_ok(),
            None => false,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cells.lock().unwrap().len()
    }
}

impl Default for PendingExchanges {
    fn default() -> Self {
        Self::new()
    }
}

/// 1件の進行中交換
///
/// Dropで自身のセルのみを登録解除する。`resolve`済み、あるいは後継が
/// 同じキーを再登録していた場合、トークンが一致せず何もしない。
#[derive(Debug)]
pub struct Registration<'a> {
    store: &'a PendingExchanges,
    key: ExchangeKey,
    token: u64,
    receiver: oneshot::Receiver<InventoryResponse>,
}

impl Registration<'_> {
    pub fn key(&self) -> ExchangeKey {
        self.key
    }

    /// 予算の範囲内で応答を待つ
    ///
    /// 予算を使い切ると`None`。その時点で要求の結果は不明であり、
    /// 補償は行わない（遅れて届いた応答は`resolve`が破棄する）。
    pub async fn wait(mut self, budget: PollBudget) -> Option<InventoryResponse> {
        for _ in 0..budget.attempts {
            match tokio::time::timeout(budget.per_attempt, &mut self.receiver).await {
                Ok(Ok(response)) => return Some(response),
                // 送信側がセルごと破棄された
                Ok(Err(_)) => return None,
                // 今回の試行では届かなかった
                Err(_) => continue,
            }
        }
        None
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Ok(mut cells) = self.store.cells.lock() {
            if let Some(cell) = cells.get(&self.key) {
                if cell.token == self.token {
                    cells.remove(&self.key);
                }
            }
        }
    }
}

// ============================================================================
// テスト
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kind: ExchangeKind, user: i64, book: i64) -> ExchangeKey {
        ExchangeKey {
            kind,
            user_id: UserId::new(user),
            book_id: BookId::new(book),
        }
    }

    fn response(user: i64, book: i64, message: &str) -> InventoryResponse {
        InventoryResponse::success(UserId::new(user), BookId::new(book), message)
    }

    fn short_budget() -> PollBudget {
        PollBudget::new(3, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_resolve_delivers_response_to_waiter() {
        let store = PendingExchanges::new();
        let k = key(ExchangeKind::Borrow, 1, 2);

        let registration = store.register(k).unwrap();
        assert!(store.resolve(&k, response(1, 2, "ok")));

        let delivered = registration.wait(short_budget()).await.unwrap();
        assert_eq!(delivered.message, "ok");
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_resolve_without_waiter_drops_response() {
        let store = PendingExchanges::new();
        let k = key(ExchangeKind::Borrow, 1, 2);

        assert!(!store.resolve(&k, response(1, 2, "late")));
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let store = PendingExchanges::new();
        let k = key(ExchangeKind::Borrow, 1, 2);

        let first = store.register(k).unwrap();
        assert_eq!(store.register(k).unwrap_err(), AlreadyInFlight);

        // 先行の待ち手が消えればキーは再利用できる
        drop(first);
        assert!(store.register(k).is_ok());
    }

    #[tokio::test]
    async fn test_same_ids_different_kind_are_distinct_keys() {
        let store = PendingExchanges::new();
        let borrow_key = key(ExchangeKind::Borrow, 1, 2);
        let return_key = key(ExchangeKind::Return, 1, 2);

        let borrow_reg = store.register(borrow_key).unwrap();
        let _return_reg = store.register(return_key).unwrap();

        assert!(store.resolve(&borrow_key, response(1, 2, "borrowed")));
        let delivered = borrow_reg.wait(short_budget()).await.unwrap();
        assert_eq!(delivered.message, "borrowed");

        // 返却側の待ち手は影響を受けない
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_budget_and_deregisters() {
        let store = PendingExchanges::new();
        let k = key(ExchangeKind::Return, 5, 6);

        let registration = store.register(k).unwrap();
        assert!(registration.wait(short_budget()).await.is_none());

        // タイムアウトした待ち手のセルは消えている
        assert_eq!(store.len(), 0);
        assert!(!store.resolve(&k, response(5, 6, "too late")));
    }

    #[tokio::test]
    async fn test_stale_drop_does_not_evict_successor() {
        let store = PendingExchanges::new();
        let k = key(ExchangeKind::Borrow, 1, 2);

        // 先行の登録が解決済みのまま生きている間に、後継が同じキーを登録する
        let stale = store.register(k).unwrap();
        assert!(store.resolve(&k, response(1, 2, "first")));
        let successor = store.register(k).unwrap();

        drop(stale);

        // 後継のセルは生き残り、応答を受け取れる
        assert!(store.resolve(&k, response(1, 2, "second")));
        let delivered = successor.wait(short_budget()).await.unwrap();
        assert_eq!(delivered.message, "second");
    }

    #[tokio::test]
    async fn test_replayed_response_is_not_delivered_twice() {
        let store = PendingExchanges::new();
        let k = key(ExchangeKind::Borrow, 1, 2);

        let registration = store.register(k).unwrap();
        assert!(store.resolve(&k, response(1, 2, "once")));
        // 同じ応答の再配送はセルを見つけられない
        assert!(!store.resolve(&k, response(1, 2, "once")));

        let delivered = registration.wait(short_budget()).await.unwrap();
        assert_eq!(delivered.message, "once");
    }
}
