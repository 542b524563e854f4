use async_trait::async_trait;
use thiserror::Error;

/// メッセージチャネルのエラー
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Acknowledge failed: {0}")]
    Ack(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// メッセージチャネルポート
///
/// 要求キュー・応答キュー・通知トピックを1つの抽象で覆う。
///
/// 配信保証：
/// - メッセージは永続化され、少なくとも1回配信される（at-least-once）
/// - 確認応答（ack）は処理側が明示的に行う
/// - ackされないまま破棄された配信は再配信される
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// メッセージを永続発行する
    async fn publish(&self, channel_name: &str, payload: &[u8]) -> Result<()>;

    /// チャネルの購読を開始する
    ///
    /// 返されたコンシューマは1件ずつ配信を取り出す。処理の完了
    /// （下流への応答発行を含む）後に `Delivery::ack` を呼び、
    /// それから次の配信を取り出すこと。
    async fn subscribe(&self, channel_name: &str) -> Result<Box<dyn MessageConsumer>>;
}

/// チャネルのコンシューマ
#[async_trait]
pub trait MessageConsumer: Send {
    /// 次の配信を待つ
    ///
    /// 購読が閉じられた場合は`None`を返す。
    async fn next_delivery(&mut self) -> Result<Option<Delivery>>;
}

/// 1件の配信
///
/// ackせずにドロップすると再配信の対象になる。
pub struct Delivery {
    payload: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self { payload, acker }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 処理完了を確認応答する
    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }
}

/// 配信の確認応答
///
/// アダプタごとの ack 機構（AMQPのdelivery tagなど）を覆う。
#[async_trait]
pub trait Acknowledger: Send {
    async fn ack(self: Box<Self>) -> Result<()>;
}
