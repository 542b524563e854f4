use crate::ports::message_channel::{
    Acknowledger, ChannelError, Delivery, MessageChannel as MessageChannelTrait, MessageConsumer,
    Result,
};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
};

/// AMQP delivery mode 2 marks a message persistent.
const PERSISTENT: u8 = 2;

const CONSUMER_TAG: &str = "circulation-consumer";

async fn declare_queue(channel: &Channel, name: &str) -> Result<()> {
    channel
        .queue_declare(
            name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| ChannelError::Publish(format!("Failed to declare queue {}: {}", name, e)))?;
    Ok(())
}

/// RabbitMQ実装のメッセージチャネル
///
/// デフォルトエクスチェンジに対しチャネル名をルーティングキーとして
/// 発行する。キューはdurable、メッセージは永続（delivery mode 2）。
pub struct MessageChannel {
    /// チャネルの寿命を握るため保持する
    #[allow(dead_code)]
    connection: Connection,
    publish_channel: Channel,
}

impl MessageChannel {
    pub async fn connect(url: &str) -> Result<Self> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to connect: {}", e)))?;

        let publish_channel = connection
            .create_channel()
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to create channel: {}", e)))?;

        tracing::info!(url = %url, "Connected to AMQP broker");

        Ok(Self {
            connection,
            publish_channel,
        })
    }
}

#[async_trait]
impl MessageChannelTrait for MessageChannel {
    async fn publish(&self, channel_name: &str, payload: &[u8]) -> Result<()> {
        declare_queue(&self.publish_channel, channel_name).await?;

        let confirm = self
            .publish_channel
            .basic_publish(
                "",
                channel_name,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await
            .map_err(|e| ChannelError::Publish(format!("Failed to publish: {}", e)))?;

        confirm
            .await
            .map_err(|e| ChannelError::Publish(format!("Publish confirmation failed: {}", e)))?;

        tracing::debug!(queue = %channel_name, bytes = payload.len(), "Published message");
        Ok(())
    }

    async fn subscribe(&self, channel_name: &str) -> Result<Box<dyn MessageConsumer>> {
        // 購読ごとに専用チャネルを張る
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| ChannelError::Subscribe(format!("Failed to create channel: {}", e)))?;

        declare_queue(&channel, channel_name)
            .await
            .map_err(|e| ChannelError::Subscribe(e.to_string()))?;

        let consumer = channel
            .basic_consume(
                channel_name,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                ChannelError::Subscribe(format!(
                    "Failed to start consumer on {}: {}",
                    channel_name, e
                ))
            })?;

        tracing::info!(queue = %channel_name, "Consuming from AMQP queue");

        Ok(Box::new(Consumer {
            inner: consumer,
            _channel: channel,
        }))
    }
}

struct Consumer {
    inner: lapin::Consumer,
    /// コンシューマの寿命を握るため保持する
    _channel: Channel,
}

#[async_trait]
impl MessageConsumer for Consumer {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        match self.inner.next().await {
            Some(Ok(delivery)) => {
                let lapin::message::Delivery { data, acker, .. } = delivery;
                Ok(Some(Delivery::new(data, Box::new(QueueAcker { acker }))))
            }
            Some(Err(e)) => Err(ChannelError::Subscribe(format!(
                "Consumer stream failed: {}",
                e
            ))),
            None => Ok(None),
        }
    }
}

struct QueueAcker {
    acker: lapin::acker::Acker,
}

#[async_trait]
impl Acknowledger for QueueAcker {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| ChannelError::Ack(format!("Failed to ack delivery: {}", e)))
    }
}
