use crate::ports::message_channel::{
    Acknowledger, Delivery, MessageChannel as MessageChannelTrait, MessageConsumer, Result,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// In-memory implementation of MessageChannel
///
/// Backs standalone mode and tests with the same delivery contract as the
/// AMQP adapter: deliveries are handed out one at a time and a delivery
/// dropped without ack is requeued at the front, so at-least-once behavior
/// is observable in-process.
pub struct MessageChannel {
    queues: Mutex<HashMap<String, Arc<Queue>>>,
}

struct Queue {
    messages: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl Queue {
    fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn push_back(&self, payload: Vec<u8>) {
        self.messages.lock().unwrap().push_back(payload);
        self.notify.notify_one();
    }

    fn requeue_front(&self, payload: Vec<u8>) {
        self.messages.lock().unwrap().push_front(payload);
        self.notify.notify_one();
    }
}

impl MessageChannel {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    fn queue(&self, name: &str) -> Arc<Queue> {
        let mut queues = self.queues.lock().unwrap();
        queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Queue::new()))
            .clone()
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageChannelTrait for MessageChannel {
    async fn publish(&self, channel_name: &str, payload: &[u8]) -> Result<()> {
        self.queue(channel_name).push_back(payload.to_vec());
        Ok(())
    }

    async fn subscribe(&self, channel_name: &str) -> Result<Box<dyn MessageConsumer>> {
        Ok(Box::new(Consumer {
            queue: self.queue(channel_name),
        }))
    }
}

struct Consumer {
    queue: Arc<Queue>,
}

#[async_trait]
impl MessageConsumer for Consumer {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        loop {
            let popped = self.queue.messages.lock().unwrap().pop_front();
            if let Some(payload) = popped {
                let acker = QueueAcker {
                    queue: self.queue.clone(),
                    unacked: Some(payload.clone()),
                };
                return Ok(Some(Delivery::new(payload, Box::new(acker))));
            }
            self.queue.notify.notified().await;
        }
    }
}

/// Requeues the payload when dropped before ack.
struct QueueAcker {
    queue: Arc<Queue>,
    unacked: Option<Vec<u8>>,
}

#[async_trait]
impl Acknowledger for QueueAcker {
    async fn ack(mut self: Box<Self>) -> Result<()> {
        self.unacked.take();
        Ok(())
    }
}

impl Drop for QueueAcker {
    fn drop(&mut self) {
        if let Some(payload) = self.unacked.take() {
            self.queue.requeue_front(payload);
        }
    }
}
