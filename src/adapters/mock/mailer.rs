use crate::domain::messages::AvailabilityNotice;
use crate::ports::mailer::{Mailer as MailerTrait, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock implementation of Mailer
///
/// Does not send actual mail. Logs the notice and records it so tests
/// can assert on what would have been sent.
#[allow(dead_code)]
pub struct Mailer {
    sent: Mutex<Vec<AvailabilityNotice>>,
}

#[allow(dead_code)]
impl Mailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 送信済み通知のスナップショットを返す（テスト用）
    pub fn sent(&self) -> Vec<AvailabilityNotice> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for Mailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailerTrait for Mailer {
    async fn send_availability_notice(&self, notice: &AvailabilityNotice) -> Result<()> {
        tracing::info!(
            user_id = notice.user_id.value(),
            book_id = notice.book_id.value(),
            "Notification sent to user about book availability"
        );
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}
