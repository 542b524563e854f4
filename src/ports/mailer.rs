use crate::domain::messages::AvailabilityNotice;
use async_trait::async_trait;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// メーラーポート
///
/// 在庫復活通知の利用者への配信メカニズムを抽象化する。
/// 実装はメール、SMS、プッシュ通知などが考えられる。
#[allow(dead_code)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// 在庫復活通知を利用者に送信する
    ///
    /// book-availability トピックの消費時に呼ばれる。
    async fn send_availability_notice(&self, notice: &AvailabilityNotice) -> Result<()>;
}
