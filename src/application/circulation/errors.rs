use thiserror::Error;

/// 貸出・返却オーケストレーションのエラー
///
/// API層がHTTPステータスへの写像を持つ。文言は在庫側の応答
/// メッセージをそのまま運ぶ。
#[derive(Debug, Error)]
pub enum CirculationError {
    /// 入力が不足・不正
    #[error("{0}")]
    InvalidRequest(String),

    /// 対象の書籍が存在しない
    #[error("{0}")]
    NotFound(String),

    /// 在庫切れ（待ちリストへ登録済み）
    #[error("{0}")]
    Exhausted(String),

    /// 進行中の要求、または既存の貸出との衝突
    #[error("{0}")]
    Conflict(String),

    /// 応答待ちの予算を使い切った。要求の結果は不明
    #[error("Timed out waiting for the book service response")]
    Timeout,

    /// 発行失敗や在庫側の処理異常
    #[error("{0}")]
    InternalError(String),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationError>;
