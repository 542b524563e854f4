#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use super::{BookId, UserId, WaitingEntryId};

/// 予約待ちエントリの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitingStatus {
    Waiting,
    Notified,
}

impl WaitingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingStatus::Waiting => "waiting",
            WaitingStatus::Notified => "notified",
        }
    }
}

impl std::str::FromStr for WaitingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(WaitingStatus::Waiting),
            "notified" => Ok(WaitingStatus::Notified),
            _ => Err(format!("Invalid waiting status: {}", s)),
        }
    }
}

/// 予約待ちエントリ
///
/// 在庫切れの書籍への借用要求を記録する。
/// 状態は `waiting` で作成され、返却時のドレインで通知イベントへ
/// 変換された後に削除される。重複購読は許容される（重複排除しない）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingListEntry {
    pub id: WaitingEntryId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub status: WaitingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_waiting_status_round_trip() {
        assert_eq!(
            WaitingStatus::from_str("waiting").unwrap(),
            WaitingStatus::Waiting
        );
        assert_eq!(WaitingStatus::Notified.as_str(), "notified");
    }

    #[test]
    fn test_waiting_status_rejects_unknown() {
        assert!(WaitingStatus::from_str("pending").is_err());
    }
}
