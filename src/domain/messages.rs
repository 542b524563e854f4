#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UserId};

/// 論理チャネル名
///
/// 要求・応答キューは永続キュー、book-availability は通知トピック。
/// ブローカー上の他言語のピアと互換を保つため、名前は固定。
pub mod channels {
    pub const BORROW_REQUEST: &str = "borrow_request_queue";
    pub const BORROW_RESPONSE: &str = "borrow_response_queue";
    pub const RETURN_REQUEST: &str = "return_request_queue";
    pub const RETURN_RESPONSE: &str = "return_response_queue";
    pub const BOOK_AVAILABILITY: &str = "book-availability";
}

/// 応答ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failure,
}

/// 借用要求（利用者サービス → 蔵書サービス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub user_id: UserId,
    pub book_id: BookId,
}

/// 返却要求（利用者サービス → 蔵書サービス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub user_id: UserId,
    pub book_id: BookId,
}

/// 在庫応答（蔵書サービス → 利用者サービス）
///
/// 借用・返却どちらの応答キューでも同じ形。1要求につき必ず1応答。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub user_id: UserId,
    pub book_id: BookId,
    pub status: ResponseStatus,
    pub message: String,
}

impl InventoryResponse {
    pub fn success(user_id: UserId, book_id: BookId, message: impl Into<String>) -> Self {
        Self {
            user_id,
            book_id,
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }

    pub fn failure(user_id: UserId, book_id: BookId, message: impl Into<String>) -> Self {
        Self {
            user_id,
            book_id,
            status: ResponseStatus::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// 在庫復活通知（蔵書サービス → book-availability トピック）
///
/// 返却時の予約待ちドレインで、エントリ1件につき1通知が発行される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityNotice {
    pub user_id: UserId,
    pub book_id: BookId,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ワイヤ互換性のテスト：フィールド名とステータス文字列は
    // ブローカー上の既存ピアとの契約なので固定
    #[test]
    fn test_borrow_request_wire_format() {
        let req = BorrowRequest {
            user_id: UserId::new(3),
            book_id: BookId::new(7),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"user_id": 3, "book_id": 7}));
    }

    #[test]
    fn test_response_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&ResponseStatus::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&ResponseStatus::Failure).unwrap(),
            "\"failure\""
        );
    }

    #[test]
    fn test_inventory_response_parses_peer_payload() {
        let raw = r#"{"user_id": 3, "book_id": 7, "status": "failure", "message": "Book with ID 7 not found."}"#;
        let resp: InventoryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.user_id, UserId::new(3));
        assert!(!resp.is_success());
        assert_eq!(resp.message, "Book with ID 7 not found.");
    }

    #[test]
    fn test_availability_notice_wire_format() {
        let notice = AvailabilityNotice {
            user_id: UserId::new(2),
            book_id: BookId::new(9),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["user_id"], 2);
        assert_eq!(json["book_id"], 9);
        assert!(json["timestamp"].is_string());
    }
}
