use crate::ports::inventory_store::InventoryStoreError;
use thiserror::Error;

/// 蔵書カタログ操作のエラー
///
/// `MissingFields` と `DuplicateIsbn` のDisplay文言は
/// そのままAPIレスポンスに載るため固定。
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 必須項目が欠けている
    #[error("Title, author and ISBN are required")]
    MissingFields,

    /// ISBNが列幅を超える
    #[error("ISBN must be 13 characters or fewer")]
    IsbnTooLong,

    /// ISBNが既に登録済み
    #[error("Book with this ISBN already exists")]
    DuplicateIsbn,

    /// ストア障害
    #[error("catalog backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<InventoryStoreError> for CatalogError {
    fn from(e: InventoryStoreError) -> Self {
        match e {
            InventoryStoreError::DuplicateIsbn => CatalogError::DuplicateIsbn,
            InventoryStoreError::Backend(e) => CatalogError::Backend(e),
            // 貸出系の違反はカタログ操作では起き得ない
            other => CatalogError::Backend(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
