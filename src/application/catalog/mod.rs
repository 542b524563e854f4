// 蔵書カタログ - 書籍の登録・検索・貸出状況の読み取り

mod errors;
mod service;

#[allow(unused_imports)]
pub use errors::{CatalogError, Result};
#[allow(unused_imports)]
pub use service::{
    CatalogDependencies, add_book, all_books, borrowed_books, search_by_author, search_by_title,
};
