// アプリケーション層
//
// ポートのトレイトオブジェクトを束ねた依存関係構造体と、
// それを受け取る純粋な関数でユースケースを表現する。

pub mod auth;
pub mod catalog;
pub mod circulation;
pub mod inventory;
