// 認証サービス - 登録・ログイン・プロフィール補完

mod errors;
mod service;

#[allow(unused_imports)]
pub use errors::{AuthError, Result};
#[allow(unused_imports)]
pub use service::{AuthDependencies, ensure_profile, login, register_user};
