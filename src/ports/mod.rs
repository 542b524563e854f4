#[allow(unused_imports)]
pub mod inventory_store;
#[allow(unused_imports)]
pub mod mailer;
#[allow(unused_imports)]
pub mod message_channel;
#[allow(unused_imports)]
pub mod token_service;
#[allow(unused_imports)]
pub mod user_store;

#[allow(unused_imports)]
pub use inventory_store::*;
#[allow(unused_imports)]
pub use mailer::*;
#[allow(unused_imports)]
pub use message_channel::*;
#[allow(unused_imports)]
pub use token_service::*;
#[allow(unused_imports)]
pub use user_store::*;
