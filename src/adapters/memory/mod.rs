pub mod channel;
pub mod inventory_store;
pub mod user_store;

#[allow(unused_imports)]
pub use channel::MessageChannel;
#[allow(unused_imports)]
pub use inventory_store::InventoryStore;
#[allow(unused_imports)]
pub use user_store::UserStore;
