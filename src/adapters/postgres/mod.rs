pub mod inventory_store;
pub mod user_store;

// パブリックに型を再エクスポート
pub use inventory_store::InventoryStore as PostgresInventoryStore;
pub use user_store::UserStore as PostgresUserStore;
