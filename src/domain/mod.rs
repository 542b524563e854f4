pub mod book;
pub mod borrowing;
pub mod messages;
pub mod user;
pub mod value_objects;
pub mod waiting_list;

pub use messages::*;
pub use value_objects::*;
