pub mod amqp;
pub mod jwt;
pub mod memory;
pub mod mock;
pub mod postgres;
