pub mod channel;

pub use channel::MessageChannel as AmqpMessageChannel;
