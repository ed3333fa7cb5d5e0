pub mod dispatcher;
pub mod error;
pub mod message;
pub mod message_queue;
pub mod named;
pub mod payload;
