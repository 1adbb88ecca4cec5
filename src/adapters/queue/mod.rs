//! Inbound queue messages

pub mod message;

pub use message::{parse_body, MessageAttribute, QueueBody, QueueEvent, QueueRecord};
