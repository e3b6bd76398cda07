pub mod api;
pub mod message;

pub use message::{DEFAULT_CHANNEL, DEFAULT_USERNAME, Message, MessageKind};
