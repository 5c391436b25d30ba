pub mod message;
pub mod thread;

pub use message::{Message, MessageRole};
pub use thread::Thread;
