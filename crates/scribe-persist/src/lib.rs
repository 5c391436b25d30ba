pub mod error;
pub mod models;
pub mod mongo;
pub mod store;

pub use error::PersistError;
pub use models::{Message, MessageRole, Thread};
pub use mongo::MongoStore;
pub use store::ConversationStore;
