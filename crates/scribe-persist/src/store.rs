use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::Result;
use crate::models::{MessageRole, Thread};

/// Persistence boundary the chat relay calls.
///
/// All writes are append-only and ordered by the single request that
/// produced them; implementations only need per-operation atomicity.
/// Callers treat every operation as fire-and-forget with respect to the
/// HTTP response: failures are logged, never surfaced.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a thread for a user, titled from the first message.
    async fn create_thread(&self, user_id: &str, title: &str) -> Result<ObjectId>;

    /// Look up a thread (also used for the ownership check and the health
    /// probe).
    async fn find_thread(&self, thread_id: ObjectId) -> Result<Option<Thread>>;

    /// Append an immutable message to a thread.
    async fn append_message(
        &self,
        thread_id: ObjectId,
        role: MessageRole,
        content: &str,
    ) -> Result<ObjectId>;

    /// Bump the thread's last-activity timestamp.
    async fn touch_thread(&self, thread_id: ObjectId) -> Result<()>;
}
