use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Client, Collection};

use crate::error::{PersistError, Result};
use crate::models::{Message, MessageRole, Thread};
use crate::store::ConversationStore;

/// MongoDB-backed [`ConversationStore`].
#[derive(Clone)]
pub struct MongoStore {
    threads: Collection<Thread>,
    messages: Collection<Message>,
}

impl MongoStore {
    pub async fn connect(mongodb_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        Ok(Self::new(&client, db_name))
    }

    pub fn new(client: &Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self {
            threads: db.collection("threads"),
            messages: db.collection("messages"),
        }
    }
}

#[async_trait]
impl ConversationStore for MongoStore {
    async fn create_thread(&self, user_id: &str, title: &str) -> Result<ObjectId> {
        let now = Utc::now();
        let thread = Thread {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.threads.insert_one(&thread).await?;
        Ok(thread.id)
    }

    async fn find_thread(&self, thread_id: ObjectId) -> Result<Option<Thread>> {
        let filter = doc! { "_id": thread_id };
        Ok(self.threads.find_one(filter).await?)
    }

    async fn append_message(
        &self,
        thread_id: ObjectId,
        role: MessageRole,
        content: &str,
    ) -> Result<ObjectId> {
        let message = Message {
            id: ObjectId::new(),
            thread_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        self.messages.insert_one(&message).await?;
        Ok(message.id)
    }

    async fn touch_thread(&self, thread_id: ObjectId) -> Result<()> {
        let filter = doc! { "_id": thread_id };
        let update = doc! {
            "$set": { "updated_at": bson::to_bson(&Utc::now())? }
        };

        self.threads.update_one(filter, update).await?;
        Ok(())
    }
}
