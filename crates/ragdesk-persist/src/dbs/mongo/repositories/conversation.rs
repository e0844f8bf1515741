use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::{MongoConversation, MongoMessage};
use crate::error::{PersistError, Result};
use crate::models::{Conversation, StoredMessage};

#[derive(Clone)]
pub struct MongoConversationRepository {
    conversations: Collection<MongoConversation>,
    messages: Collection<MongoMessage>,
}

impl MongoConversationRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self {
            conversations: db.collection("conversations"),
            messages: db.collection("messages"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        self.conversations
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "updated_at": -1 })
                    .build(),
            )
            .await?;
        self.messages
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "conversation_id": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    pub async fn create(&self, user_id: &str, title: Option<&str>) -> Result<Conversation> {
        let conversation = Conversation::new(user_id, title);
        self.conversations
            .insert_one(MongoConversation::from(conversation.clone()))
            .await?;
        Ok(conversation)
    }

    pub async fn get(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(self
            .conversations
            .find_one(doc! { "_id": conversation_id })
            .await?
            .map(Conversation::from))
    }

    pub async fn list(
        &self,
        user_id: &str,
        limit: Option<i64>,
        skip: Option<u64>,
    ) -> Result<Vec<Conversation>> {
        let mut find = self
            .conversations
            .find(doc! { "user_id": user_id })
            .sort(doc! { "updated_at": -1 });

        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        if let Some(skip) = skip {
            find = find.skip(skip);
        }

        let conversations: Vec<MongoConversation> = find.await?.try_collect().await?;
        Ok(conversations.into_iter().map(Conversation::from).collect())
    }

    pub async fn delete(&self, conversation_id: &str, user_id: &str) -> Result<bool> {
        let result = self
            .conversations
            .delete_one(doc! { "_id": conversation_id, "user_id": user_id })
            .await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        self.messages
            .delete_many(doc! { "conversation_id": conversation_id })
            .await?;
        Ok(true)
    }

    pub async fn touch(&self, conversation_id: &str) -> Result<()> {
        let result = self
            .conversations
            .update_one(
                doc! { "_id": conversation_id },
                doc! { "$set": { "updated_at": bson::DateTime::now() } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(PersistError::NotFound(format!(
                "conversation '{}'",
                conversation_id
            )));
        }
        Ok(())
    }

    pub async fn save_message(&self, message: StoredMessage) -> Result<()> {
        self.messages.insert_one(MongoMessage::from(message)).await?;
        Ok(())
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let messages: Vec<MongoMessage> = self
            .messages
            .find(doc! { "conversation_id": conversation_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages.into_iter().map(StoredMessage::from).collect())
    }
}
