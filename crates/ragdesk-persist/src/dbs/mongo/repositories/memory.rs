use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoMemory;
use crate::error::Result;
use crate::models::UserMemory;

#[derive(Clone)]
pub struct MongoMemoryRepository {
    collection: Collection<MongoMemory>,
}

impl MongoMemoryRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("user_memories");
        Self { collection }
    }

    pub async fn save(&self, user_id: &str, memory_text: &str) -> Result<UserMemory> {
        let memory = UserMemory::new(user_id, memory_text);
        self.collection
            .insert_one(MongoMemory::from(memory.clone()))
            .await?;
        Ok(memory)
    }

    pub async fn load(&self, user_id: &str) -> Result<Vec<UserMemory>> {
        let memories: Vec<MongoMemory> = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(memories.into_iter().map(UserMemory::from).collect())
    }
}
