use bson::doc;
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use crate::dbs::mongo::models::MongoPrompt;
use crate::error::{PersistError, Result};
use crate::models::Prompt;

#[derive(Clone)]
pub struct MongoPromptRepository {
    collection: Collection<MongoPrompt>,
}

impl MongoPromptRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("prompts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_name = IndexModel::builder()
            .keys(doc! { "user_id": 1, "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(unique_name).await?;
        Ok(())
    }

    async fn find(&self, user_id: &str, name: &str) -> Result<Option<MongoPrompt>> {
        Ok(self
            .collection
            .find_one(doc! { "user_id": user_id, "name": name })
            .await?)
    }

    pub async fn add(&self, user_id: &str, name: &str, prompt: &str) -> Result<Prompt> {
        if self.find(user_id, name).await?.is_some() {
            return Err(PersistError::Conflict(format!("prompt '{}'", name)));
        }

        let active_count = self
            .collection
            .count_documents(doc! { "user_id": user_id, "is_active": true })
            .await?;

        let mut record = Prompt::new(user_id, name, prompt);
        record.is_active = active_count == 0;

        self.collection
            .insert_one(MongoPrompt::from(record.clone()))
            .await?;
        Ok(record)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Prompt>> {
        let prompts: Vec<MongoPrompt> = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(prompts.into_iter().map(Prompt::from).collect())
    }

    pub async fn edit(
        &self,
        user_id: &str,
        old_name: &str,
        new_name: Option<&str>,
        new_prompt: Option<&str>,
    ) -> Result<Prompt> {
        let mut existing = self
            .find(user_id, old_name)
            .await?
            .ok_or_else(|| PersistError::NotFound(format!("prompt '{}'", old_name)))?;

        if let Some(new_name) = new_name {
            if new_name != old_name && self.find(user_id, new_name).await?.is_some() {
                return Err(PersistError::Conflict(format!("prompt '{}'", new_name)));
            }
            existing.name = new_name.to_string();
        }
        if let Some(new_prompt) = new_prompt {
            existing.prompt = new_prompt.to_string();
        }
        existing.updated_at = chrono::Utc::now();

        self.collection
            .update_one(
                doc! { "_id": &existing.id },
                doc! { "$set": {
                    "name": &existing.name,
                    "prompt": &existing.prompt,
                    "updated_at": bson::DateTime::from_chrono(existing.updated_at),
                } },
            )
            .await?;
        Ok(existing.into())
    }

    pub async fn delete(&self, user_id: &str, name: &str) -> Result<()> {
        let result = self
            .collection
            .delete_one(doc! { "user_id": user_id, "name": name })
            .await?;
        if result.deleted_count == 0 {
            return Err(PersistError::NotFound(format!("prompt '{}'", name)));
        }
        Ok(())
    }

    pub async fn set_active(&self, user_id: &str, name: &str) -> Result<Prompt> {
        if self.find(user_id, name).await?.is_none() {
            return Err(PersistError::NotFound(format!("prompt '{}'", name)));
        }

        let now = bson::DateTime::now();
        self.collection
            .update_many(
                doc! { "user_id": user_id, "name": { "$ne": name }, "is_active": true },
                doc! { "$set": { "is_active": false, "updated_at": now } },
            )
            .await?;
        self.collection
            .update_one(
                doc! { "user_id": user_id, "name": name },
                doc! { "$set": { "is_active": true, "updated_at": now } },
            )
            .await?;

        self.find(user_id, name)
            .await?
            .map(Prompt::from)
            .ok_or_else(|| PersistError::NotFound(format!("prompt '{}'", name)))
    }

    pub async fn active(&self, user_id: &str) -> Result<Option<Prompt>> {
        Ok(self
            .collection
            .find_one(doc! { "user_id": user_id, "is_active": true })
            .await?
            .map(Prompt::from))
    }
}
