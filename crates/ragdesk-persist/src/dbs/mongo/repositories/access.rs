use bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoKbAccess;
use crate::error::{PersistError, Result};
use crate::models::KbAccess;

#[derive(Clone)]
pub struct MongoAccessRepository {
    collection: Collection<MongoKbAccess>,
}

impl MongoAccessRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("kb_access");
        Self { collection }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<KbAccess>> {
        Ok(self
            .collection
            .find_one(doc! { "_id": user_id })
            .await?
            .map(KbAccess::from))
    }

    pub async fn set(&self, user_id: &str, has_access: bool) -> Result<KbAccess> {
        let now = bson::DateTime::now();
        self.collection
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! {
                    "$set": { "has_access_to_default_kb": has_access, "updated_at": now },
                    "$setOnInsert": { "created_at": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .map(KbAccess::from)
            .ok_or_else(|| PersistError::Internal("kb_access upsert returned nothing".to_string()))
    }
}
