//! Store Client (§2 row 7, §6): the only module that speaks to MongoDB
//! directly. Shared by the Plan Builder (eager subquery evaluation) and the
//! Plan Executor, per connection.

use bson::Document;
use futures::stream::TryStreamExt;
use mongodb::options::{CreateCollectionOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use tracing::{debug, instrument};

use crate::error::MdbError;

#[derive(Clone)]
pub struct StoreClient {
    db: Database,
}

impl StoreClient {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, MdbError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(StoreClient {
            db: client.database(database),
        })
    }

    #[instrument(skip(self, filter, projection, sort))]
    pub async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
        sort: Option<Document>,
        skip: Option<u64>,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, MdbError> {
        let mut opts = mongodb::options::FindOptions::default();
        opts.projection = projection;
        opts.sort = sort;
        opts.skip = skip;
        opts.limit = limit;
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(filter)
            .with_options(opts)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!(collection, returned = docs.len(), "find completed");
        Ok(docs)
    }

    #[instrument(skip(self, pipeline))]
    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, MdbError> {
        let cursor = self
            .db
            .collection::<Document>(collection)
            .aggregate(pipeline)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!(collection, returned = docs.len(), "aggregate completed");
        Ok(docs)
    }

    pub async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64, MdbError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self
            .db
            .collection::<Document>(collection)
            .insert_many(documents)
            .await?;
        Ok(result.inserted_ids.len() as u64)
    }

    pub async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        set_doc: Document,
    ) -> Result<u64, MdbError> {
        let update = bson::doc! { "$set": set_doc };
        let result = self
            .db
            .collection::<Document>(collection)
            .update_many(filter, update)
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, MdbError> {
        let result = self
            .db
            .collection::<Document>(collection)
            .delete_many(filter)
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn create_collection(
        &self,
        name: &str,
        if_not_exists: bool,
    ) -> Result<(), MdbError> {
        match self
            .db
            .create_collection(name)
            .with_options(CreateCollectionOptions::default())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if if_not_exists && is_namespace_exists(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn drop_collection(&self, name: &str) -> Result<(), MdbError> {
        self.db.collection::<Document>(name).drop().await?;
        Ok(())
    }

    pub async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        name: &str,
    ) -> Result<(), MdbError> {
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().name(name.to_string()).build())
            .build();
        self.db
            .collection::<Document>(collection)
            .create_index(model)
            .await?;
        Ok(())
    }

    pub async fn drop_index(&self, collection: &str, name: &str) -> Result<(), MdbError> {
        self.db
            .collection::<Document>(collection)
            .drop_index(name)
            .await?;
        Ok(())
    }

    pub async fn list_collection_names(&self) -> Result<Vec<String>, MdbError> {
        Ok(self.db.list_collection_names().await?)
    }
}

fn is_namespace_exists(err: &mongodb::error::Error) -> bool {
    err.to_string().contains("NamespaceExists")
}
