use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, Credential},
};
use tracing::debug;
use uuid::Uuid;

use docbridge_core::{
    backend::{InsertManyResult, StoreBackend, StoreConnector},
    config::DatabaseConfig,
    document::{KEY_FIELD, document_key},
    error::{AdapterError, AdapterResult},
    filter::Filter,
};

const ID_FIELD: &str = "_id";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Mirrors `_key` into `_id`, generating a key when the document has none.
    fn prepare_document(&self, mut document: Document) -> AdapterResult<(String, Document)> {
        let key = if document.contains_key(KEY_FIELD) {
            document_key(&document)?
        } else {
            let key = Uuid::new_v4().simple().to_string();
            document.insert(KEY_FIELD, key.as_str());
            key
        };

        document.insert(ID_FIELD, key.as_str());

        Ok((key, document))
    }

    fn restore_document(&self, mut document: Document) -> Document {
        document.remove(ID_FIELD);
        document
    }
}

fn backend_error(error: MongoError) -> AdapterError {
    AdapterError::Backend(error.to_string())
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn open_collection(&self, _collection: &str) -> AdapterResult<()> {
        // MongoDB creates collections on first write.
        Ok(())
    }

    async fn has_document(&self, key: &str, collection: &str) -> AdapterResult<bool> {
        let count = self
            .get_collection(collection)
            .count_documents(doc! { ID_FIELD: key })
            .await
            .map_err(backend_error)?;

        Ok(count > 0)
    }

    async fn find_documents(
        &self,
        filter: &Filter,
        collection: &str,
    ) -> AdapterResult<Vec<Document>> {
        Ok(self
            .get_collection(collection)
            .find(filter.predicates().clone())
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(|document| self.restore_document(document))
            .collect())
    }

    async fn insert_document(&self, document: Document, collection: &str) -> AdapterResult<()> {
        let (key, document) = self.prepare_document(document)?;

        self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AdapterError::DocumentAlreadyExists(key.clone(), collection.to_string())
                } else {
                    backend_error(e)
                }
            })?;

        Ok(())
    }

    async fn update_document(&self, document: Document, collection: &str) -> AdapterResult<()> {
        let key = document_key(&document)?;

        let result = self
            .get_collection(collection)
            .update_one(doc! { ID_FIELD: key.as_str() }, doc! { "$set": document })
            .await
            .map_err(backend_error)?;

        if result.matched_count == 0 {
            return Err(AdapterError::DocumentNotFound(key, collection.to_string()));
        }

        Ok(())
    }

    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> AdapterResult<InsertManyResult> {
        if documents.is_empty() {
            return Ok(InsertManyResult::default());
        }

        let (keys, documents): (Vec<String>, Vec<Document>) = documents
            .into_iter()
            .map(|document| self.prepare_document(document))
            .collect::<AdapterResult<Vec<_>>>()?
            .into_iter()
            .unzip();

        self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(backend_error)?;

        debug!(collection, inserted = keys.len(), "bulk insert applied");

        Ok(InsertManyResult { keys })
    }

    async fn all_documents(&self, collection: &str) -> AdapterResult<Vec<Document>> {
        self.find_documents(&Filter::new(), collection).await
    }

    async fn delete_documents(&self, keys: Vec<String>, collection: &str) -> AdapterResult<()> {
        let keys: Vec<Bson> = keys.into_iter().map(Bson::String).collect();

        self.get_collection(collection)
            .delete_many(doc! { ID_FIELD: { "$in": keys } })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn count_documents(&self, collection: &str) -> AdapterResult<u64> {
        self.get_collection(collection)
            .count_documents(doc! {})
            .await
            .map_err(backend_error)
    }

    async fn create_collection(&self, name: &str) -> AdapterResult<()> {
        self.client
            .database(&self.database)
            .create_collection(name)
            .await
            .map_err(backend_error)
    }

    async fn drop_collection(&self, name: &str) -> AdapterResult<()> {
        self.get_collection(name).drop().await.map_err(backend_error)
    }

    async fn list_collections(&self) -> AdapterResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)
    }

    async fn close(&self) -> AdapterResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Connector building a [`MongoDbStore`] from a [`DatabaseConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDbConnector;

impl MongoDbConnector {
    /// Builds client options from the connection parameters.
    pub async fn client_options(config: &DatabaseConfig) -> AdapterResult<ClientOptions> {
        let mut options = ClientOptions::parse(format!("mongodb://{}:{}", config.host, config.port))
            .await
            .map_err(|e| AdapterError::Initialization(e.to_string()))?;

        if !config.username.is_empty() {
            let mut credential = Credential::default();
            credential.username = Some(config.username.clone());
            credential.password = config.password.clone();
            options.credential = Some(credential);
        }

        options.app_name = Some("docbridge".to_string());

        Ok(options)
    }
}

#[async_trait]
impl StoreConnector for MongoDbConnector {
    async fn connect(&self, config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
        let client = Client::with_options(Self::client_options(config).await?)
            .map_err(|e| AdapterError::Initialization(e.to_string()))?;

        Ok(Arc::new(MongoDbStore::new(client, config.name.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn credentials_come_from_the_config() {
        let mut config = DatabaseConfig::memory("inventory");
        config.username = "app".to_string();
        config.password = Some("secret".to_string());
        config.host = "db.internal".to_string();
        config.port = 27018;

        let options = MongoDbConnector::client_options(&config).await.unwrap();
        let credential = options.credential.unwrap();

        assert_eq!(credential.username.as_deref(), Some("app"));
        assert_eq!(credential.password.as_deref(), Some("secret"));
        assert_eq!(options.hosts.len(), 1);
        assert_eq!(options.hosts[0].to_string(), "db.internal:27018");
    }
}
