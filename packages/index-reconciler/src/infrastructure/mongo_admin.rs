//! MongoDB Index Admin
//!
//! `IndexAdmin` over the official `mongodb` driver. Works against MongoDB
//! and MongoDB-compatible servers (DocumentDB, Cosmos DB for MongoDB);
//! server errors are classified in `crate::error`.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use tracing::{info, warn};

use crate::domain::{ExistingIndex, IndexAdmin, IndexKey, IndexSpec, KeyDirection};
use crate::error::{ErrorKind, ReconcileError, Result};

/// MongoDB-backed `IndexAdmin` for one database
#[derive(Clone, Debug)]
pub struct MongoIndexAdmin {
    db: Database,
}

impl MongoIndexAdmin {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connect and verify the server answers `ping`
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;

        info!(database, "connected to MongoDB");
        Ok(Self::new(db))
    }
}

#[async_trait]
impl IndexAdmin for MongoIndexAdmin {
    async fn list_indexes(&self, collection: &str) -> Result<Vec<ExistingIndex>> {
        let coll = self.db.collection::<Document>(collection);
        let models: Vec<IndexModel> = match coll.list_indexes().await {
            Ok(cursor) => cursor.try_collect().await?,
            Err(err) => {
                let err = ReconcileError::from(err);
                if err.kind == ErrorKind::NamespaceNotFound {
                    return Ok(Vec::new());
                }
                return Err(err);
            }
        };

        let mut indexes = Vec::with_capacity(models.len());
        for model in models {
            match existing_from_model(model) {
                Ok(index) => indexes.push(index),
                Err(reason) => warn!(
                    collection,
                    error = %reason,
                    "failed to decode existing index"
                ),
            }
        }
        Ok(indexes)
    }

    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<String> {
        let coll = self.db.collection::<Document>(collection);
        let created = coll.create_index(index_model(spec)).await?;
        Ok(created.index_name)
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        let coll = self.db.collection::<Document>(collection);
        coll.drop_index(name).await?;
        Ok(())
    }
}

fn keys_document(keys: &[IndexKey]) -> Document {
    let mut document = Document::new();
    for key in keys {
        let value = match &key.direction {
            KeyDirection::Ascending => Bson::Int32(1),
            KeyDirection::Descending => Bson::Int32(-1),
            KeyDirection::Other(kind) => Bson::String(kind.clone()),
        };
        document.insert(key.field.clone(), value);
    }
    document
}

fn index_model(spec: &IndexSpec) -> IndexModel {
    IndexModel::builder()
        .keys(keys_document(&spec.keys))
        .options({
            let mut options = IndexOptions::default();
            options.name = spec.declared_name().map(str::to_string);
            // only sent when set; the server omits `unique: false`
            options.unique = spec.unique.then_some(true);
            options
        })
        .build()
}

fn direction_from_bson(value: &Bson) -> std::result::Result<KeyDirection, String> {
    let numeric = match value {
        Bson::Int32(v) => f64::from(*v),
        Bson::Int64(v) => *v as f64,
        Bson::Double(v) => *v,
        Bson::String(kind) => return Ok(KeyDirection::Other(kind.clone())),
        other => return Err(format!("unsupported key value {}", other)),
    };
    if numeric > 0.0 {
        Ok(KeyDirection::Ascending)
    } else if numeric < 0.0 {
        Ok(KeyDirection::Descending)
    } else {
        Err("key direction 0".to_string())
    }
}

fn existing_from_model(model: IndexModel) -> std::result::Result<ExistingIndex, String> {
    let options = model.options.unwrap_or_default();
    let name = options.name.ok_or_else(|| "index without a name".to_string())?;

    let mut keys = Vec::with_capacity(model.keys.len());
    for (field, value) in &model.keys {
        keys.push(IndexKey::new(field.clone(), direction_from_bson(value)?));
    }

    Ok(ExistingIndex::new(name, keys, options.unique.unwrap_or(false)))
}
