use crate::entities::capture_records;
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};
use uuid::Uuid;

/// Fields supplied by the relay; the timestamp is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCaptureRecord {
    pub filename: String,
    pub url: String,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn append(&self, record: NewCaptureRecord) -> Result<()>;
}

pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn append(&self, record: NewCaptureRecord) -> Result<()> {
        let row = capture_records::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            filename: Set(record.filename),
            url: Set(record.url),
            ..Default::default()
        };

        capture_records::Entity::insert(row).exec(&self.db).await?;
        Ok(())
    }
}
