use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

// Blobs of the private buckets. `path` is `{owner}/{filename}`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "storage_object")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bucket: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub path: String,
    pub content_type: String,
    pub size: i64,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
