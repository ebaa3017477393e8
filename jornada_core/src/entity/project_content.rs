use super::types::ContentType;
use crate::ids::{ContentId, ProjectId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One curriculum step. Steps are ordered by `created_at`, then `id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ContentId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub content_url: Option<String>,
    pub author_id: Option<UserId>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(has_many = "super::project_progression::Entity")]
    ProjectProgression,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::project_progression::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectProgression.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
