use super::types::Tags;
use crate::ids::{ProjectId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Tags,
    pub author_id: Option<UserId>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project_content::Entity")]
    ProjectContent,
    #[sea_orm(has_many = "super::project_member::Entity")]
    ProjectMember,
    #[sea_orm(has_many = "super::project_progression::Entity")]
    ProjectProgression,
}

impl Related<super::project_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectContent.def()
    }
}

impl Related<super::project_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectMember.def()
    }
}

impl Related<super::project_progression::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectProgression.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
