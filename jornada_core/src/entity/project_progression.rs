use crate::ids::{ContentId, ProgressionId, ProjectId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_progression")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ProgressionId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub progress_num: i32,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    #[sea_orm(
        belongs_to = "super::project_content::Entity",
        from = "Column::ContentId",
        to = "super::project_content::Column::Id"
    )]
    ProjectContent,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::project_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectContent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
