use crate::ids::{ForumPostId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ForumPostId,
    pub author_id: Option<UserId>,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub solved: bool,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::forum_comment::Entity")]
    ForumComment,
}

impl Related<super::forum_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ForumComment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
