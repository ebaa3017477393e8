use super::types::ContentType;
use crate::ids::{EventContentId, EventId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: EventContentId,
    pub event_id: EventId,
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
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(has_many = "super::event_progression::Entity")]
    EventProgression,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::event_progression::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventProgression.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
