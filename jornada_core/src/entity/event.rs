use super::types::Tags;
use crate::ids::{EventId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `HH:MM`
    pub event_time: String,
    /// `None` means unlimited.
    pub max_attendees: Option<i32>,
    pub tags: Tags,
    pub created_by: Option<UserId>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_content::Entity")]
    EventContent,
    #[sea_orm(has_many = "super::event_registration::Entity")]
    EventRegistration,
    #[sea_orm(has_many = "super::event_progression::Entity")]
    EventProgression,
}

impl Related<super::event_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventContent.def()
    }
}

impl Related<super::event_registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventRegistration.def()
    }
}

impl Related<super::event_progression::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventProgression.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
