use crate::ids::{EventContentId, EventId, ProgressionId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_progression")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ProgressionId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub content_id: EventContentId,
    pub progress_num: i32,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::event_content::Entity",
        from = "Column::ContentId",
        to = "super::event_content::Column::Id"
    )]
    EventContent,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::event_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventContent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
