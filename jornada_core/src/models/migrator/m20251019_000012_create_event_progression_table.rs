use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000001_create_app_user_table::AppUser;
use super::m20251019_000009_create_event_table::Event;
use super::m20251019_000010_create_event_content_table::EventContent;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventProgression::Table)
                    .col(pk_uuid(EventProgression::Id))
                    .col(uuid(EventProgression::EventId))
                    .col(uuid(EventProgression::UserId))
                    .col(uuid(EventProgression::ContentId))
                    .col(integer(EventProgression::ProgressNum))
                    .col(string(EventProgression::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event-progression-event_id")
                            .from(EventProgression::Table, EventProgression::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event-progression-content_id")
                            .from(EventProgression::Table, EventProgression::ContentId)
                            .to(EventContent::Table, EventContent::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event-progression-user_id")
                            .from(EventProgression::Table, EventProgression::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_progressions_key")
                    .table(EventProgression::Table)
                    .col(EventProgression::EventId)
                    .col(EventProgression::UserId)
                    .col(EventProgression::ContentId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventProgression::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum EventProgression {
    Table,
    Id,
    EventId,
    UserId,
    ContentId,
    ProgressNum,
    UpdatedAt,
}
