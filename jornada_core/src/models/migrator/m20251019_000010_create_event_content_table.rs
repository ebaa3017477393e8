use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000009_create_event_table::Event;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventContent::Table)
                    .col(pk_uuid(EventContent::Id))
                    .col(uuid(EventContent::EventId))
                    .col(string(EventContent::Title))
                    .col(text_null(EventContent::Description))
                    .col(string(EventContent::ContentType))
                    .col(string_null(EventContent::ContentUrl))
                    .col(uuid_null(EventContent::AuthorId))
                    .col(string(EventContent::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event-content-event_id")
                            .from(EventContent::Table, EventContent::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_contents_event_id_created_at")
                    .table(EventContent::Table)
                    .col(EventContent::EventId)
                    .col(EventContent::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventContent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum EventContent {
    Table,
    Id,
    EventId,
    Title,
    Description,
    ContentType,
    ContentUrl,
    AuthorId,
    CreatedAt,
}
