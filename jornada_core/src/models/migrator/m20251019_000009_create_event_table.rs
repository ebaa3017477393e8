use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .col(pk_uuid(Event::Id))
                    .col(string(Event::Title))
                    .col(text_null(Event::Description))
                    .col(string(Event::EventDate))
                    .col(string(Event::EventTime))
                    .col(integer_null(Event::MaxAttendees))
                    .col(json(Event::Tags))
                    .col(uuid_null(Event::CreatedBy))
                    .col(string(Event::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_events_event_date")
                    .table(Event::Table)
                    .col(Event::EventDate)
                    .col(Event::EventTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Event {
    Table,
    Id,
    Title,
    Description,
    EventDate,
    EventTime,
    MaxAttendees,
    Tags,
    CreatedBy,
    CreatedAt,
}
