use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000001_create_app_user_table::AppUser;
use super::m20251019_000009_create_event_table::Event;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventRegistration::Table)
                    .col(pk_uuid(EventRegistration::Id))
                    .col(uuid(EventRegistration::EventId))
                    .col(uuid(EventRegistration::UserId))
                    .col(string(EventRegistration::RegisteredAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event-registration-event_id")
                            .from(EventRegistration::Table, EventRegistration::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event-registration-user_id")
                            .from(EventRegistration::Table, EventRegistration::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One registration per user per event
        manager
            .create_index(
                Index::create()
                    .name("idx_event_registrations_event_id_user_id")
                    .table(EventRegistration::Table)
                    .col(EventRegistration::EventId)
                    .col(EventRegistration::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_registrations_user_id")
                    .table(EventRegistration::Table)
                    .col(EventRegistration::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventRegistration::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum EventRegistration {
    Table,
    Id,
    EventId,
    UserId,
    RegisteredAt,
}
