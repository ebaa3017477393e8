use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000001_create_app_user_table::AppUser;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Identity::Table)
                    .col(blob(Identity::NodeId).primary_key())
                    .col(uuid(Identity::UserId))
                    .col(string(Identity::SignedInAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-identity-user_id")
                            .from(Identity::Table, Identity::UserId)
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
                    .name("idx_identity_user_id")
                    .table(Identity::Table)
                    .col(Identity::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Identity::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Identity {
    Table,
    NodeId,
    UserId,
    SignedInAt,
}
