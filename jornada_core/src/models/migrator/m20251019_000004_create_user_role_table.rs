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
                    .table(UserRole::Table)
                    .col(pk_uuid(UserRole::Id))
                    .col(uuid(UserRole::UserId))
                    .col(string(UserRole::Role))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user-role-user_id")
                            .from(UserRole::Table, UserRole::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A user holds each role at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_user_roles_user_id_role")
                    .table(UserRole::Table)
                    .col(UserRole::UserId)
                    .col(UserRole::Role)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRole::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum UserRole {
    Table,
    Id,
    UserId,
    Role,
}
