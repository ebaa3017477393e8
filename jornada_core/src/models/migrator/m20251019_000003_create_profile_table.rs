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
                    .table(Profile::Table)
                    .col(pk_uuid(Profile::Id))
                    .col(string_uniq(Profile::Username))
                    .col(string(Profile::CreatedAt))
                    .col(string(Profile::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-profile-id")
                            .from(Profile::Table, Profile::Id)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Profile {
    Table,
    Id,
    Username,
    CreatedAt,
    UpdatedAt,
}
