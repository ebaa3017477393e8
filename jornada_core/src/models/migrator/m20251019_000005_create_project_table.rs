use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .col(pk_uuid(Project::Id))
                    .col(string(Project::Title))
                    .col(text_null(Project::Description))
                    .col(string_null(Project::ImageUrl))
                    .col(json(Project::Tags))
                    .col(uuid_null(Project::AuthorId))
                    .col(string(Project::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_created_at")
                    .table(Project::Table)
                    .col(Project::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Project::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Project {
    Table,
    Id,
    Title,
    Description,
    ImageUrl,
    Tags,
    AuthorId,
    CreatedAt,
}
