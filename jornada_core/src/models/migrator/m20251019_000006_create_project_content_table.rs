use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000005_create_project_table::Project;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectContent::Table)
                    .col(pk_uuid(ProjectContent::Id))
                    .col(uuid(ProjectContent::ProjectId))
                    .col(string(ProjectContent::Title))
                    .col(text_null(ProjectContent::Description))
                    .col(string(ProjectContent::ContentType))
                    .col(string_null(ProjectContent::ContentUrl))
                    .col(uuid_null(ProjectContent::AuthorId))
                    .col(string(ProjectContent::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project-content-project_id")
                            .from(ProjectContent::Table, ProjectContent::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Curriculum order lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_project_contents_project_id_created_at")
                    .table(ProjectContent::Table)
                    .col(ProjectContent::ProjectId)
                    .col(ProjectContent::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectContent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProjectContent {
    Table,
    Id,
    ProjectId,
    Title,
    Description,
    ContentType,
    ContentUrl,
    AuthorId,
    CreatedAt,
}
