use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000001_create_app_user_table::AppUser;
use super::m20251019_000005_create_project_table::Project;
use super::m20251019_000006_create_project_content_table::ProjectContent;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectProgression::Table)
                    .col(pk_uuid(ProjectProgression::Id))
                    .col(uuid(ProjectProgression::ProjectId))
                    .col(uuid(ProjectProgression::UserId))
                    .col(uuid(ProjectProgression::ContentId))
                    .col(integer(ProjectProgression::ProgressNum))
                    .col(string(ProjectProgression::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project-progression-project_id")
                            .from(ProjectProgression::Table, ProjectProgression::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project-progression-content_id")
                            .from(ProjectProgression::Table, ProjectProgression::ContentId)
                            .to(ProjectContent::Table, ProjectContent::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project-progression-user_id")
                            .from(ProjectProgression::Table, ProjectProgression::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert target: one row per (project, user, content)
        manager
            .create_index(
                Index::create()
                    .name("idx_project_progressions_key")
                    .table(ProjectProgression::Table)
                    .col(ProjectProgression::ProjectId)
                    .col(ProjectProgression::UserId)
                    .col(ProjectProgression::ContentId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectProgression::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProjectProgression {
    Table,
    Id,
    ProjectId,
    UserId,
    ContentId,
    ProgressNum,
    UpdatedAt,
}
