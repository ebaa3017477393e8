use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000001_create_app_user_table::AppUser;
use super::m20251019_000005_create_project_table::Project;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectMember::Table)
                    .col(pk_uuid(ProjectMember::Id))
                    .col(uuid(ProjectMember::ProjectId))
                    .col(uuid(ProjectMember::UserId))
                    .col(string(ProjectMember::Role))
                    .col(string(ProjectMember::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project-member-project_id")
                            .from(ProjectMember::Table, ProjectMember::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-project-member-user_id")
                            .from(ProjectMember::Table, ProjectMember::UserId)
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
                    .name("idx_project_members_project_id_user_id")
                    .table(ProjectMember::Table)
                    .col(ProjectMember::ProjectId)
                    .col(ProjectMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_members_user_id")
                    .table(ProjectMember::Table)
                    .col(ProjectMember::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectMember::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProjectMember {
    Table,
    Id,
    ProjectId,
    UserId,
    Role,
    CreatedAt,
}
