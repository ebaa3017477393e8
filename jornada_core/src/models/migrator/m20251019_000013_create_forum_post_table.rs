use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumPost::Table)
                    .col(pk_uuid(ForumPost::Id))
                    .col(uuid_null(ForumPost::AuthorId))
                    .col(string(ForumPost::Title))
                    .col(text(ForumPost::Content))
                    .col(string_null(ForumPost::Category))
                    .col(boolean(ForumPost::Solved).default(false))
                    .col(string(ForumPost::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_posts_created_at")
                    .table(ForumPost::Table)
                    .col(ForumPost::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumPost::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumPost {
    Table,
    Id,
    AuthorId,
    Title,
    Content,
    Category,
    Solved,
    CreatedAt,
}
