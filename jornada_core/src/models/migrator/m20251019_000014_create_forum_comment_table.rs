use sea_orm_migration::{prelude::*, schema::*};

use super::m20251019_000013_create_forum_post_table::ForumPost;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumComment::Table)
                    .col(pk_uuid(ForumComment::Id))
                    .col(uuid(ForumComment::PostId))
                    .col(uuid(ForumComment::AuthorId))
                    .col(text(ForumComment::Content))
                    .col(string(ForumComment::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-forum-comment-post_id")
                            .from(ForumComment::Table, ForumComment::PostId)
                            .to(ForumPost::Table, ForumPost::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_comments_post_id")
                    .table(ForumComment::Table)
                    .col(ForumComment::PostId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumComment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ForumComment {
    Table,
    Id,
    PostId,
    AuthorId,
    Content,
    CreatedAt,
}
