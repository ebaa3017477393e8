use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StorageObject::Table)
                    .col(string(StorageObject::Bucket))
                    .col(string(StorageObject::Path))
                    .col(string(StorageObject::ContentType))
                    .col(big_integer(StorageObject::Size))
                    .col(blob(StorageObject::Data))
                    .col(string(StorageObject::CreatedAt))
                    .col(string(StorageObject::UpdatedAt))
                    .primary_key(
                        Index::create()
                            .col(StorageObject::Bucket)
                            .col(StorageObject::Path),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StorageObject::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StorageObject {
    Table,
    Bucket,
    Path,
    ContentType,
    Size,
    Data,
    CreatedAt,
    UpdatedAt,
}
