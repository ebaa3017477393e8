use sea_orm_migration::prelude::*;

mod m20251019_000001_create_app_user_table;
mod m20251019_000002_create_identity_table;
mod m20251019_000003_create_profile_table;
mod m20251019_000004_create_user_role_table;
mod m20251019_000005_create_project_table;
mod m20251019_000006_create_project_content_table;
mod m20251019_000007_create_project_member_table;
mod m20251019_000008_create_project_progression_table;
mod m20251019_000009_create_event_table;
mod m20251019_000010_create_event_content_table;
mod m20251019_000011_create_event_registration_table;
mod m20251019_000012_create_event_progression_table;
mod m20251019_000013_create_forum_post_table;
mod m20251019_000014_create_forum_comment_table;
mod m20251019_000015_create_storage_object_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251019_000001_create_app_user_table::Migration),
            Box::new(m20251019_000002_create_identity_table::Migration),
            Box::new(m20251019_000003_create_profile_table::Migration),
            Box::new(m20251019_000004_create_user_role_table::Migration),
            Box::new(m20251019_000005_create_project_table::Migration),
            Box::new(m20251019_000006_create_project_content_table::Migration),
            Box::new(m20251019_000007_create_project_member_table::Migration),
            Box::new(m20251019_000008_create_project_progression_table::Migration),
            Box::new(m20251019_000009_create_event_table::Migration),
            Box::new(m20251019_000010_create_event_content_table::Migration),
            Box::new(m20251019_000011_create_event_registration_table::Migration),
            Box::new(m20251019_000012_create_event_progression_table::Migration),
            Box::new(m20251019_000013_create_forum_post_table::Migration),
            Box::new(m20251019_000014_create_forum_comment_table::Migration),
            Box::new(m20251019_000015_create_storage_object_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    for table in [
        "app_user",
        "identity",
        "profile",
        "user_role",
        "project",
        "project_content",
        "project_member",
        "project_progression",
        "event",
        "event_content",
        "event_registration",
        "event_progression",
        "forum_post",
        "forum_comment",
        "storage_object",
    ] {
        assert!(schema_manager.has_table(table).await?, "missing table {table}");
    }

    Ok(())
}
