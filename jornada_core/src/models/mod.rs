use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use crate::config::JornadaConfig;

pub mod migrator;

pub async fn open_or_create_db(config: &JornadaConfig) -> Result<DatabaseConnection, DbErr> {
    // mode=rwc creates the file on first start
    let connection_string = format!("sqlite://{}?mode=rwc", config.database_path.display());

    Database::connect(&connection_string).await
}

pub async fn migrate_up(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrator::Migrator::up(db, None).await
}

/// Fresh in-memory database with every migration applied.
#[cfg(test)]
pub(crate) async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
