use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Schema,
    Statement,
};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::{department, person};

/// Open a connection pool without touching the schema
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.connection_url());
    opt.max_connections(config.max_connections.max(1))
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    if !config.is_sqlite() {
        opt.set_schema_search_path("public");
    }

    Database::connect(opt).await
}

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    if config.is_sqlite() {
        info!("Connecting to database: sqlite {}", config.path);
    } else {
        info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name);
    }

    let db = connect(config).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Create missing tables
async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    info!("Running auto-migration for all entities...");

    create_table_if_not_exists(db, backend, schema.create_table_from_entity(department::Entity)).await?;
    create_table_if_not_exists(db, backend, schema.create_table_from_entity(person::Entity)).await?;

    info!("Auto-migration completed successfully");
    Ok(())
}

/// Create a table if it doesn't exist
async fn create_table_if_not_exists(
    db: &DatabaseConnection,
    backend: DbBackend,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();

    let sql = backend.build(&stmt);

    db.execute(Statement::from_string(backend, sql.to_string())).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn test_init_in_memory() {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let rows = department::Entity::find().all(&db).await.unwrap();
        assert!(rows.is_empty());
        let rows = person::Entity::find().all(&db).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        tokio_test::assert_ok!(auto_migrate(&db).await);
    }
}
