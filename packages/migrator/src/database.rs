use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

fn connect_options(db_url: &str) -> ConnectOptions {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // The pipeline is sequential; a small pool is plenty.
    opt.max_connections(4)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        // Statement logging only with --verbose.
        .sqlx_logging(tracing::enabled!(tracing::Level::DEBUG));
    opt
}

/// Connect to a database and check that it answers.
pub async fn connect(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(db_url)).await?;
    db.ping().await?;
    Ok(db)
}

/// Connect to the target database and create any missing tables, columns and
/// constraints from the entities in [`crate::entity`].
pub async fn init_target(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = connect(db_url).await?;
    db.get_schema_registry("migrator::entity::*")
        .sync(&db)
        .await?;
    Ok(db)
}
