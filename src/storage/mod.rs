// Local persistence: the preference database and the favorites store on top of it

mod favorites;

pub use favorites::{FAVORITES_KEY, FavoritesStore};

use anyhow::Context;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

/// Connect to the preference database and bring its schema up to date.
#[tracing::instrument(level = "debug")]
pub async fn open_database(connection_string: &str) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(connection_string)
        .await
        .with_context(|| "Failed to connect to preference database")?;

    migration::Migrator::up(&db, None)
        .await
        .with_context(|| "Failed to run database migrations")?;

    Ok(db)
}
