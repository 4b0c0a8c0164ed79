//! Migration code

use anyhow::{anyhow, Result};
use diesel::{migration::MigrationSource, pg::Pg, Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

/// Embed migrations into binary
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run pending migrations against the database at `url`.
///
/// The migration harness is synchronous, so this runs on the blocking pool
/// with a dedicated connection.
pub async fn run(url: &str) -> Result<()> {
    let url = url.to_string();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = PgConnection::establish(&url)?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!(e))?;

        for version in applied {
            tracing::info!(subject = "migrations", category = "init", %version, "applied migration");
        }

        Ok(())
    })
    .await?
}

/// Version of the newest embedded migration.
pub fn latest_version() -> Result<Option<String>> {
    let migrations = MigrationSource::<Pg>::migrations(&MIGRATIONS).map_err(|e| anyhow!(e))?;

    Ok(migrations
        .iter()
        .map(|migration| migration.name().version().to_string())
        .max())
}
