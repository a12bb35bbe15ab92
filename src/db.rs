use diesel::r2d2::{self, ConnectionManager};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::DbPool;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn build_pool(database_url: &str) -> Result<DbPool, r2d2::PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let builder = r2d2::Pool::builder();
    // every connection to ":memory:" is a separate database, so keep exactly one alive
    let builder = if database_url == ":memory:" {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder
    };
    builder.build(manager)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    Ok(())
}
