use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};
use std::time::Duration;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_conn(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

/// Run database migrations
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS).map_err(
        |e| -> Box<dyn std::error::Error + Send + Sync> {
            Box::new(std::io::Error::other(format!("Migration error: {}", e)))
        },
    )?;
    Ok(())
}

pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("hive-server/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Clamps a user supplied page size into `1..=max`, falling back to `default`.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    match requested {
        Some(n) if n >= 1 => n.min(max),
        _ => default,
    }
}
