use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

pub type DbPool = Arc<PgPool>;

/// Connects with the pool sized from configuration. Review traffic is many
/// short transactions, so the acquire timeout stays short instead of letting
/// requests queue behind a saturated pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(Arc::new(pool))
}
