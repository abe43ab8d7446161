use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub mod queries;
pub mod store;

pub use store::{FlightStore, PgFlightStore};

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    sqlx::query(queries::CREATE_TRACKED_FLIGHTS)
        .execute(&pool)
        .await?;
    Ok(pool)
}
