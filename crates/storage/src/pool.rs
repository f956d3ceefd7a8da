use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use ticketops_common::error::{Result, TicketOpsError};

/// Opens the pool and runs pending migrations, mirroring the teacher's
/// `PostgresClient::new` + `run_migrations` split but with a real
/// migration runner in place of the stub `todo!()`.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| TicketOpsError::Database(e.to_string()))?;

    Ok(pool)
}
