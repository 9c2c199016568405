//! Postgres-backed [`Datastore`]: upserts via `ON CONFLICT ... DO UPDATE`,
//! free functions over a shared `PgPool` for pool construction and
//! migrations.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::DatastoreError;
use crate::ports::Datastore;

/// Builds the shared connection pool. Pool size bounds effective handler
/// parallelism, per the concurrency model.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(max_connections).connect(database_url).await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn classify(err: sqlx::Error) -> DatastoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() || db_err.is_foreign_key_violation() => {
            DatastoreError::Constraint(err.to_string())
        }
        _ => DatastoreError::Transient(err.to_string()),
    }
}

pub struct PgDatastore {
    pool: PgPool,
}

impl PgDatastore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Datastore for PgDatastore {
    async fn store_login(&self, user_id: &str, client_id: &str) -> Result<(), DatastoreError> {
        sqlx::query!(
            r#"INSERT INTO user_login_records (user_id, client_id, created_at)
               VALUES ($1, $2, now())
               ON CONFLICT (user_id, client_id) DO UPDATE SET created_at = EXCLUDED.created_at"#,
            user_id,
            client_id,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn fetch_client_ids(&self, user_id: &str) -> Result<Vec<String>, DatastoreError> {
        let rows = sqlx::query!(
            "SELECT client_id FROM user_login_records WHERE user_id = $1",
            user_id,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;
        Ok(rows.into_iter().map(|row| row.client_id).collect())
    }
}
