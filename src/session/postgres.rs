use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Executor, Pool, Postgres, Row};
use uuid::Uuid;

use super::{SessionBackend, SessionStore};
use crate::error::Error;

type Database = Postgres;

pub struct PgSessionStore {
    pool: Pool<Database>,
    rider_id: Uuid,
}

impl PgSessionStore {
    pub fn new(pool: Pool<Database>, rider_id: Uuid) -> Self {
        Self { pool, rider_id }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[tracing::instrument(skip(self), fields(rider_id = %self.rider_id))]
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(
                sqlx::query("SELECT token FROM session_tokens WHERE rider_id = $1 AND key = $2")
                    .bind(&self.rider_id)
                    .bind(key),
            )
            .await?;

        match maybe_result {
            Some(result) => Ok(Some(result.try_get("token")?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, token), fields(rider_id = %self.rider_id))]
    async fn put(&self, key: &str, token: String) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO session_tokens (rider_id, key, token) VALUES ($1, $2, $3)
                 ON CONFLICT (rider_id, key) DO UPDATE SET token = EXCLUDED.token",
            )
            .bind(&self.rider_id)
            .bind(key)
            .bind(token),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(rider_id = %self.rider_id))]
    async fn remove(&self, key: &str) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("DELETE FROM session_tokens WHERE rider_id = $1 AND key = $2")
                .bind(&self.rider_id)
                .bind(key),
        )
        .await?;

        Ok(())
    }
}

pub struct PgSessionBackend {
    pool: Pool<Database>,
}

impl PgSessionBackend {
    #[tracing::instrument(name = "PgSessionBackend::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        pool.execute(
            "CREATE TABLE IF NOT EXISTS session_tokens (rider_id UUID NOT NULL, key VARCHAR NOT NULL, token VARCHAR NOT NULL, PRIMARY KEY (rider_id, key))",
        )
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionBackend for PgSessionBackend {
    async fn open(&self, rider_id: Uuid) -> Result<Arc<dyn SessionStore>, Error> {
        Ok(Arc::new(PgSessionStore::new(self.pool.clone(), rider_id)))
    }
}
