mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Error;

pub use memory::{MemorySessionBackend, MemorySessionStore};
pub use postgres::{PgSessionBackend, PgSessionStore};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn put(&self, key: &str, token: String) -> Result<(), Error>;

    /// Removing a key that is not present succeeds.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Hands out the token store that belongs to one rider.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn open(&self, rider_id: Uuid) -> Result<Arc<dyn SessionStore>, Error>;
}
