use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionBackend, SessionStore};
use crate::error::Error;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.tokens.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, token: String) -> Result<(), Error> {
        self.tokens.write().await.insert(key.into(), token);

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.tokens.write().await.remove(key);

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionBackend {
    stores: RwLock<HashMap<Uuid, Arc<MemorySessionStore>>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn open(&self, rider_id: Uuid) -> Result<Arc<dyn SessionStore>, Error> {
        if let Some(store) = self.stores.read().await.get(&rider_id) {
            return Ok(store.clone());
        }

        let store = self
            .stores
            .write()
            .await
            .entry(rider_id)
            .or_insert_with(|| Arc::new(MemorySessionStore::new()))
            .clone();

        Ok(store)
    }
}

#[test]
fn memory_store_round_trip() {
    use super::ACCESS_TOKEN_KEY;
    use tokio_test::block_on;

    let store = MemorySessionStore::new();

    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), None);

    block_on(store.put(ACCESS_TOKEN_KEY, "secret".into())).unwrap();
    assert_eq!(
        block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(),
        Some("secret".into())
    );

    block_on(store.remove(ACCESS_TOKEN_KEY)).unwrap();
    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), None);

    // removing again is not an error
    block_on(store.remove(ACCESS_TOKEN_KEY)).unwrap();
}

#[test]
fn memory_backend_keeps_one_store_per_rider() {
    use super::ACCESS_TOKEN_KEY;
    use tokio_test::block_on;

    let backend = MemorySessionBackend::new();
    let ada = Uuid::new_v4();
    let grace = Uuid::new_v4();

    let store = block_on(backend.open(ada)).unwrap();
    block_on(store.put(ACCESS_TOKEN_KEY, "ada-token".into())).unwrap();

    let reopened = block_on(backend.open(ada)).unwrap();
    assert_eq!(
        block_on(reopened.get(ACCESS_TOKEN_KEY)).unwrap(),
        Some("ada-token".into())
    );

    let other = block_on(backend.open(grace)).unwrap();
    assert_eq!(block_on(other.get(ACCESS_TOKEN_KEY)).unwrap(), None);
}
