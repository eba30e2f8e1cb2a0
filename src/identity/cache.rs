/// Key cache for resolved did:web assertion keys
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Storage for resolved keys, keyed by issuer DID
///
/// The resolver only ever calls `get` and `insert`; expiry or rotation
/// handling belongs in an implementation of this trait.
#[async_trait]
pub trait KeyCache: Send + Sync {
    async fn get(&self, issuer: &str) -> Option<DecodingKey>;

    async fn insert(&self, issuer: &str, key: DecodingKey);
}

/// Process-lifetime cache with no eviction
///
/// Concurrent first resolutions of the same issuer may both insert; the last
/// write wins and both entries are complete keys.
#[derive(Clone, Default)]
pub struct InMemoryKeyCache {
    entries: Arc<RwLock<HashMap<String, DecodingKey>>>,
}

impl InMemoryKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyCache for InMemoryKeyCache {
    async fn get(&self, issuer: &str) -> Option<DecodingKey> {
        self.entries.read().await.get(issuer).cloned()
    }

    async fn insert(&self, issuer: &str, key: DecodingKey) {
        self.entries.write().await.insert(issuer.to_string(), key);
    }
}
