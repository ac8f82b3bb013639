//! Process-local secure store.
//!
//! Nothing survives a restart. Useful for ephemeral sessions, hosts without a
//! keychain, and tests.

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::SecureStore};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemorySecureStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub async fn len(&self) -> usize {
        self.data.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.lock().await.is_empty()
    }
}

#[async_trait]
impl SecureStore for InMemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.data.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemorySecureStore::new();
        assert!(store.is_empty().await);

        store.set_secret("ACCESS_TOKEN", b"abc").await.unwrap();
        assert_eq!(
            store.get_secret("ACCESS_TOKEN").await.unwrap(),
            Some(b"abc".to_vec())
        );
        assert!(store.has_secret("ACCESS_TOKEN").await.unwrap());

        store.delete_secret("ACCESS_TOKEN").await.unwrap();
        store.delete_secret("ACCESS_TOKEN").await.unwrap();
        assert_eq!(store.get_secret("ACCESS_TOKEN").await.unwrap(), None);
        assert_eq!(store.len().await, 0);
    }
}
