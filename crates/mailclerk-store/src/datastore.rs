//! Typed datastore over a blob store.
//!
//! One JSON document per job state. A fetch that fails for any reason,
//! transport or parse, is a single `StateReadFailure`; state is never
//! partially populated.

use std::marker::PhantomData;
use std::sync::Arc;

use mailclerk_core::{ClerkError, Outcome};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::dropbox::BlobStore;

pub struct Datastore<S> {
    store: Arc<dyn BlobStore>,
    path: String,
    _state: PhantomData<S>,
}

impl<S> Datastore<S>
where
    S: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn BlobStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
            _state: PhantomData,
        }
    }

    /// Fetch and deserialize the current state document.
    pub async fn current(&self) -> Outcome<S> {
        let read_failure = || ClerkError::StateReadFailure {
            name: self.path.clone(),
        };
        let content = self.store.read(&self.path).await.map_err(|e| {
            tracing::warn!(path = %self.path, error = %e, "state fetch failed");
            read_failure()
        })?;
        serde_json::from_str(&content).map_err(|e| {
            tracing::warn!(path = %self.path, error = %e, "state parse failed");
            read_failure()
        })
    }

    /// Serialize and store the full new state, replacing the document.
    ///
    /// On success returns the confirmation built from `description`; on
    /// failure the description travels inside the error so the caller's
    /// already-completed side effects stay visible in the final message.
    pub async fn store(&self, state: &S, description: &str) -> Outcome<String> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| ClerkError::store(format!("serialize {}: {e}", self.path)))?;
        self.store
            .write(&self.path, &content)
            .await
            .map_err(|e| {
                tracing::warn!(path = %self.path, error = %e, "state write failed");
                ClerkError::StateWriteFailure {
                    description: description.to_string(),
                }
            })?;
        Ok(format!(
            "{description}\nCurrent state has been stored in Dropbox"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Counter {
        count: u32,
    }

    struct MemoryStore {
        blobs: Mutex<HashMap<String, String>>,
        fail_writes: bool,
    }

    impl MemoryStore {
        fn with(path: &str, content: &str) -> Self {
            Self {
                blobs: Mutex::new(HashMap::from([(path.to_string(), content.to_string())])),
                fail_writes: false,
            }
        }
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn read(&self, path: &str) -> Outcome<String> {
            self.blobs
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| ClerkError::store(format!("missing {path}")))
        }

        async fn write(&self, path: &str, content: &str) -> Outcome<()> {
            if self.fail_writes {
                return Err(ClerkError::store("write refused"));
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(path.to_string(), content.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn round_trips_state_through_json() {
        let store = Arc::new(MemoryStore::with("/counter.json", r#"{"count": 3}"#));
        let datastore: Datastore<Counter> = Datastore::new(store, "/counter.json");

        assert_eq!(datastore.current().await.unwrap(), Counter { count: 3 });

        let message = datastore
            .store(&Counter { count: 4 }, "Counter bumped")
            .await
            .unwrap();
        assert_eq!(
            message,
            "Counter bumped\nCurrent state has been stored in Dropbox"
        );
        assert_eq!(datastore.current().await.unwrap(), Counter { count: 4 });
    }

    #[tokio::test]
    async fn missing_blob_is_a_read_failure() {
        let store = Arc::new(MemoryStore::with("/other.json", "{}"));
        let datastore: Datastore<Counter> = Datastore::new(store, "/counter.json");
        let err = datastore.current().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error downloading file /counter.json from Dropbox"
        );
    }

    #[tokio::test]
    async fn malformed_blob_is_a_read_failure_too() {
        let store = Arc::new(MemoryStore::with("/counter.json", "not json"));
        let datastore: Datastore<Counter> = Datastore::new(store, "/counter.json");
        assert!(matches!(
            datastore.current().await.unwrap_err(),
            ClerkError::StateReadFailure { .. }
        ));
    }

    #[tokio::test]
    async fn write_failure_carries_the_description() {
        let mut store = MemoryStore::with("/counter.json", "{}");
        store.fail_writes = true;
        let datastore: Datastore<Counter> = Datastore::new(Arc::new(store), "/counter.json");
        let err = datastore
            .store(&Counter { count: 1 }, "Counter bumped")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Counter bumped\nError - could not store state in Dropbox"
        );
    }
}
