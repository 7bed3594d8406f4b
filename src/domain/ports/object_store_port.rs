//! Object store port definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::StoredObjectName;
use crate::domain::errors::StoreError;

/// Port for the remote object store holding avatar images.
/// Implementations must be thread-safe.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    /// Writes an object, replacing any existing one under the same name.
    async fn put(
        &self,
        name: &StoredObjectName,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Deletes objects. Names that do not exist are not an error.
    async fn delete(&self, names: &[StoredObjectName]) -> Result<(), StoreError>;

    /// Checks whether an object exists without downloading it.
    async fn exists(&self, name: &StoredObjectName) -> Result<bool, StoreError>;

    /// Public URL an object is served from.
    fn public_url(&self, name: &StoredObjectName) -> String;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Operation recorded by [`MemoryObjectStore`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreCall {
        Put(String),
        Delete(Vec<String>),
        Exists(String),
    }

    /// In-memory object store with call recording and failure injection.
    #[derive(Default)]
    pub struct MemoryObjectStore {
        objects: Mutex<HashMap<String, (Bytes, String)>>,
        calls: Mutex<Vec<StoreCall>>,
        exists_calls: AtomicUsize,
        fail_put: AtomicBool,
        fail_delete: AtomicBool,
        fail_exists: AtomicBool,
        probe_delay: Mutex<Option<Duration>>,
    }

    impl MemoryObjectStore {
        /// Creates empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Seeds an object without recording a call.
        pub fn insert(&self, name: &str, bytes: &'static [u8]) {
            self.objects.lock().insert(
                name.to_string(),
                (Bytes::from_static(bytes), "application/octet-stream".to_string()),
            );
        }

        pub fn contains(&self, name: &str) -> bool {
            self.objects.lock().contains_key(name)
        }

        pub fn content_type(&self, name: &str) -> Option<String> {
            self.objects.lock().get(name).map(|(_, ct)| ct.clone())
        }

        pub fn calls(&self) -> Vec<StoreCall> {
            self.calls.lock().clone()
        }

        /// Number of existence probes issued so far.
        pub fn exists_calls(&self) -> usize {
            self.exists_calls.load(Ordering::SeqCst)
        }

        pub fn set_fail_put(&self, value: bool) {
            self.fail_put.store(value, Ordering::SeqCst);
        }

        pub fn set_fail_delete(&self, value: bool) {
            self.fail_delete.store(value, Ordering::SeqCst);
        }

        pub fn set_fail_exists(&self, value: bool) {
            self.fail_exists.store(value, Ordering::SeqCst);
        }

        /// Makes every existence probe sleep before answering.
        pub fn set_probe_delay(&self, delay: Option<Duration>) {
            *self.probe_delay.lock() = delay;
        }
    }

    #[async_trait]
    impl ObjectStorePort for MemoryObjectStore {
        async fn put(
            &self,
            name: &StoredObjectName,
            bytes: Bytes,
            content_type: &str,
        ) -> Result<(), StoreError> {
            self.calls.lock().push(StoreCall::Put(name.to_string()));
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(StoreError::backend("put", 503, "mock put failure"));
            }
            self.objects
                .lock()
                .insert(name.to_string(), (bytes, content_type.to_string()));
            Ok(())
        }

        async fn delete(&self, names: &[StoredObjectName]) -> Result<(), StoreError> {
            self.calls.lock().push(StoreCall::Delete(
                names.iter().map(ToString::to_string).collect(),
            ));
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(StoreError::network("mock delete failure"));
            }
            let mut objects = self.objects.lock();
            for name in names {
                objects.remove(name.as_str());
            }
            Ok(())
        }

        async fn exists(&self, name: &StoredObjectName) -> Result<bool, StoreError> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().push(StoreCall::Exists(name.to_string()));
            let delay = *self.probe_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_exists.load(Ordering::SeqCst) {
                return Err(StoreError::network("mock probe failure"));
            }
            Ok(self.contains(name.as_str()))
        }

        fn public_url(&self, name: &StoredObjectName) -> String {
            format!("https://cdn.test/{name}")
        }
    }
}
