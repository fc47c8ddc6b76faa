//! Mock Storage implementation for testing

use async_trait::async_trait;
use avatar_migrate_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A storage call as seen by the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Copy {
        from_bucket: String,
        from_key: String,
        to_bucket: String,
        to_key: String,
    },
    Delete {
        bucket: String,
        key: String,
    },
}

/// Mock storage implementation that stores objects in memory, keyed by `(bucket, key)`
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
    calls: Arc<Mutex<Vec<StorageCall>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an object in the mock storage
    pub fn set_object(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    /// Get object data (for test assertions)
    pub fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn has_object(&self, bucket: &str, key: &str) -> bool {
        self.get_object(bucket, key).is_some()
    }

    /// Make every copy or delete that touches `key` (as source or destination) fail.
    pub fn fail_on_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Make only deletes of `key` fail; copies still succeed.
    pub fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<StorageCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, StorageCall::Delete { .. }))
            .collect()
    }

    pub fn copy_calls(&self) -> Vec<StorageCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, StorageCall::Copy { .. }))
            .collect()
    }

    fn is_failing(&self, key: &str) -> bool {
        self.failing_keys.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn copy(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> StorageResult<()> {
        self.calls.lock().unwrap().push(StorageCall::Copy {
            from_bucket: from_bucket.to_string(),
            from_key: from_key.to_string(),
            to_bucket: to_bucket.to_string(),
            to_key: to_key.to_string(),
        });

        if self.is_failing(from_key) || self.is_failing(to_key) {
            return Err(StorageError::CopyFailed(format!("injected failure for {}", from_key)));
        }

        let data = self
            .get_object(from_bucket, from_key)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", from_bucket, from_key)))?;
        self.set_object(to_bucket, to_key, data);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.calls.lock().unwrap().push(StorageCall::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        if self.is_failing(key) || self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StorageError::DeleteFailed(format!("injected failure for {}", key)));
        }

        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.get_object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        self.set_object(bucket, key, data);
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.has_object(bucket, key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
