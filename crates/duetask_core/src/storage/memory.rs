use crate::error::StorageError;
use crate::storage::Persistence;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-process key/blob map. Reads and writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob<K: Into<String>, B: Into<String>>(self, key: K, blob: B) -> Self {
        self.put(key, blob);
        self
    }

    pub fn put<K: Into<String>, B: Into<String>>(&self, key: K, blob: B) {
        let mut blobs = match self.blobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        blobs.insert(key.into(), blob.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let blobs = match self.blobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        blobs.get(key).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Persistence for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::read_failed(key, "reads disabled"));
        }
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write_failed(key, "writes disabled"));
        }
        self.put(key, blob);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
