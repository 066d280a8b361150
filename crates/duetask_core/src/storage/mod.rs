use crate::error::StorageError;
use std::future::Future;
use std::sync::Arc;

pub mod json_store;
pub mod memory;
pub mod record;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

pub const PENDING_KEY: &str = "tasks";
pub const COMPLETED_KEY: &str = "completed_tasks";

/// Named string blobs, loaded and saved asynchronously.
///
/// `load` resolves to `Ok(None)` when nothing was ever saved under `key`.
pub trait Persistence: Send + Sync {
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    fn save(&self, key: &str, blob: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<P: Persistence> Persistence for Arc<P> {
    fn load(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        P::load(self, key)
    }

    fn save(
        &self,
        key: &str,
        blob: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        P::save(self, key, blob)
    }
}
