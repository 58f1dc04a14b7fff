//! Storage seam for architecture records.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use skyplan_core::Result;
use tokio::sync::RwLock;

use crate::architecture::Architecture;

/// Backend the persistence manager talks to. Implementations report
/// transport and I/O problems as `Error::PersistenceFailure`.
#[async_trait]
pub trait ArchitectureStore: Send + Sync {
    /// All records owned by `owner_id`, in no particular order.
    async fn list(&self, owner_id: &str) -> Result<Vec<Architecture>>;

    async fn get(&self, id: &str) -> Result<Option<Architecture>>;

    /// Insert or fully replace the record with `architecture.id`.
    async fn put(&self, architecture: &Architecture) -> Result<()>;

    /// Succeeds when the record is already absent.
    async fn remove(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl<S: ArchitectureStore + ?Sized> ArchitectureStore for Arc<S> {
    async fn list(&self, owner_id: &str) -> Result<Vec<Architecture>> {
        (**self).list(owner_id).await
    }

    async fn get(&self, id: &str) -> Result<Option<Architecture>> {
        (**self).get(id).await
    }

    async fn put(&self, architecture: &Architecture) -> Result<()> {
        (**self).put(architecture).await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        (**self).remove(id).await
    }
}

/// Process-local store. Used by tests and by hosts without a backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Architecture>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchitectureStore for MemoryStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Architecture>> {
        let records = self.records.read().await;
        let owned = records
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(owned)
    }

    async fn get(&self, id: &str) -> Result<Option<Architecture>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn put(&self, architecture: &Architecture) -> Result<()> {
        self.records
            .write()
            .await
            .insert(architecture.id.clone(), architecture.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }
}
