use crate::models::StaffRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Repository Trait
///
/// Defines the abstract contract for staff data persistence. Handlers only see
/// `Arc<dyn Repository>`, so tests can swap in their own implementation.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn count(&self) -> usize;
    // Snapshot of every record, in insertion order.
    async fn all_records(&self) -> Vec<StaffRecord>;
    // Replaces the whole data set; returns the number of records now stored.
    async fn replace_all(&self, records: Vec<StaffRecord>) -> usize;
    // Deletes every record; returns how many were removed.
    async fn clear(&self) -> usize;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// InMemoryRepository
///
/// Process-local store. Staff data lives for the lifetime of the server and is
/// carried between deployments through backup and restore.
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<Vec<StaffRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<StaffRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    async fn all_records(&self) -> Vec<StaffRecord> {
        self.records.read().await.clone()
    }

    async fn replace_all(&self, records: Vec<StaffRecord>) -> usize {
        let mut guard = self.records.write().await;
        *guard = records;
        guard.len()
    }

    async fn clear(&self) -> usize {
        let mut guard = self.records.write().await;
        let removed = guard.len();
        guard.clear();
        removed
    }
}
