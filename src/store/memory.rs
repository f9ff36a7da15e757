use super::{Record, RecordStore, StoreResult, max_id};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Volatile store used by tests and the `memory` storage backend.
#[derive(Debug)]
pub struct MemoryStore<T> {
    contents: RwLock<Contents<T>>,
}

#[derive(Debug)]
struct Contents<T> {
    records: Vec<T>,
    last_id: u64,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            contents: RwLock::new(Contents {
                records: Vec::new(),
                last_id: 0,
            }),
        }
    }
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<T>) -> Self {
        let last_id = max_id(&records);
        Self {
            contents: RwLock::new(Contents { records, last_id }),
        }
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MemoryStore<T> {
    async fn load(&self) -> StoreResult<Vec<T>> {
        Ok(self.contents.read().await.records.clone())
    }

    async fn last_id(&self) -> StoreResult<u64> {
        Ok(self.contents.read().await.last_id)
    }

    async fn save_all(&self, records: &[T]) -> StoreResult<()> {
        let mut contents = self.contents.write().await;
        contents.last_id = contents.last_id.max(max_id(records));
        contents.records = records.to_vec();
        Ok(())
    }
}
