//! Record storage for entity collections.
//!
//! A [`RecordStore`] loads and saves the whole array of one entity. A
//! [`Collection`] wraps a store with id assignment and a per-entity writer lock,
//! so every read-modify-write cycle is serialized.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub(crate) use json_file::write_atomic;
pub use memory::MemoryStore;

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected document shape in {}: {message}", .path.display())]
    Shape { path: PathBuf, message: String },

    #[error("no ids left in {collection}")]
    IdsExhausted { collection: &'static str },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Record + store contracts
// ============================================================================

/// A persisted entity with a numeric id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Top-level key of the backing document, also the file stem.
    const COLLECTION: &'static str;
    /// Human label used in not-found messages.
    const LABEL: &'static str;

    fn id(&self) -> u64;
}

#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    async fn load(&self) -> StoreResult<Vec<T>>;
    /// Highest id ever saved, counting records deleted since.
    async fn last_id(&self) -> StoreResult<u64>;
    /// Replaces the records. The stored `last_id` never goes down.
    async fn save_all(&self, records: &[T]) -> StoreResult<()>;
}

/// Top-level key holding the high-water id in JSON documents.
pub(crate) const LAST_ID_KEY: &str = "ultimoId";

pub(crate) fn max_id<T: Record>(records: &[T]) -> u64 {
    records.iter().map(Record::id).max().unwrap_or(0)
}

/// Next id for a collection: one past both `last_id` and the largest present id.
/// Ids freed by deletion are never handed out again.
pub fn next_id<T: Record>(last_id: u64, records: &[T]) -> StoreResult<u64> {
    last_id
        .max(max_id(records))
        .checked_add(1)
        .ok_or(StoreError::IdsExhausted {
            collection: T::COLLECTION,
        })
}

pub fn not_found<T: Record>(id: u64) -> AppError {
    AppError::not_found(format!("{} {} not found", T::LABEL, id))
}

// ============================================================================
// Collection
// ============================================================================

pub struct Collection<T: Record> {
    store: Arc<dyn RecordStore<T>>,
    writer: Mutex<()>,
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn RecordStore<T>>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> AppResult<Vec<T>> {
        Ok(self.store.load().await?)
    }

    pub async fn find(&self, id: u64) -> AppResult<Option<T>> {
        Ok(self.load().await?.into_iter().find(|record| record.id() == id))
    }

    pub async fn filter<F>(&self, predicate: F) -> AppResult<Vec<T>>
    where
        F: Fn(&T) -> bool + Send,
    {
        let mut records = self.load().await?;
        records.retain(|record| predicate(record));
        Ok(records)
    }

    /// Loads the collection under the writer lock, applies `apply`, and saves only
    /// when `apply` succeeds. A failed mutation leaves the backing store untouched.
    pub async fn mutate<R, F>(&self, apply: F) -> AppResult<R>
    where
        F: FnOnce(&mut Vec<T>) -> AppResult<R> + Send,
        R: Send,
    {
        let _guard = self.writer.lock().await;
        let mut records = self.store.load().await?;
        let outcome = apply(&mut records)?;
        self.store.save_all(&records).await?;
        Ok(outcome)
    }

    /// Builds a record from the next unused id and the current contents, then appends it.
    pub async fn insert_with<F>(&self, build: F) -> AppResult<T>
    where
        F: FnOnce(u64, &[T]) -> AppResult<T> + Send,
    {
        let _guard = self.writer.lock().await;
        let mut records = self.store.load().await?;
        let id = next_id(self.store.last_id().await?, &records)?;
        let record = build(id, &records)?;
        records.push(record.clone());
        self.store.save_all(&records).await?;
        Ok(record)
    }

    /// Applies `change` to the record with `id`. `change` also sees the other records,
    /// which is what uniqueness checks need.
    pub async fn update_with<F>(&self, id: u64, change: F) -> AppResult<T>
    where
        F: FnOnce(&mut T, &[T]) -> AppResult<()> + Send,
    {
        self.mutate(|records| {
            let index = position_of(records, id)?;
            let mut updated = records[index].clone();
            change(&mut updated, records)?;
            records[index] = updated.clone();
            Ok(updated)
        })
        .await
    }

    pub async fn remove(&self, id: u64) -> AppResult<T> {
        self.mutate(|records| {
            let index = position_of(records, id)?;
            Ok(records.remove(index))
        })
        .await
    }
}

fn position_of<T: Record>(records: &[T], id: u64) -> AppResult<usize> {
    records
        .iter()
        .position(|record| record.id() == id)
        .ok_or_else(|| not_found::<T>(id))
}
