//! JSON document store: one file per collection, `{ "<collection>": [...] }`.

use super::{LAST_ID_KEY, Record, RecordStore, StoreError, StoreResult, max_id};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error};

pub struct JsonFileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Store backed by `<dir>/<collection>.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", T::COLLECTION)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> StoreResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) => Err(StoreError::Shape {
                path: self.path.clone(),
                message: "top-level value must be an object".to_string(),
            }),
            Err(source) => Err(StoreError::Parse {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// The recorded `ultimoId`, raised to any id still present in the stored array.
fn stored_last_id(document: &Map<String, Value>, collection: &str) -> u64 {
    let recorded = document.get(LAST_ID_KEY).and_then(Value::as_u64).unwrap_or(0);
    let present = match document.get(collection) {
        Some(Value::Array(records)) => records
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_u64))
            .max()
            .unwrap_or(0),
        _ => 0,
    };
    recorded.max(present)
}

#[async_trait]
impl<T: Record> RecordStore<T> for JsonFileStore<T> {
    async fn load(&self) -> StoreResult<Vec<T>> {
        let mut document = self.read_document().await?;
        let records = match document.remove(T::COLLECTION) {
            None | Some(Value::Null) => Vec::new(),
            Some(value @ Value::Array(_)) => {
                serde_json::from_value(value).map_err(|source| StoreError::Parse {
                    path: self.path.clone(),
                    source,
                })?
            }
            Some(_) => {
                return Err(StoreError::Shape {
                    path: self.path.clone(),
                    message: format!("`{}` must be an array", T::COLLECTION),
                });
            }
        };
        debug!(collection = T::COLLECTION, count = records.len(), "loaded records");
        Ok(records)
    }

    async fn last_id(&self) -> StoreResult<u64> {
        let document = self.read_document().await?;
        Ok(stored_last_id(&document, T::COLLECTION))
    }

    async fn save_all(&self, records: &[T]) -> StoreResult<()> {
        let mut document = self.read_document().await?;
        let last_id = stored_last_id(&document, T::COLLECTION).max(max_id(records));
        let array = serde_json::to_value(records).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        document.insert(T::COLLECTION.to_string(), array);
        document.insert(LAST_ID_KEY.to_string(), Value::from(last_id));

        let contents = serde_json::to_string_pretty(&Value::Object(document)).map_err(|source| {
            StoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;

        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || write_atomic(&path, contents.as_bytes()))
            .await
            .map_err(|join| StoreError::Io {
                path: self.path.clone(),
                source: std::io::Error::other(join),
            })?;

        if let Err(err) = &written {
            error!(collection = T::COLLECTION, error = %err, "failed to save records");
        }
        written
    }
}

/// Writes `contents` to a temp file next to `path`, syncs it, then renames it over
/// `path`. Readers never observe a partially written document.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(contents).map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
