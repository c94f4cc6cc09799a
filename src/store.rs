//! Durable key-value storage for session state.
//!
//! Values are JSON-encoded strings. `MemoryStore` keeps everything in the
//! process. `FileStore` buffers writes in memory and mirrors the whole map to a
//! JSON file on `flush`, replacing the file atomically through a temp file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("storage I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("storage serialization failed: {0}")]
  Serialize(#[from] serde_json::Error),
  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

pub trait KvStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
  fn remove(&self, key: &str) -> Result<(), StoreError>;

  /// True while some accepted write is not yet durable.
  fn pending(&self) -> bool {
    false
  }

  /// Make every accepted write durable. Blocking; may do disk I/O.
  fn flush(&self) -> Result<(), StoreError> {
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryStore {
  map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(map.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    map.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    map.remove(key);
    Ok(())
  }
}

pub struct FileStore {
  path: PathBuf,
  map: Mutex<HashMap<String, String>>,
  dirty: AtomicBool,
  /// Serializes flushes so a file never goes back to an older map.
  flushing: Mutex<()>,
}

impl FileStore {
  /// Open (or start) the store at `path`. A missing file starts empty; an
  /// unreadable or malformed one is logged and also starts empty.
  pub fn open(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref().to_path_buf();
    let map = match std::fs::read_to_string(&path) {
      Ok(s) => match serde_json::from_str::<HashMap<String, String>>(&s) {
        Ok(m) => {
          info!(target: "study_tool", path = %path.display(), keys = m.len(), "Opened key-value store");
          m
        }
        Err(e) => {
          warn!(target: "study_tool", path = %path.display(), error = %e, "Malformed store file; starting empty");
          HashMap::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
      Err(e) => {
        warn!(target: "study_tool", path = %path.display(), error = %e, "Unreadable store file; starting empty");
        HashMap::new()
      }
    };
    Self { path, map: Mutex::new(map), dirty: AtomicBool::new(false), flushing: Mutex::new(()) }
  }

  fn temp_path(&self) -> PathBuf {
    let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    self.path.with_file_name(name)
  }

  fn write_atomically(&self) -> Result<usize, StoreError> {
    let (json, keys) = {
      let map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
      (serde_json::to_string_pretty(&*map)?, map.len())
    };
    let tmp = self.temp_path();
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &self.path)?;
    Ok(keys)
  }
}

impl KvStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(map.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    map.insert(key.to_string(), value.to_string());
    self.dirty.store(true, Ordering::Release);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut map = self.map.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    if map.remove(key).is_some() {
      self.dirty.store(true, Ordering::Release);
    }
    Ok(())
  }

  fn pending(&self) -> bool {
    self.dirty.load(Ordering::Acquire)
  }

  fn flush(&self) -> Result<(), StoreError> {
    let _guard = self.flushing.lock().map_err(|e| StoreError::Unavailable(e.to_string()))?;
    if !self.dirty.swap(false, Ordering::AcqRel) {
      return Ok(());
    }
    match self.write_atomically() {
      Ok(keys) => {
        debug!(target: "study_tool", path = %self.path.display(), keys, "Flushed key-value store");
        Ok(())
      }
      Err(e) => {
        self.dirty.store(true, Ordering::Release);
        Err(e)
      }
    }
  }
}

impl Drop for FileStore {
  fn drop(&mut self) {
    if let Err(e) = self.flush() {
      warn!(target: "study_tool", path = %self.path.display(), error = %e, "Final store flush failed");
    }
  }
}
