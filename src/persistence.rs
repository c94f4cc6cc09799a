//! Mirrors session state into the key-value store and reads it back at startup.
//!
//! Every field lives under its own key so one failed write never blocks the
//! others. Nothing here is fatal: writes that fail are logged and dropped,
//! reads that fail or hit malformed JSON return the caller's default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::COMPREHENSIVE_ID;
use crate::store::KvStore;

pub const KEY_SELECTED_QUIZ: &str = "quiz.selectedQuiz";
pub const KEY_CURRENT_INDEX: &str = "quiz.currentQuestionIndex";
pub const KEY_SCORE: &str = "quiz.score";
pub const KEY_COMPLETED: &str = "quiz.completedQuestions";
/// Reserved for a future attempt history. Never written or read.
#[allow(dead_code)]
pub const KEY_HISTORY: &str = "quiz.history";

/// The persisted subset of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub selected_quiz: String,
  pub cursor: usize,
  pub score: u32,
  /// Ascending cursor positions already submitted.
  pub completed: Vec<usize>,
}

impl Default for Snapshot {
  fn default() -> Self {
    Self { selected_quiz: COMPREHENSIVE_ID.into(), cursor: 0, score: 0, completed: Vec::new() }
  }
}

/// Persistence adapter for one session namespace.
pub struct Persistence<'a> {
  store: &'a dyn KvStore,
  namespace: &'a str,
}

impl<'a> Persistence<'a> {
  pub fn new(store: &'a dyn KvStore, namespace: &'a str) -> Self {
    Self { store, namespace }
  }

  fn key(&self, field: &str) -> String {
    format!("{}/{}", self.namespace, field)
  }

  /// Serialize and store one value. Returns false if the write was dropped.
  pub fn write<T: Serialize>(&self, field: &str, value: &T) -> bool {
    let key = self.key(field);
    let res = serde_json::to_string(value)
      .map_err(crate::store::StoreError::from)
      .and_then(|json| self.store.set(&key, &json));
    match res {
      Ok(()) => true,
      Err(e) => {
        warn!(target: "study_tool", %key, error = %e, "Dropping failed storage write");
        false
      }
    }
  }

  /// Read one value, or `default` when absent, unreadable, or malformed.
  pub fn read_or<T: DeserializeOwned>(&self, field: &str, default: T) -> T {
    let key = self.key(field);
    match self.store.get(&key) {
      Ok(Some(json)) => match serde_json::from_str::<T>(&json) {
        Ok(v) => v,
        Err(e) => {
          warn!(target: "study_tool", %key, error = %e, "Malformed stored value; using default");
          default
        }
      },
      Ok(None) => default,
      Err(e) => {
        warn!(target: "study_tool", %key, error = %e, "Storage read failed; using default");
        default
      }
    }
  }

  /// Write all four fields independently. Returns the number of dropped writes.
  pub fn save_snapshot(&self, snap: &Snapshot) -> usize {
    let results = [
      self.write(KEY_SELECTED_QUIZ, &snap.selected_quiz),
      self.write(KEY_CURRENT_INDEX, &snap.cursor),
      self.write(KEY_SCORE, &snap.score),
      self.write(KEY_COMPLETED, &snap.completed),
    ];
    let failed = results.iter().filter(|ok| !**ok).count();
    debug!(target: "study_tool", namespace = %self.namespace, failed, "Saved session snapshot");
    failed
  }

  /// Read all four fields independently, each falling back to `defaults`.
  pub fn load_snapshot(&self, defaults: Snapshot) -> Snapshot {
    Snapshot {
      selected_quiz: self.read_or(KEY_SELECTED_QUIZ, defaults.selected_quiz),
      cursor: self.read_or(KEY_CURRENT_INDEX, defaults.cursor),
      score: self.read_or(KEY_SCORE, defaults.score),
      completed: self.read_or(KEY_COMPLETED, defaults.completed),
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::store::{MemoryStore, StoreError};

  /// Store double whose writes to selected keys always fail; reads can fail too.
  pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_suffix: &'static str,
    pub fail_reads: bool,
  }

  impl KvStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      if self.fail_reads {
        return Err(StoreError::Unavailable("reads disabled".into()));
      }
      self.inner.get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      if key.ends_with(self.failing_suffix) {
        return Err(StoreError::Unavailable("quota exceeded".into()));
      }
      self.inner.set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StoreError> {
      self.inner.remove(key)
    }
  }

  fn sample() -> Snapshot {
    Snapshot { selected_quiz: "bank_7".into(), cursor: 3, score: 2, completed: vec![0, 1, 3] }
  }

  #[test]
  fn snapshot_round_trips_through_store() {
    let store = MemoryStore::new();
    let p = Persistence::new(&store, "s1");
    assert_eq!(p.save_snapshot(&sample()), 0);
    assert_eq!(p.load_snapshot(Snapshot::default()), sample());
    assert_eq!(store.get("s1/quiz.completedQuestions").unwrap().as_deref(), Some("[0,1,3]"));
  }

  #[test]
  fn absent_keys_use_caller_defaults() {
    let store = MemoryStore::new();
    let p = Persistence::new(&store, "fresh");
    let defaults = Snapshot { selected_quiz: "x".into(), cursor: 9, score: 1, completed: vec![4] };
    assert_eq!(p.load_snapshot(defaults.clone()), defaults);
  }

  #[test]
  fn malformed_values_degrade_per_key() {
    let store = MemoryStore::new();
    store.set("s/quiz.selectedQuiz", "\"bank_2\"").unwrap();
    store.set("s/quiz.currentQuestionIndex", "not-a-number").unwrap();
    store.set("s/quiz.score", "-4").unwrap();
    store.set("s/quiz.completedQuestions", "{\"oops\":true}").unwrap();

    let snap = Persistence::new(&store, "s").load_snapshot(Snapshot::default());
    assert_eq!(snap.selected_quiz, "bank_2");
    assert_eq!(snap.cursor, 0);
    assert_eq!(snap.score, 0);
    assert!(snap.completed.is_empty());
  }

  #[test]
  fn one_failed_write_does_not_block_the_others() {
    let store = FlakyStore { inner: MemoryStore::new(), failing_suffix: KEY_SCORE, fail_reads: false };
    let p = Persistence::new(&store, "s");
    assert_eq!(p.save_snapshot(&sample()), 1);

    let snap = p.load_snapshot(Snapshot::default());
    assert_eq!(snap.selected_quiz, "bank_7");
    assert_eq!(snap.cursor, 3);
    assert_eq!(snap.score, 0);
    assert_eq!(snap.completed, vec![0, 1, 3]);
  }

  #[test]
  fn unreadable_store_yields_defaults() {
    let store = FlakyStore { inner: MemoryStore::new(), failing_suffix: "never", fail_reads: true };
    let p = Persistence::new(&store, "s");
    p.save_snapshot(&sample());
    assert_eq!(p.load_snapshot(Snapshot::default()), Snapshot::default());
  }

  #[test]
  fn history_key_is_never_written() {
    let store = MemoryStore::new();
    Persistence::new(&store, "s").save_snapshot(&sample());
    assert_eq!(store.get(&format!("s/{}", KEY_HISTORY)).unwrap(), None);
  }

  #[test]
  fn namespaces_are_isolated() {
    let store = MemoryStore::new();
    Persistence::new(&store, "a").save_snapshot(&sample());
    let other = Persistence::new(&store, "b").load_snapshot(Snapshot::default());
    assert_eq!(other, Snapshot::default());
  }
}
