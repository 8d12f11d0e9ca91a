//! Attempt persistence: one row per (activity, user).
//!
//! Rows keep the history as a JSON string, the way it sits in the database;
//! everything above this module only sees `Attempt` with a typed history list.
//! Legacy quirks (missing score, broken history, odd status strings) are
//! resolved here at the load boundary.
//!
//! Writes are guarded by a revision compare-and-set so a double submission
//! cannot silently overwrite a newer row. When a data path is configured, the
//! full row table is mirrored to a JSON snapshot after every write.

use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Attempt, AttemptState, AttemptStatus, HistoryEntry};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("attempt was modified concurrently (expected revision {expected:?}, found {found:?})")]
  Conflict { expected: Option<u64>, found: Option<u64> },
  #[error("failed to encode attempt history: {0}")]
  Encode(#[from] serde_json::Error),
}

/// Stored shape of an attempt. Fields are lenient so older snapshots still load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttemptRow {
  pub id: String,
  pub activity_id: String,
  pub user_id: String,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub question_count: Option<u32>,
  #[serde(default)]
  pub status: String,
  /// Absent on rows written before scores were tracked.
  #[serde(default, deserialize_with = "lenient_u32")]
  pub score: Option<u32>,
  /// JSON-encoded `Vec<HistoryEntry>`.
  #[serde(default)]
  pub history: Option<String>,
  #[serde(default)]
  pub revision: u64,
  #[serde(default)]
  pub time_modified: i64,
}

/// Accept numbers and numeric strings; anything else reads as absent.
fn lenient_u32<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
  D: Deserializer<'de>,
{
  let v = serde_json::Value::deserialize(de)?;
  Ok(match v {
    serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
    serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
    _ => None,
  })
}

impl AttemptRow {
  fn resolve(&self) -> Attempt {
    let history = match self.history.as_deref() {
      Some(raw) if !raw.trim().is_empty() => {
        serde_json::from_str::<Vec<HistoryEntry>>(raw).unwrap_or_else(|e| {
          warn!(target: "attempt", id = %self.id, error = %e, "Malformed history; treating as empty");
          Vec::new()
        })
      }
      _ => Vec::new(),
    };
    Attempt {
      question_count: self.question_count.unwrap_or(0),
      status: AttemptStatus::parse(&self.status),
      score: self.score.unwrap_or(0),
      history,
      revision: self.revision,
    }
  }
}

type Key = (String, String);

fn key(activity_id: &str, user_id: &str) -> Key {
  (activity_id.to_string(), user_id.to_string())
}

pub struct AttemptStore {
  rows: RwLock<HashMap<Key, AttemptRow>>,
  data_path: Option<PathBuf>,
}

impl AttemptStore {
  /// Purely in-memory store.
  pub fn in_memory() -> Self {
    Self { rows: RwLock::new(HashMap::new()), data_path: None }
  }

  /// Open a store mirrored to `data_path`. A missing file starts empty;
  /// an unreadable one is logged and also starts empty.
  #[instrument(level = "info", skip_all)]
  pub fn open(data_path: Option<PathBuf>) -> Self {
    let Some(path) = data_path else { return Self::in_memory() };
    let mut rows = HashMap::new();
    match std::fs::read_to_string(&path) {
      Ok(s) => match serde_json::from_str::<Vec<AttemptRow>>(&s) {
        Ok(list) => {
          for row in list {
            rows.insert(key(&row.activity_id, &row.user_id), row);
          }
          info!(target: "attempt", path = %path.display(), rows = rows.len(), "Loaded attempt snapshot");
        }
        Err(e) => error!(target: "attempt", path = %path.display(), error = %e, "Failed to parse attempt snapshot"),
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        info!(target: "attempt", path = %path.display(), "No attempt snapshot yet; starting empty");
      }
      Err(e) => error!(target: "attempt", path = %path.display(), error = %e, "Failed to read attempt snapshot"),
    }
    Self { rows: RwLock::new(rows), data_path: Some(path) }
  }

  /// Existing attempt or `None`; never creates a row.
  #[instrument(level = "debug", skip(self))]
  pub async fn load(&self, activity_id: &str, user_id: &str) -> Option<Attempt> {
    let rows = self.rows.read().await;
    rows.get(&key(activity_id, user_id)).map(AttemptRow::resolve)
  }

  pub async fn load_state(&self, activity_id: &str, user_id: &str) -> AttemptState {
    AttemptState::from_attempt(self.load(activity_id, user_id).await)
  }

  /// Upsert guarded by `expected_revision` (`None` = the row must not exist yet).
  /// Returns the attempt as persisted.
  #[instrument(level = "debug", skip(self, attempt), fields(count = attempt.question_count, status = attempt.status.as_str()))]
  pub async fn save(
    &self,
    activity_id: &str,
    user_id: &str,
    attempt: &Attempt,
    expected_revision: Option<u64>,
  ) -> Result<Attempt, StoreError> {
    let history = serde_json::to_string(&attempt.history)?;
    let mut rows = self.rows.write().await;
    let k = key(activity_id, user_id);

    let found = rows.get(&k).map(|r| r.revision);
    if found != expected_revision {
      warn!(target: "attempt", %activity_id, %user_id, ?expected_revision, ?found, "Revision mismatch on save");
      return Err(StoreError::Conflict { expected: expected_revision, found });
    }

    let id = rows.get(&k).map(|r| r.id.clone()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let row = AttemptRow {
      id,
      activity_id: activity_id.to_string(),
      user_id: user_id.to_string(),
      question_count: Some(attempt.question_count),
      status: attempt.status.as_str().to_string(),
      score: Some(attempt.score),
      history: Some(history),
      revision: found.map_or(1, |r| r + 1),
      time_modified: chrono::Utc::now().timestamp(),
    };
    let saved = row.resolve();
    rows.insert(k, row);
    debug!(target: "attempt", %activity_id, %user_id, revision = saved.revision, "Attempt saved");

    self.write_snapshot(&rows).await;
    Ok(saved)
  }

  /// Remove every attempt belonging to an activity. Returns how many rows went.
  #[instrument(level = "info", skip(self))]
  pub async fn delete_activity(&self, activity_id: &str) -> usize {
    let mut rows = self.rows.write().await;
    let before = rows.len();
    rows.retain(|(a, _), _| a != activity_id);
    let removed = before - rows.len();
    if removed > 0 {
      self.write_snapshot(&rows).await;
    }
    removed
  }

  async fn write_snapshot(&self, rows: &HashMap<Key, AttemptRow>) {
    let Some(path) = &self.data_path else { return };
    let mut list: Vec<&AttemptRow> = rows.values().collect();
    list.sort_by(|a, b| (&a.activity_id, &a.user_id).cmp(&(&b.activity_id, &b.user_id)));
    let body = match serde_json::to_vec_pretty(&list) {
      Ok(b) => b,
      Err(e) => {
        error!(target: "attempt", error = %e, "Failed to encode attempt snapshot");
        return;
      }
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
      if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!(target: "attempt", path = %dir.display(), error = %e, "Failed to create snapshot directory");
        return;
      }
    }
    if let Err(e) = tokio::fs::write(path, body).await {
      error!(target: "attempt", path = %path.display(), error = %e, "Failed to write attempt snapshot");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(q: &str, r: &str, ts: i64) -> HistoryEntry {
    HistoryEntry { question: q.into(), response: r.into(), timestamp: ts }
  }

  fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("yesno-attempts-{}.json", Uuid::new_v4()))
  }

  #[tokio::test]
  async fn absent_attempt_loads_as_none() {
    let store = AttemptStore::in_memory();
    assert!(store.load("a1", "u1").await.is_none());
    let state = store.load_state("a1", "u1").await;
    assert_eq!(state, AttemptState::default());
  }

  #[tokio::test]
  async fn save_then_load_preserves_everything_in_order() {
    let store = AttemptStore::in_memory();
    let attempt = Attempt {
      question_count: 3,
      status: AttemptStatus::Active,
      score: 0,
      history: vec![entry("Is it red?", "No", 1), entry("Is it big?", "Yes", 2), entry("Is it grey?", "Yes", 3)],
      revision: 0,
    };
    let saved = store.save("a1", "u1", &attempt, None).await.expect("save");
    assert_eq!(saved.revision, 1);

    let loaded = store.load("a1", "u1").await.expect("row");
    assert_eq!(loaded, saved);
    let questions: Vec<_> = loaded.history.iter().map(|h| h.question.as_str()).collect();
    assert_eq!(questions, ["Is it red?", "Is it big?", "Is it grey?"]);
    assert!(store.load("a1", "u2").await.is_none());
  }

  #[tokio::test]
  async fn stale_revision_is_rejected() {
    let store = AttemptStore::in_memory();
    let first = store.save("a1", "u1", &Attempt::default(), None).await.expect("insert");

    let err = store.save("a1", "u1", &Attempt::default(), None).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { expected: None, found: Some(1) }));

    let second = store.save("a1", "u1", &Attempt::default(), Some(first.revision)).await.expect("update");
    assert_eq!(second.revision, 2);
    let err = store.save("a1", "u1", &Attempt::default(), Some(first.revision)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { expected: Some(1), found: Some(2) }));
  }

  #[tokio::test]
  async fn delete_activity_only_drops_its_rows() {
    let store = AttemptStore::in_memory();
    store.save("a1", "u1", &Attempt::default(), None).await.expect("save");
    store.save("a1", "u2", &Attempt::default(), None).await.expect("save");
    store.save("a2", "u1", &Attempt::default(), None).await.expect("save");

    assert_eq!(store.delete_activity("a1").await, 2);
    assert!(store.load("a1", "u1").await.is_none());
    assert!(store.load("a2", "u1").await.is_some());
  }

  #[tokio::test]
  async fn legacy_rows_resolve_to_defaults() {
    let path = temp_path();
    let legacy = serde_json::json!([
      { "id": "r1", "activity_id": "a1", "user_id": "u1", "question_count": 2, "status": "active",
        "history": "{not json" },
      { "id": "r2", "activity_id": "a1", "user_id": "u2", "question_count": "4", "status": "win",
        "score": "n/a", "revision": 7 }
    ]);
    std::fs::write(&path, legacy.to_string()).expect("write legacy snapshot");

    let store = AttemptStore::open(Some(path.clone()));
    let a = store.load("a1", "u1").await.expect("u1 row");
    assert_eq!((a.question_count, a.score, a.status), (2, 0, AttemptStatus::Active));
    assert!(a.history.is_empty());

    let b = store.load_state("a1", "u2").await;
    assert_eq!((b.question_count, b.score, b.game_finished), (4, 0, true));
    assert_eq!(b.revision(), Some(7));

    let _ = std::fs::remove_file(path);
  }

  #[tokio::test]
  async fn snapshot_survives_reopen() {
    let path = temp_path();
    {
      let store = AttemptStore::open(Some(path.clone()));
      let attempt = Attempt {
        question_count: 1,
        status: AttemptStatus::Win,
        score: 20,
        history: vec![entry("banana", "Yes you have guessed the secret", 42)],
        revision: 0,
      };
      store.save("a1", "u1", &attempt, None).await.expect("save");
    }
    let reopened = AttemptStore::open(Some(path.clone()));
    let a = reopened.load("a1", "u1").await.expect("row");
    assert_eq!(a.status, AttemptStatus::Win);
    assert_eq!(a.score, 20);
    assert_eq!(a.history, vec![entry("banana", "Yes you have guessed the secret", 42)]);

    let _ = std::fs::remove_file(path);
  }
}
