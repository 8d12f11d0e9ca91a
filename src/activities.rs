//! Activity registry: the configured games, created from config, seeds or the admin API.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{ActivityCfg, ActivityDefaults};
use crate::domain::Activity;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActivityError {
  #[error("unknown activity: {0}")]
  NotFound(String),
  #[error("activity already exists: {0}")]
  Duplicate(String),
  #[error("invalid activity: {0}")]
  Invalid(String),
}

/// Fields an author supplies; anything left `None` takes the configured default.
#[derive(Clone, Debug, Default)]
pub struct ActivityDraft {
  pub id: Option<String>,
  pub name: String,
  pub intro: String,
  pub secret: String,
  pub system_prompt: Option<String>,
  pub max_questions: Option<u32>,
  pub max_grade: Option<u32>,
  pub max_characters: Option<u32>,
  pub clue: String,
}

impl From<ActivityCfg> for ActivityDraft {
  fn from(c: ActivityCfg) -> Self {
    Self {
      id: c.id,
      name: c.name,
      intro: c.intro,
      secret: c.secret,
      system_prompt: c.system_prompt,
      max_questions: c.max_questions,
      max_grade: c.max_grade,
      max_characters: c.max_characters,
      clue: c.clue,
    }
  }
}

/// Apply defaults and check invariants.
pub fn build_activity(id: String, draft: ActivityDraft, defaults: &ActivityDefaults) -> Result<Activity, ActivityError> {
  let name = draft.name.trim().to_string();
  if name.is_empty() {
    return Err(ActivityError::Invalid("name must not be empty".into()));
  }
  if name.chars().count() > 255 {
    return Err(ActivityError::Invalid("name must be at most 255 characters".into()));
  }
  let secret = draft.secret.trim().to_string();
  if secret.is_empty() {
    return Err(ActivityError::Invalid("secret must not be empty".into()));
  }
  let max_questions = draft.max_questions.unwrap_or(defaults.max_questions);
  if max_questions == 0 {
    return Err(ActivityError::Invalid("max_questions must be greater than zero".into()));
  }
  let max_characters = draft.max_characters.unwrap_or(defaults.max_characters);
  if max_characters == 0 {
    return Err(ActivityError::Invalid("max_characters must be greater than zero".into()));
  }
  let system_prompt = match draft.system_prompt {
    Some(p) if !p.trim().is_empty() => p,
    _ => defaults.prompt.clone(),
  };

  Ok(Activity {
    id,
    name,
    intro: draft.intro,
    secret,
    system_prompt,
    max_questions,
    max_grade: draft.max_grade.unwrap_or(defaults.max_grade),
    max_characters,
    clue: draft.clue,
  })
}

/// Index activities by id, keeping the first of each id. Returns the ids that were dropped.
fn index_by_id(activities: Vec<Activity>) -> (HashMap<String, Activity>, Vec<String>) {
  let mut by_id = HashMap::new();
  let mut skipped = Vec::new();
  for a in activities {
    if by_id.contains_key(&a.id) {
      skipped.push(a.id);
      continue;
    }
    by_id.insert(a.id.clone(), a);
  }
  (by_id, skipped)
}

pub struct ActivityRegistry {
  by_id: RwLock<HashMap<String, Activity>>,
  defaults: ActivityDefaults,
}

impl ActivityRegistry {
  /// Pre-populated registry. Earlier entries win on id collisions.
  pub fn with_activities(defaults: ActivityDefaults, activities: Vec<Activity>) -> Self {
    let (by_id, skipped) = index_by_id(activities);
    for id in &skipped {
      warn!(target: "yesno_backend", %id, "Skipping activity with duplicate id");
    }
    Self { by_id: RwLock::new(by_id), defaults }
  }

  #[instrument(level = "info", skip(self, draft), fields(name = %draft.name))]
  pub async fn create(&self, draft: ActivityDraft) -> Result<Activity, ActivityError> {
    let id = draft.id.clone().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let activity = build_activity(id, draft, &self.defaults)?;
    let mut by_id = self.by_id.write().await;
    if by_id.contains_key(&activity.id) {
      return Err(ActivityError::Duplicate(activity.id));
    }
    by_id.insert(activity.id.clone(), activity.clone());
    info!(target: "yesno_backend", id = %activity.id, max_questions = activity.max_questions, max_grade = activity.max_grade, "Activity created");
    Ok(activity)
  }

  pub async fn get(&self, id: &str) -> Option<Activity> {
    self.by_id.read().await.get(id).cloned()
  }

  /// All activities, ordered by name.
  pub async fn list(&self) -> Vec<Activity> {
    let mut out: Vec<Activity> = self.by_id.read().await.values().cloned().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    out
  }

  #[instrument(level = "info", skip(self, draft))]
  pub async fn update(&self, id: &str, draft: ActivityDraft) -> Result<Activity, ActivityError> {
    let mut by_id = self.by_id.write().await;
    if !by_id.contains_key(id) {
      return Err(ActivityError::NotFound(id.to_string()));
    }
    let activity = build_activity(id.to_string(), draft, &self.defaults)?;
    by_id.insert(id.to_string(), activity.clone());
    Ok(activity)
  }

  /// Remove an activity. Attempts and grades are dropped by the caller.
  #[instrument(level = "info", skip(self))]
  pub async fn remove(&self, id: &str) -> Result<Activity, ActivityError> {
    self
      .by_id
      .write()
      .await
      .remove(id)
      .ok_or_else(|| ActivityError::NotFound(id.to_string()))
  }
}
