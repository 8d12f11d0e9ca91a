//! Gradebook: where final scores land once a game reaches win or loss.
//!
//! The attempt row stays the source of truth; the gradebook is derived from it
//! and a failed write here never rolls the attempt back.

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::Activity;

pub trait GradeReporter {
  /// Record `score` for `user_id`. `false` means the grade was not stored.
  fn record(&self, activity: &Activity, user_id: &str, score: u32) -> impl Future<Output = bool> + Send;
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
  pub activity_id: String,
  pub user_id: String,
  pub score: u32,
  pub max_grade: u32,
  pub recorded_at: DateTime<Utc>,
}

/// In-memory gradebook keyed by (activity, user).
#[derive(Default)]
pub struct Gradebook {
  grades: RwLock<HashMap<(String, String), GradeEntry>>,
}

impl Gradebook {
  pub fn new() -> Self {
    Self::default()
  }

  /// Grades for one activity, ordered by user id.
  pub async fn grades_for(&self, activity_id: &str) -> Vec<GradeEntry> {
    let grades = self.grades.read().await;
    let mut out: Vec<GradeEntry> = grades
      .values()
      .filter(|g| g.activity_id == activity_id)
      .cloned()
      .collect();
    out.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    out
  }

  #[instrument(level = "info", skip(self))]
  pub async fn delete_activity(&self, activity_id: &str) -> usize {
    let mut grades = self.grades.write().await;
    let before = grades.len();
    grades.retain(|(a, _), _| a != activity_id);
    before - grades.len()
  }
}

impl GradeReporter for Gradebook {
  #[instrument(level = "info", skip(self, activity), fields(activity_id = %activity.id))]
  async fn record(&self, activity: &Activity, user_id: &str, score: u32) -> bool {
    if score > activity.max_grade {
      warn!(target: "attempt", %user_id, score, max_grade = activity.max_grade, "Refusing grade above maximum");
      return false;
    }
    let entry = GradeEntry {
      activity_id: activity.id.clone(),
      user_id: user_id.to_string(),
      score,
      max_grade: activity.max_grade,
      recorded_at: Utc::now(),
    };
    self
      .grades
      .write()
      .await
      .insert((activity.id.clone(), user_id.to_string()), entry);
    info!(target: "attempt", %user_id, score, "Grade recorded");
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::seed_activities;

  #[tokio::test]
  async fn record_and_list_grades() {
    let activity = seed_activities().remove(0);
    let book = Gradebook::new();
    assert!(book.record(&activity, "u2", 3).await);
    assert!(book.record(&activity, "u1", 5).await);
    assert!(!book.record(&activity, "u3", activity.max_grade + 1).await);

    let grades = book.grades_for(&activity.id).await;
    let users: Vec<_> = grades.iter().map(|g| g.user_id.as_str()).collect();
    assert_eq!(users, ["u1", "u2"]);
    assert_eq!(grades[0].score, 5);

    assert_eq!(book.delete_activity(&activity.id).await, 2);
    assert!(book.grades_for(&activity.id).await.is_empty());
  }
}
