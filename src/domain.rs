//! Domain models: activities, attempts, conversation history and evaluation results.

use serde::{Deserialize, Serialize};

/// A configured twenty-questions activity. Read-only to the submission flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activity {
  pub id: String,
  pub name: String,
  pub intro: String,
  /// The hidden word students must find.
  pub secret: String,
  /// Prompt sent to the oracle; `{{target_word}}` is replaced by the secret.
  pub system_prompt: String,
  pub max_questions: u32,
  pub max_grade: u32,
  pub max_characters: u32,
  pub clue: String,
}

/// Where a game stands for one student.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
  #[default]
  Active,
  Win,
  Loss,
}

impl AttemptStatus {
  /// Win and loss are absorbing: no further submissions are accepted.
  pub fn is_terminal(self) -> bool {
    matches!(self, AttemptStatus::Win | AttemptStatus::Loss)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      AttemptStatus::Active => "active",
      AttemptStatus::Win => "win",
      AttemptStatus::Loss => "loss",
    }
  }

  /// Unknown strings resolve to `Active`; rows only ever carry the three known values.
  pub fn parse(s: &str) -> Self {
    match s {
      "win" => AttemptStatus::Win,
      "loss" => AttemptStatus::Loss,
      _ => AttemptStatus::Active,
    }
  }
}

/// One question/response exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub question: String,
  pub response: String,
  /// Unix seconds.
  pub timestamp: i64,
}

/// Per-(activity, user) game state as the rest of the app sees it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attempt {
  pub question_count: u32,
  pub status: AttemptStatus,
  pub score: u32,
  pub history: Vec<HistoryEntry>,
  /// Bumped on every save; used for compare-and-set.
  pub revision: u64,
}

/// Snapshot handed to the coordinator: the attempt (if any) plus derived fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttemptState {
  pub attempt: Option<Attempt>,
  pub question_count: u32,
  pub score: u32,
  pub game_finished: bool,
}

impl AttemptState {
  pub fn from_attempt(attempt: Option<Attempt>) -> Self {
    match attempt {
      Some(a) => Self {
        question_count: a.question_count,
        score: a.score,
        game_finished: a.status.is_terminal(),
        attempt: Some(a),
      },
      None => Self::default(),
    }
  }

  pub fn status(&self) -> AttemptStatus {
    self.attempt.as_ref().map(|a| a.status).unwrap_or_default()
  }

  pub fn revision(&self) -> Option<u64> {
    self.attempt.as_ref().map(|a| a.revision)
  }
}

/// A question that already names the secret, bypassing the oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchResult {
  /// The whole question equals the secret.
  Exact,
  /// The secret appears somewhere in the question.
  Contains,
}

impl MatchResult {
  pub fn response_text(self) -> &'static str {
    match self {
      MatchResult::Exact => "Yes you have guessed the secret",
      MatchResult::Contains => "You have found the secret!",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreOutcome {
  pub score: u32,
  pub status: AttemptStatus,
}
