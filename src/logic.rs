//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - The submission coordinator (guard → direct match / oracle → score → persist → grade)
//!   - Attempt lookups for the attempt view
//!   - Activity deletion with cascade to attempts and grades
//!
//! The coordinator never fails outright: every outcome is a `Verdict` paired
//! with the attempt state the caller should show next.

use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::activities::ActivityError;
use crate::domain::{Activity, Attempt, AttemptState, HistoryEntry, MatchResult};
use crate::evaluator::{build_prompt, direct_match, score_attempt, validate_question, QuestionProblem};
use crate::gradebook::GradeReporter;
use crate::oracle::{Oracle, OracleError, PURPOSE_TWENTY_QUESTIONS};
use crate::state::AppState;
use crate::store::{AttemptStore, StoreError};
use crate::util::trunc_for_log;

/// Who is asking. Passed explicitly into every core operation.
#[derive(Clone, Copy, Debug)]
pub struct SubmissionContext<'a> {
  pub user_id: &'a str,
}

#[derive(Debug)]
pub enum Verdict {
  /// The question was answered and recorded.
  Answered { response: String, direct: Option<MatchResult> },
  /// Game already won/lost or no questions left; nothing changed.
  Finished,
  /// The question itself was unacceptable; nothing changed.
  Rejected(QuestionProblem),
  /// The oracle failed; nothing changed and the student may ask again.
  OracleFailed(String),
  /// Another submission for the same attempt landed first.
  Conflict,
  StorageFailed(String),
}

#[derive(Debug)]
pub struct Submission {
  pub state: AttemptState,
  pub verdict: Verdict,
}

/// Ties the store, the oracle and the grade reporter together for one submission.
pub struct Coordinator<'a, O, G> {
  pub store: &'a AttemptStore,
  pub oracle: &'a O,
  pub grades: &'a G,
  pub oracle_timeout: Duration,
}

impl<'a, O: Oracle, G: GradeReporter> Coordinator<'a, O, G> {
  #[instrument(level = "info", skip(self, activity, state, question), fields(activity_id = %activity.id, user_id = %ctx.user_id, count = state.question_count))]
  pub async fn handle_submission(
    &self,
    ctx: SubmissionContext<'_>,
    activity: &Activity,
    state: AttemptState,
    question: &str,
  ) -> Submission {
    if state.question_count >= activity.max_questions || state.game_finished {
      warn!(target: "attempt", status = state.status().as_str(), "Max questions reached; submission ignored");
      return Submission { state, verdict: Verdict::Finished };
    }
    if let Err(problem) = validate_question(question, activity.max_characters) {
      info!(target: "attempt", %problem, "Question rejected");
      return Submission { state, verdict: Verdict::Rejected(problem) };
    }

    let (response, direct) = match direct_match(question, &activity.secret) {
      Some(m) => {
        info!(target: "attempt", kind = ?m, "Direct match");
        (m.response_text().to_string(), Some(m))
      }
      None => match self.ask_oracle(activity, question).await {
        Ok(text) => (text, None),
        Err(e) => {
          error!(target: "attempt", error = %e, "Oracle failed; attempt left untouched");
          return Submission { state, verdict: Verdict::OracleFailed(e.to_string()) };
        }
      },
    };

    let mut history = state.attempt.as_ref().map(|a| a.history.clone()).unwrap_or_default();
    history.push(HistoryEntry {
      question: question.to_string(),
      response: response.clone(),
      timestamp: chrono::Utc::now().timestamp(),
    });
    let current_question = u32::try_from(history.len()).unwrap_or(u32::MAX);
    let outcome = score_attempt(
      activity.max_grade,
      activity.max_questions,
      &response,
      &activity.secret,
      current_question,
      direct.is_some(),
    );

    let attempt = Attempt {
      question_count: state.question_count + 1,
      status: outcome.status,
      score: outcome.score,
      history,
      revision: state.revision().unwrap_or(0),
    };
    match self.store.save(&activity.id, ctx.user_id, &attempt, state.revision()).await {
      Ok(saved) => {
        info!(target: "attempt", count = saved.question_count, status = saved.status.as_str(), score = saved.score, "Attempt updated");
      }
      Err(StoreError::Conflict { .. }) => {
        let fresh = self.store.load_state(&activity.id, ctx.user_id).await;
        return Submission { state: fresh, verdict: Verdict::Conflict };
      }
      Err(e) => {
        error!(target: "attempt", error = %e, "Failed to save attempt");
        return Submission { state, verdict: Verdict::StorageFailed(e.to_string()) };
      }
    }

    if outcome.status.is_terminal() && !self.grades.record(activity, ctx.user_id, outcome.score).await {
      warn!(target: "attempt", score = outcome.score, "Gradebook update failed; attempt kept");
    }

    let fresh = self.store.load_state(&activity.id, ctx.user_id).await;
    Submission { state: fresh, verdict: Verdict::Answered { response, direct } }
  }

  async fn ask_oracle(&self, activity: &Activity, question: &str) -> Result<String, OracleError> {
    let prompt = build_prompt(&activity.system_prompt, &activity.secret, question);
    let text = tokio::time::timeout(self.oracle_timeout, self.oracle.request(&prompt, PURPOSE_TWENTY_QUESTIONS))
      .await
      .map_err(|_| OracleError::Timeout(self.oracle_timeout))??;
    if text.trim().is_empty() {
      return Err(OracleError::Empty);
    }
    info!(target: "attempt", reply = %trunc_for_log(&text, 80), "Oracle answered");
    Ok(text)
  }
}

/// Load the activity and the caller's attempt, then run the coordinator with the app's collaborators.
#[instrument(level = "info", skip(app, question), fields(%activity_id, %user_id, question_len = question.len()))]
pub async fn submit_question(
  app: &AppState,
  activity_id: &str,
  user_id: &str,
  question: &str,
) -> Result<(Activity, Submission), ActivityError> {
  let _gate = app.lifecycle.read().await;
  let activity = app
    .activities
    .get(activity_id)
    .await
    .ok_or_else(|| ActivityError::NotFound(activity_id.to_string()))?;
  let state = app.attempts.load_state(activity_id, user_id).await;
  let coordinator = Coordinator {
    store: &app.attempts,
    oracle: &app.openai,
    grades: &app.gradebook,
    oracle_timeout: app.oracle_timeout,
  };
  let submission = coordinator
    .handle_submission(SubmissionContext { user_id }, &activity, state, question)
    .await;
  Ok((activity, submission))
}

#[instrument(level = "debug", skip(app))]
pub async fn attempt_for(app: &AppState, activity_id: &str, user_id: &str) -> Result<(Activity, AttemptState), ActivityError> {
  let activity = app
    .activities
    .get(activity_id)
    .await
    .ok_or_else(|| ActivityError::NotFound(activity_id.to_string()))?;
  let state = app.attempts.load_state(activity_id, user_id).await;
  Ok((activity, state))
}

/// Delete an activity together with its attempts and grades.
#[instrument(level = "info", skip(app))]
pub async fn delete_activity(app: &AppState, activity_id: &str) -> Result<Activity, ActivityError> {
  let _gate = app.lifecycle.write().await;
  let activity = app.activities.remove(activity_id).await?;
  let attempts = app.attempts.delete_activity(activity_id).await;
  let grades = app.gradebook.delete_activity(activity_id).await;
  info!(target: "yesno_backend", %activity_id, attempts, grades, "Activity deleted");
  Ok(activity)
}
