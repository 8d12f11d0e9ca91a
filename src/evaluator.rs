//! Answer evaluation: direct-match shortcut, oracle prompt construction and scoring.
//!
//! Everything here is pure; the coordinator in `logic.rs` wires it to the store,
//! the oracle and the gradebook.

use crate::domain::{AttemptStatus, MatchResult, ScoreOutcome};
use crate::util::contains_ci;

/// Placeholder replaced by the secret inside an activity's prompt template.
pub const TARGET_WORD_PLACEHOLDER: &str = "{{target_word}}";

const QUESTION_PREFIX: &str = "Student question";

/// Exact (trimmed, case-insensitive) equality takes precedence over containment.
pub fn direct_match(question: &str, secret: &str) -> Option<MatchResult> {
  let q = question.trim();
  if q.to_lowercase() == secret.to_lowercase() {
    return Some(MatchResult::Exact);
  }
  if contains_ci(q, secret) {
    return Some(MatchResult::Contains);
  }
  None
}

/// Substitute the secret and append the question verbatim (no escaping).
pub fn build_prompt(template: &str, secret: &str, question: &str) -> String {
  let with_secret = template.replace(TARGET_WORD_PLACEHOLDER, secret);
  format!("{}\n\n{}: {}", with_secret, QUESTION_PREFIX, question)
}

/// Score a single exchange.
///
/// `current_question` is 1-based and counts the exchange being scored.
/// Correctness is `already_correct` or the secret appearing anywhere in the
/// oracle's reply. The containment check also fires on replies such as
/// "No, it is not a banana".
pub fn score_attempt(
  max_grade: u32,
  max_questions: u32,
  oracle_response: &str,
  secret: &str,
  current_question: u32,
  already_correct: bool,
) -> ScoreOutcome {
  let correct = already_correct || contains_ci(oracle_response, secret);
  if correct {
    let penalty = current_question.saturating_sub(1);
    return ScoreOutcome { score: max_grade.saturating_sub(penalty), status: AttemptStatus::Win };
  }
  if current_question >= max_questions {
    return ScoreOutcome { score: 0, status: AttemptStatus::Loss };
  }
  ScoreOutcome { score: 0, status: AttemptStatus::Active }
}

/// Why a question was refused before reaching the game.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuestionProblem {
  #[error("Question is empty")]
  Empty,
  #[error("Question is too long ({actual} characters, limit {max})")]
  TooLong { max: u32, actual: usize },
}

pub fn validate_question(question: &str, max_characters: u32) -> Result<(), QuestionProblem> {
  if question.trim().is_empty() {
    return Err(QuestionProblem::Empty);
  }
  let actual = question.chars().count();
  if actual > max_characters as usize {
    return Err(QuestionProblem::TooLong { max: max_characters, actual });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exact_match_ignores_case_and_padding() {
    assert_eq!(direct_match("Banana", "banana"), Some(MatchResult::Exact));
    assert_eq!(direct_match("  BANANA \n", "banana"), Some(MatchResult::Exact));
  }

  #[test]
  fn containment_match_inside_sentence() {
    assert_eq!(
      direct_match("I think it's a banana split", "banana"),
      Some(MatchResult::Contains)
    );
    assert_eq!(direct_match("apple", "banana"), None);
  }

  #[test]
  fn canned_responses_differ_by_match_kind() {
    assert_eq!(MatchResult::Exact.response_text(), "Yes you have guessed the secret");
    assert_eq!(MatchResult::Contains.response_text(), "You have found the secret!");
  }

  #[test]
  fn prompt_substitutes_every_placeholder_and_appends_question() {
    let tpl = "Secret: {{target_word}}. Never say {{target_word}}.";
    let prompt = build_prompt(tpl, "elephant", "Is it grey?");
    assert_eq!(
      prompt,
      "Secret: elephant. Never say elephant.\n\nStudent question: Is it grey?"
    );
  }

  #[test]
  fn first_question_correct_gets_full_grade() {
    let out = score_attempt(100, 20, "Yes, it is banana", "banana", 1, false);
    assert_eq!(out, ScoreOutcome { score: 100, status: AttemptStatus::Win });
  }

  #[test]
  fn correct_score_drops_by_one_per_question_and_never_goes_negative() {
    let mut previous = u32::MAX;
    for n in 1..=20 {
      let out = score_attempt(5, 20, "", "banana", n, true);
      assert_eq!(out.status, AttemptStatus::Win);
      assert_eq!(out.score, 5u32.saturating_sub(n - 1));
      assert!(out.score <= previous);
      previous = out.score;
    }
  }

  #[test]
  fn last_question_without_secret_is_a_loss() {
    let out = score_attempt(100, 5, "No.", "elephant", 5, false);
    assert_eq!(out, ScoreOutcome { score: 0, status: AttemptStatus::Loss });
  }

  #[test]
  fn undecided_question_stays_active_with_zero_score() {
    let out = score_attempt(100, 5, "No.", "elephant", 2, false);
    assert_eq!(out, ScoreOutcome { score: 0, status: AttemptStatus::Active });
  }

  #[test]
  fn negative_reply_naming_the_secret_still_counts() {
    let out = score_attempt(10, 5, "No, it is not an Elephant", "elephant", 3, false);
    assert_eq!(out, ScoreOutcome { score: 8, status: AttemptStatus::Win });
  }

  #[test]
  fn question_validation() {
    assert_eq!(validate_question("   ", 10), Err(QuestionProblem::Empty));
    assert_eq!(
      validate_question("Is it big?", 5),
      Err(QuestionProblem::TooLong { max: 5, actual: 10 })
    );
    assert!(validate_question("Is it big?", 10).is_ok());
  }
}
