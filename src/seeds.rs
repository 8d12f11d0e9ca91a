//! Seed data: built-in activities so the service is playable without external config.

use crate::config::ActivityDefaults;
use crate::domain::Activity;

/// Minimal set of built-in activities. Ids are stable so clients can bookmark them.
pub fn seed_activities() -> Vec<Activity> {
  let defaults = ActivityDefaults::default();
  vec![
    Activity {
      id: "fruit".into(),
      name: "Guess the fruit".into(),
      intro: "Ask yes/no questions to find the hidden fruit.".into(),
      secret: "banana".into(),
      system_prompt: defaults.prompt.clone(),
      max_questions: defaults.max_questions,
      max_grade: defaults.max_grade,
      max_characters: defaults.max_characters,
      clue: "It grows in bunches.".into(),
    },
    Activity {
      id: "animal".into(),
      name: "Guess the animal".into(),
      intro: "Ask yes/no questions to find the hidden animal.".into(),
      secret: "elephant".into(),
      system_prompt: defaults.prompt,
      max_questions: 5,
      max_grade: 20,
      max_characters: defaults.max_characters,
      clue: String::new(),
    },
  ]
}
