//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::activities::ActivityDraft;
use crate::domain::{Activity, AttemptState, AttemptStatus, HistoryEntry, MatchResult};
use crate::logic::{Submission, Verdict};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetAttempt {
        #[serde(rename = "activityId")]
        activity_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },
    SubmitQuestion {
        #[serde(rename = "activityId")]
        activity_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        question: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Attempt {
        attempt: AttemptOut,
    },
    QuestionResult {
        result: SubmitOut,
    },
    Error {
        message: String,
    },
}

/// Student-facing view of an activity. The secret is never included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOut {
    pub id: String,
    pub name: String,
    pub intro: String,
    pub max_questions: u32,
    pub max_grade: u32,
    pub max_characters: u32,
    pub clue: String,
}

pub fn activity_out(a: &Activity) -> ActivityOut {
    ActivityOut {
        id: a.id.clone(),
        name: a.name.clone(),
        intro: a.intro.clone(),
        max_questions: a.max_questions,
        max_grade: a.max_grade,
        max_characters: a.max_characters,
        clue: a.clue.clone(),
    }
}

/// Authoring payload for create/update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityIn {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub intro: String,
    pub secret: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_questions: Option<u32>,
    #[serde(default)]
    pub max_grade: Option<u32>,
    #[serde(default)]
    pub max_characters: Option<u32>,
    #[serde(default)]
    pub clue: String,
}

impl From<ActivityIn> for ActivityDraft {
    fn from(a: ActivityIn) -> Self {
        ActivityDraft {
            id: a.id,
            name: a.name,
            intro: a.intro,
            secret: a.secret,
            system_prompt: a.system_prompt,
            max_questions: a.max_questions,
            max_grade: a.max_grade,
            max_characters: a.max_characters,
            clue: a.clue,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOut {
    pub activity_id: String,
    pub user_id: String,
    pub question_count: u32,
    pub max_questions: u32,
    pub remaining: u32,
    pub status: AttemptStatus,
    pub score: u32,
    pub max_grade: u32,
    pub game_finished: bool,
    pub history: Vec<HistoryEntry>,
}

pub fn attempt_out(activity: &Activity, user_id: &str, state: &AttemptState) -> AttemptOut {
    AttemptOut {
        activity_id: activity.id.clone(),
        user_id: user_id.to_string(),
        question_count: state.question_count,
        max_questions: activity.max_questions,
        remaining: activity.max_questions.saturating_sub(state.question_count),
        status: state.status(),
        score: state.score,
        max_grade: activity.max_grade,
        game_finished: state.game_finished,
        history: state.attempt.as_ref().map(|a| a.history.clone()).unwrap_or_default(),
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Answered,
    Finished,
    Rejected,
    OracleFailed,
    Conflict,
    StorageFailed,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectMatchOut {
    Exact,
    Contains,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub verdict: VerdictKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_match: Option<DirectMatchOut>,
    pub attempt: AttemptOut,
}

/// Convert a coordinator result to the public DTO.
pub fn submit_out(activity: &Activity, user_id: &str, s: &Submission) -> SubmitOut {
    let (verdict, message, response, direct_match) = match &s.verdict {
        Verdict::Answered { response, direct } => {
            let message = match s.state.status() {
                AttemptStatus::Win => "You found the secret!".to_string(),
                AttemptStatus::Loss => "No questions left.".to_string(),
                AttemptStatus::Active => String::new(),
            };
            let direct = direct.map(|m| match m {
                MatchResult::Exact => DirectMatchOut::Exact,
                MatchResult::Contains => DirectMatchOut::Contains,
            });
            (VerdictKind::Answered, message, Some(response.clone()), direct)
        }
        Verdict::Finished => (
            VerdictKind::Finished,
            "You have reached the maximum number of questions.".to_string(),
            None,
            None,
        ),
        Verdict::Rejected(problem) => (VerdictKind::Rejected, problem.to_string(), None, None),
        Verdict::OracleFailed(e) => (
            VerdictKind::OracleFailed,
            format!("Error getting response: {}", e),
            None,
            None,
        ),
        Verdict::Conflict => (
            VerdictKind::Conflict,
            "Another question was submitted at the same time; please try again.".to_string(),
            None,
            None,
        ),
        Verdict::StorageFailed(e) => (VerdictKind::StorageFailed, e.clone(), None, None),
    };
    SubmitOut {
        verdict,
        message,
        response,
        direct_match,
        attempt: attempt_out(activity, user_id, &s.state),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct AttemptQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct QuestionIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub question: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub oracle: bool,
}
