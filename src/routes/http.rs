//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::activities::ActivityError;
use crate::logic::{attempt_for, delete_activity, submit_question};
use crate::protocol::*;
use crate::state::AppState;

fn error_response(e: ActivityError) -> Response {
  let status = match e {
    ActivityError::NotFound(_) => StatusCode::NOT_FOUND,
    ActivityError::Duplicate(_) => StatusCode::CONFLICT,
    ActivityError::Invalid(_) => StatusCode::BAD_REQUEST,
  };
  (status, Json(ErrorOut { error: e.to_string() })).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, oracle: state.openai.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_activities(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let list: Vec<ActivityOut> = state.activities.list().await.iter().map(activity_out).collect();
  Json(list)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_activity(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  match state.activities.get(&id).await {
    Some(a) => Json(activity_out(&a)).into_response(),
    None => error_response(ActivityError::NotFound(id)),
  }
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_create_activity(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ActivityIn>,
) -> Response {
  match state.activities.create(body.into()).await {
    Ok(a) => (StatusCode::CREATED, Json(activity_out(&a))).into_response(),
    Err(e) => error_response(e),
  }
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_update_activity(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ActivityIn>,
) -> Response {
  match state.activities.update(&id, body.into()).await {
    Ok(a) => Json(activity_out(&a)).into_response(),
    Err(e) => error_response(e),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_activity(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  match delete_activity(&state, &id).await {
    Ok(_) => StatusCode::NO_CONTENT.into_response(),
    Err(e) => error_response(e),
  }
}

#[instrument(level = "info", skip(state), fields(user_id = %q.user_id))]
pub async fn http_get_attempt(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Query(q): Query<AttemptQuery>,
) -> Response {
  match attempt_for(&state, &id, &q.user_id).await {
    Ok((activity, attempt)) => Json(attempt_out(&activity, &q.user_id, &attempt)).into_response(),
    Err(e) => error_response(e),
  }
}

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id, question_len = body.question.len()))]
pub async fn http_post_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<QuestionIn>,
) -> Response {
  let (activity, submission) = match submit_question(&state, &id, &body.user_id, &body.question).await {
    Ok(r) => r,
    Err(e) => return error_response(e),
  };
  let out = submit_out(&activity, &body.user_id, &submission);
  let status = match out.verdict {
    VerdictKind::Answered | VerdictKind::Finished => StatusCode::OK,
    VerdictKind::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
    VerdictKind::OracleFailed => StatusCode::BAD_GATEWAY,
    VerdictKind::Conflict => StatusCode::CONFLICT,
    VerdictKind::StorageFailed => StatusCode::INTERNAL_SERVER_ERROR,
  };
  info!(target: "attempt", activity_id = %id, verdict = ?out.verdict, count = out.attempt.question_count, "HTTP question handled");
  (status, Json(out)).into_response()
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_grades(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  if state.activities.get(&id).await.is_none() {
    return error_response(ActivityError::NotFound(id));
  }
  Json(state.gradebook.grades_for(&id).await).into_response()
}
