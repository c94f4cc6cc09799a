//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::protocol::*;
use crate::session::{Action, SessionError};
use crate::state::{AppState, StateError};
use crate::logic::*;

type ApiResult = Result<Json<SessionView>, (StatusCode, Json<ErrorOut>)>;

/// Status code for a failed session operation.
pub fn status_for(e: &StateError) -> StatusCode {
  match e {
    StateError::UnknownSession(_) => StatusCode::NOT_FOUND,
    StateError::Session(SessionError::InvalidSelection(_)) => StatusCode::NOT_FOUND,
    StateError::Session(SessionError::NotReady) => StatusCode::SERVICE_UNAVAILABLE,
    StateError::Session(SessionError::OptionOutOfRange { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
    StateError::Session(_) => StatusCode::CONFLICT,
  }
}

fn to_api(r: Result<SessionView, StateError>) -> ApiResult {
  r.map(Json).map_err(|e| (status_for(&e), Json(ErrorOut { error: e.to_string() })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, banks_loaded: state.banks().await.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_banks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (loaded, banks) = list_banks(&state).await;
  Json(BanksOut { loaded, banks })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_open_session(
  State(state): State<Arc<AppState>>,
  body: Option<Json<OpenSessionIn>>,
) -> impl IntoResponse {
  let requested = body.and_then(|Json(b)| b.session_id);
  let view = open_session(&state, requested).await;
  info!(target: "quiz", session = %view.session_id, phase = view.phase, "HTTP session opened");
  Json(view)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
  to_api(get_session(&state, &id).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_close_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
  if state.close_session(&id).await { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}

#[instrument(level = "info", skip(state, body), fields(quiz_id = %body.quiz_id))]
pub async fn http_select_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SelectQuizIn>,
) -> ApiResult {
  to_api(apply_action(&state, &id, Action::SelectQuiz(body.quiz_id)).await)
}

#[instrument(level = "info", skip(state, body), fields(index = body.index))]
pub async fn http_select_option(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SelectOptionIn>,
) -> ApiResult {
  to_api(apply_action(&state, &id, Action::SelectOption(body.index)).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_submit(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
  to_api(apply_action(&state, &id, Action::Submit).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_advance(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
  to_api(apply_action(&state, &id, Action::Advance).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_restart(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
  to_api(apply_action(&state, &id, Action::Restart).await)
}
