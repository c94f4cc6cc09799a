//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Handlers translate their wire input into these calls and render the
//! resulting `SessionView`; nothing here knows about the transport.

use tracing::{info, instrument};

use crate::protocol::{bank_summaries, to_view, BankSummary, SessionView};
use crate::session::Action;
use crate::state::{AppState, StateError};

#[instrument(level = "info", skip(state))]
pub async fn open_session(state: &AppState, requested: Option<String>) -> SessionView {
  let (id, ctrl) = state.open_session(requested).await;
  to_view(&id, &ctrl)
}

pub async fn get_session(state: &AppState, session_id: &str) -> Result<SessionView, StateError> {
  let ctrl = state.session(session_id).await?;
  Ok(to_view(session_id, &ctrl))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn apply_action(state: &AppState, session_id: &str, action: Action) -> Result<SessionView, StateError> {
  let ctrl = state.apply(session_id, action.clone()).await?;
  let view = to_view(session_id, &ctrl);
  if matches!(action, Action::Submit) {
    info!(target: "quiz", session = %session_id, correct = ?view.was_correct, score = view.score, total = view.total, "Answer evaluated");
  }
  Ok(view)
}

/// Whether loading has finished, and the picker entries.
pub async fn list_banks(state: &AppState) -> (bool, Vec<BankSummary>) {
  match state.banks().await {
    Some(banks) => (true, bank_summaries(&banks)),
    None => (false, Vec::new()),
  }
}
