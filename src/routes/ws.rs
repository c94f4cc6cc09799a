//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! A connection drives at most one session at a time; `open_session` binds it.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::session::Action;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "study_tool", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "study_tool", "WebSocket connected");
  let mut session_id: Option<String> = None;
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "study_tool", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut session_id).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "study_tool", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  // The session stays live so the client can resume it after reconnecting.
  info!(target: "study_tool", session = ?session_id, "WebSocket disconnected");
}

/// Map one client message to its reply. Session actions require a prior
/// `open_session` on this connection.
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session_id: &mut Option<String>) -> ServerWsMessage {
  let action = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,

    ClientWsMessage::OpenSession { session_id: requested } => {
      let view = open_session(state, requested).await;
      info!(target: "quiz", session = %view.session_id, phase = view.phase, "WS session opened");
      *session_id = Some(view.session_id.clone());
      return ServerWsMessage::Session { session: view };
    }

    ClientWsMessage::ListBanks => {
      let (_, banks) = list_banks(state).await;
      return ServerWsMessage::Banks { banks };
    }

    ClientWsMessage::SelectQuiz { quiz_id } => Action::SelectQuiz(quiz_id),
    ClientWsMessage::SelectOption { index } => Action::SelectOption(index),
    ClientWsMessage::Submit => Action::Submit,
    ClientWsMessage::Advance => Action::Advance,
    ClientWsMessage::Restart => Action::Restart,
  };

  let Some(id) = session_id.as_deref() else {
    return ServerWsMessage::Error { message: "No session: send open_session first.".into() };
  };
  match apply_action(state, id, action).await {
    Ok(view) => ServerWsMessage::Session { session: view },
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}
