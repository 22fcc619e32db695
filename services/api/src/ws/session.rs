//! Manages the WebSocket connection lifecycle of a live voice session.

use super::{
    protocol::ServerMessage,
    provider,
    relay::{self, RelayError, RelayTiming},
};
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, StreamExt};
use std::{fmt::Display, sync::Arc};
use taskvoice_core::{
    instruction::render_system_instruction, sink::DraftSink, task_draft::TaskDraft,
};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Runs one live session on an upgraded connection.
///
/// The system instruction is rendered against the glossary as it is right
/// now, so glossary edits apply to the next session without a restart.
#[instrument(name = "live_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("session_id", session_id.as_str());
    info!("New live WebSocket connection.");

    let (socket_tx, socket_rx) = socket.split();

    let glossary = Arc::clone(&state.glossary);
    let glossary_rules = tokio::task::spawn_blocking(move || glossary.formatted_rules())
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read glossary; starting without correction rules.");
            String::new()
        });
    let system_instruction =
        render_system_instruction(&state.system_instruction_template, &glossary_rules);

    let (upstream, setup_payload) =
        match provider::open_upstream(&state.config, system_instruction).await {
            Ok(opened) => opened,
            Err(e) => {
                error!(error = %e, "Could not open the live service connection.");
                let client_tx = Mutex::new(socket_tx);
                relay::report_outcome(&client_tx, &Err(e)).await;
                relay::close_quietly::<_, Message>(&client_tx, "client").await;
                return;
            }
        };
    let (upstream_tx, upstream_rx) = upstream.split();

    let timing = RelayTiming {
        keepalive_interval: state.config.keepalive_interval,
        handshake_timeout: state.config.handshake_timeout,
    };
    let draft = relay::run_session(
        socket_tx,
        socket_rx,
        upstream_tx,
        upstream_rx,
        setup_payload,
        timing,
    )
    .await;

    submit_draft(state.draft_sink.as_ref(), &session_id, draft).await;
    info!("Live session closed.");
}

/// Hands a non-empty final draft to the sink. Failures are logged only.
async fn submit_draft(sink: &dyn DraftSink, session_id: &str, draft: TaskDraft) {
    if draft.is_empty() {
        info!("Session produced no task draft.");
        return;
    }
    if let Err(e) = sink.submit(session_id, draft).await {
        error!(error = ?e, "Failed to submit task draft.");
    }
}

/// Serializes `msg` and sends it to the client as a text frame.
pub(crate) async fn send_msg<C>(socket_tx: &Mutex<C>, msg: &ServerMessage) -> Result<(), RelayError>
where
    C: Sink<Message> + Unpin,
    C::Error: Display,
{
    let serialized = serde_json::to_string(msg)?;
    socket_tx
        .lock()
        .await
        .send(Message::Text(serialized.into()))
        .await
        .map_err(|e| RelayError::PeerGone(e.to_string()))
}
