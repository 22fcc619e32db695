//! Tool-call handling inside a live session.
//!
//! Every call is acknowledged upstream exactly once, whether it succeeded or
//! not, so the model never stalls waiting for a result.

use super::{
    protocol::ServerMessage,
    relay::{RelayError, send_upstream},
    session::send_msg,
};
use axum::extract::ws::Message;
use futures_util::Sink;
use gemini_realtime::{FunctionCall, FunctionResponse, tungstenite::Message as WsMessage};
use serde_json::Value;
use std::fmt::Display;
use taskvoice_core::task_draft::{TaskDraft, TaskDraftUpdate, ToolArgsError, UPDATE_TASK_DRAFT};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Executes one function call and sends its acknowledgement upstream.
///
/// Only a failure to reach upstream is returned; a bad call is answered with
/// an error acknowledgement instead.
pub(crate) async fn handle_tool_call<CT, UT>(
    call: FunctionCall,
    draft: &mut TaskDraft,
    client_tx: &Mutex<CT>,
    upstream_tx: &Mutex<UT>,
) -> Result<(), RelayError>
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
{
    let id = call.id.unwrap_or_default();
    let name = call.name.unwrap_or_else(|| "unknown".to_string());

    let ack = match execute(&name, call.args, draft, client_tx).await {
        Ok(()) => FunctionResponse::ok(id.as_str(), name.as_str()),
        Err(e) => {
            error!(tool = %name, call_id = %id, error = %e, "Tool call failed.");
            FunctionResponse::error(id.as_str(), name.as_str(), e.to_string())
        }
    };

    let payload = gemini_realtime::encode_tool_response(vec![ack])?;
    send_upstream(upstream_tx, payload).await
}

async fn execute<CT>(
    name: &str,
    args: Option<Value>,
    draft: &mut TaskDraft,
    client_tx: &Mutex<CT>,
) -> Result<(), ToolArgsError>
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
{
    if name != UPDATE_TASK_DRAFT {
        warn!(tool = %name, "Unknown tool; acknowledging without effect.");
        return Ok(());
    }

    let update = TaskDraftUpdate::from_tool_args(args)?;
    info!(?update, "Updating task draft.");
    draft.apply(&update);

    if let Err(e) = send_msg(client_tx, &ServerMessage::TaskUpdate { data: update }).await {
        warn!(error = %e, "Failed to forward task update to client.");
    }
    Ok(())
}
