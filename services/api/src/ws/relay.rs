//! The live session relay.
//!
//! A session owns the write halves of both sockets behind async mutexes (two
//! loops write to each) and runs three loops in one task:
//!
//! - client -> upstream: microphone PCM and control frames,
//! - upstream -> client: audio, transcripts, turn events and tool calls,
//! - keep-alive pings to the client.
//!
//! The first loop to finish ends the session; the others are dropped. Every
//! exit path, including a failed handshake, goes through the same teardown:
//! report the outcome to the client, then close both connections.
//!
//! The loops are generic over `Sink`/`Stream` so they run unchanged against
//! axum/tungstenite sockets and in-memory channels.

use super::{
    protocol::{ClientMessage, ServerMessage, TranscriptSource},
    session::send_msg,
    tools,
};
use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use gemini_realtime::{ServerEvent, tungstenite::Message as WsMessage};
use std::{fmt::Display, time::Duration};
use taskvoice_core::task_draft::TaskDraft;
use tokio::{sync::Mutex, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Why a session ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Handshake with the live service failed: {0}")]
    Handshake(String),
    #[error("Client connection lost: {0}")]
    PeerGone(String),
    #[error("Live service closed the connection (code {code:?})")]
    UpstreamClosed { code: Option<u16> },
    #[error("Live service connection error: {0}")]
    Upstream(String),
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RelayError {
    /// Text of the `error` event sent to the client, or `None` when the
    /// client can no longer be reached.
    pub fn client_message(&self) -> Option<String> {
        match self {
            RelayError::PeerGone(_) => None,
            RelayError::UpstreamClosed { code } => Some(close_reason(*code).to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// Maps an upstream close code to a human-readable reason.
pub fn close_reason(code: Option<u16>) -> &'static str {
    match code {
        Some(1000) => "Live session completed normally",
        Some(1001) => "Live server going away",
        _ => "Live session ended",
    }
}

/// Timing knobs of a session.
#[derive(Debug, Clone, Copy)]
pub struct RelayTiming {
    pub keepalive_interval: Duration,
    pub handshake_timeout: Duration,
}

/// Runs one session from setup to teardown and returns the final task draft.
///
/// `setup_payload` is sent upstream first; exactly one acknowledgement must
/// arrive before any audio is relayed.
pub(crate) async fn run_session<CT, CR, CE, UT, UR, UE>(
    client_tx: CT,
    client_rx: CR,
    upstream_tx: UT,
    mut upstream_rx: UR,
    setup_payload: String,
    timing: RelayTiming,
) -> TaskDraft
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
    CR: Stream<Item = Result<Message, CE>> + Unpin,
    CE: Display,
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
    UR: Stream<Item = Result<WsMessage, UE>> + Unpin,
    UE: Display,
{
    let client_tx = Mutex::new(client_tx);
    let upstream_tx = Mutex::new(upstream_tx);

    let handshake = async {
        send_upstream(&upstream_tx, setup_payload)
            .await
            .map_err(|e| RelayError::Handshake(e.to_string()))?;
        await_setup_ack(&mut upstream_rx, timing.handshake_timeout).await
    };

    let handshake_result = handshake.await;

    let (draft, outcome) = match handshake_result {
        Ok(()) => {
            supervise(
                &client_tx,
                client_rx,
                &upstream_tx,
                upstream_rx,
                timing.keepalive_interval,
            )
            .await
        }
        Err(e) => (TaskDraft::default(), Err(e)),
    };

    report_outcome(&client_tx, &outcome).await;
    close_quietly::<_, Message>(&client_tx, "client").await;
    close_quietly::<_, WsMessage>(&upstream_tx, "upstream").await;
    draft
}

/// Waits for the first data frame from upstream, which acknowledges setup.
pub(crate) async fn await_setup_ack<UR, UE>(
    upstream_rx: &mut UR,
    timeout: Duration,
) -> Result<(), RelayError>
where
    UR: Stream<Item = Result<WsMessage, UE>> + Unpin,
    UE: Display,
{
    let wait = async {
        loop {
            match upstream_rx.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let preview: String = text.as_str().chars().take(200).collect();
                    info!(ack = %preview, "Live service handshake received.");
                    return Ok(());
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    info!(len = data.len(), "Live service handshake received.");
                    return Ok(());
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame
                        .map(|f| {
                            format!("closed with code {}: {}", u16::from(f.code), f.reason.as_str())
                        })
                        .unwrap_or_else(|| "closed".to_string());
                    return Err(RelayError::Handshake(reason));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(RelayError::Handshake(e.to_string())),
                None => {
                    return Err(RelayError::Handshake(
                        "connection ended before setup completed".to_string(),
                    ));
                }
            }
        }
    };
    tokio::time::timeout(timeout, wait)
        .await
        .unwrap_or_else(|_| {
            Err(RelayError::Handshake(format!(
                "no setup acknowledgement within {:?}",
                timeout
            )))
        })
}

/// Runs the three loops until the first one finishes.
async fn supervise<CT, CR, CE, UT, UR, UE>(
    client_tx: &Mutex<CT>,
    client_rx: CR,
    upstream_tx: &Mutex<UT>,
    upstream_rx: UR,
    keepalive_interval: Duration,
) -> (TaskDraft, Result<(), RelayError>)
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
    CR: Stream<Item = Result<Message, CE>> + Unpin,
    CE: Display,
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
    UR: Stream<Item = Result<WsMessage, UE>> + Unpin,
    UE: Display,
{
    let mut draft = TaskDraft::default();
    let outcome = {
        let to_upstream = client_to_upstream(client_rx, upstream_tx);
        let to_client = upstream_to_client(upstream_rx, client_tx, upstream_tx, &mut draft);
        let heartbeat = keep_alive(client_tx, keepalive_interval);
        tokio::pin!(to_upstream, to_client, heartbeat);

        tokio::select! {
            result = to_upstream => {
                debug!("Client-to-upstream loop finished first.");
                result
            }
            result = to_client => {
                debug!("Upstream-to-client loop finished first.");
                result
            }
            result = heartbeat => {
                debug!("Keep-alive loop finished first.");
                result
            }
        }
    };
    (draft, outcome)
}

/// Forwards microphone audio upstream and interprets control frames.
///
/// Ends cleanly when the client goes away.
pub(crate) async fn client_to_upstream<CR, CE, UT>(
    mut client_rx: CR,
    upstream_tx: &Mutex<UT>,
) -> Result<(), RelayError>
where
    CR: Stream<Item = Result<Message, CE>> + Unpin,
    CE: Display,
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
{
    while let Some(msg_result) = client_rx.next().await {
        match msg_result {
            Ok(Message::Binary(pcm)) => {
                let payload = gemini_realtime::encode_audio_chunk(&pcm)?;
                send_upstream(upstream_tx, payload).await?;
            }
            Ok(Message::Text(text)) => handle_control_frame(text.as_str()),
            Ok(Message::Close(frame)) => {
                info!(?frame, "Client sent close frame.");
                return Ok(());
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                info!(error = %e, "Client connection dropped.");
                return Ok(());
            }
        }
    }
    info!("Client disconnected.");
    Ok(())
}

fn handle_control_frame(text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        // No cancellation message is sent upstream: the live protocol offers
        // no confirmed mid-turn cancel, so the request is only recorded.
        Ok(ClientMessage::Stop) => info!("Client requested stop."),
        Err(e) => {
            let preview: String = text.chars().take(100).collect();
            warn!(error = %e, text = %preview, "Ignoring unrecognized client text frame.");
        }
    }
}

/// Routes upstream messages to the client, answering tool calls on the way.
///
/// Always ends with an error: `UpstreamClosed` on a close frame or end of
/// stream, `PeerGone` once audio can no longer be delivered.
pub(crate) async fn upstream_to_client<UR, UE, CT, UT>(
    mut upstream_rx: UR,
    client_tx: &Mutex<CT>,
    upstream_tx: &Mutex<UT>,
    draft: &mut TaskDraft,
) -> Result<(), RelayError>
where
    UR: Stream<Item = Result<WsMessage, UE>> + Unpin,
    UE: Display,
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
{
    while let Some(msg_result) = upstream_rx.next().await {
        match msg_result {
            Ok(WsMessage::Text(text)) => {
                dispatch(text.as_str().as_bytes(), client_tx, upstream_tx, draft).await?
            }
            Ok(WsMessage::Binary(data)) => dispatch(&data, client_tx, upstream_tx, draft).await?,
            Ok(WsMessage::Close(frame)) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                let reason = frame.as_ref().map(|f| f.reason.as_str());
                info!(?code, ?reason, "Live service closed the connection.");
                return Err(RelayError::UpstreamClosed { code });
            }
            Ok(_) => {}
            Err(e) => return Err(RelayError::Upstream(e.to_string())),
        }
    }
    Err(RelayError::UpstreamClosed { code: None })
}

async fn dispatch<CT, UT>(
    payload: &[u8],
    client_tx: &Mutex<CT>,
    upstream_tx: &Mutex<UT>,
    draft: &mut TaskDraft,
) -> Result<(), RelayError>
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
{
    let events = match gemini_realtime::decode_server_event(payload) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, len = payload.len(), "Dropping upstream frame.");
            return Ok(());
        }
    };

    for event in events {
        match event {
            ServerEvent::ToolCall(calls) => {
                for call in calls {
                    tools::handle_tool_call(call, draft, client_tx, upstream_tx).await?;
                }
            }
            ServerEvent::ToolCallCancellation(ids) => {
                info!(?ids, "Live service cancelled tool calls.");
            }
            ServerEvent::Audio(pcm) => {
                client_tx
                    .lock()
                    .await
                    .send(Message::Binary(Bytes::from(pcm)))
                    .await
                    .map_err(|e| RelayError::PeerGone(e.to_string()))?;
            }
            ServerEvent::InputTranscript(text) => {
                forward(client_tx, ServerMessage::transcript(TranscriptSource::User, text)).await
            }
            ServerEvent::OutputTranscript(text) => {
                forward(client_tx, ServerMessage::transcript(TranscriptSource::Model, text)).await
            }
            ServerEvent::TurnComplete => forward(client_tx, ServerMessage::TurnComplete).await,
            ServerEvent::Interrupted => forward(client_tx, ServerMessage::Interrupted).await,
            ServerEvent::SetupComplete => debug!("Ignoring repeated setup acknowledgement."),
        }
    }
    Ok(())
}

/// Sends `{"type":"ping"}` every `interval`; stops once the client is gone.
pub(crate) async fn keep_alive<CT>(client_tx: &Mutex<CT>, interval: Duration) -> Result<(), RelayError>
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = send_msg(client_tx, &ServerMessage::Ping).await {
            debug!(error = %e, "Keep-alive stopped.");
            return Ok(());
        }
    }
}

/// Best-effort event delivery; a failure is logged and otherwise ignored.
async fn forward<CT>(client_tx: &Mutex<CT>, msg: ServerMessage)
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
{
    if let Err(e) = send_msg(client_tx, &msg).await {
        warn!(error = %e, "Failed to send event to client.");
    }
}

pub(crate) async fn send_upstream<UT>(upstream_tx: &Mutex<UT>, payload: String) -> Result<(), RelayError>
where
    UT: Sink<WsMessage> + Unpin,
    UT::Error: Display,
{
    upstream_tx
        .lock()
        .await
        .send(WsMessage::Text(payload.into()))
        .await
        .map_err(|e| RelayError::Upstream(e.to_string()))
}

/// Tells the client how the session ended, if it went wrong and the client
/// is still there to hear it.
pub(crate) async fn report_outcome<CT>(client_tx: &Mutex<CT>, outcome: &Result<(), RelayError>)
where
    CT: Sink<Message> + Unpin,
    CT::Error: Display,
{
    match outcome {
        Ok(()) => info!("Live session ended by the client."),
        Err(e) => match e.client_message() {
            Some(message) => {
                warn!(error = %e, "Live session ended with error.");
                forward(client_tx, ServerMessage::Error { message }).await;
            }
            None => info!(error = %e, "Client is gone; nothing to report."),
        },
    }
}

/// Closes one connection, logging (at debug level only) any failure.
pub(crate) async fn close_quietly<S, M>(sink: &Mutex<S>, peer: &str)
where
    S: Sink<M> + Unpin,
    S::Error: Display,
{
    if let Err(e) = SinkExt::<M>::close(&mut *sink.lock().await).await {
        debug!(peer, error = %e, "Ignoring error while closing connection.");
    }
}
