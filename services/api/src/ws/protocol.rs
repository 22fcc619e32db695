//! Defines the WebSocket message protocol between the browser client and the API server.
//!
//! Audio travels as raw binary frames in both directions; everything below is
//! carried in JSON text frames.

use serde::{Deserialize, Serialize};
use taskvoice_core::task_draft::TaskDraftUpdate;

/// Control messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The user asked to stop the current response.
    Stop,
}

/// Who produced a transcript fragment.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    User,
    Model,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Keep-alive.
    Ping,
    /// Fields the model just set on the task draft.
    TaskUpdate { data: TaskDraftUpdate },
    /// A partial transcription fragment.
    Transcript {
        source: TranscriptSource,
        text: String,
        #[serde(rename = "isComplete")]
        is_complete: bool,
    },
    /// The model finished its turn.
    TurnComplete,
    /// The model's turn was cut off by user speech.
    Interrupted,
    /// Sent once, right before the server closes the socket on failure.
    Error { message: String },
}

impl ServerMessage {
    pub fn transcript(source: TranscriptSource, text: String) -> Self {
        Self::Transcript {
            source,
            text,
            is_complete: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn to_value(msg: &ServerMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn test_server_message_wire_format() {
        assert_eq!(to_value(&ServerMessage::Ping), json!({ "type": "ping" }));
        assert_eq!(
            to_value(&ServerMessage::TurnComplete),
            json!({ "type": "turn_complete" })
        );
        assert_eq!(
            to_value(&ServerMessage::Interrupted),
            json!({ "type": "interrupted" })
        );
        assert_eq!(
            to_value(&ServerMessage::Error {
                message: "boom".to_string()
            }),
            json!({ "type": "error", "message": "boom" })
        );
        assert_eq!(
            to_value(&ServerMessage::transcript(
                TranscriptSource::Model,
                "Anotei aqui".to_string()
            )),
            json!({ "type": "transcript", "source": "model", "text": "Anotei aqui", "isComplete": false })
        );
    }

    #[test]
    fn test_task_update_wire_format() {
        let data = TaskDraftUpdate {
            title: Some("Enviar proposta".to_string()),
            priority: Some(4),
            ..Default::default()
        };
        assert_eq!(
            to_value(&ServerMessage::TaskUpdate { data }),
            json!({ "type": "task_update", "data": { "title": "Enviar proposta", "priority": 4 } })
        );
    }

    #[test]
    fn test_client_message_parsing() {
        let stop: ClientMessage = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert_eq!(stop, ClientMessage::Stop);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("{not json").is_err());
    }
}
