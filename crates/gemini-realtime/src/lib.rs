//! Narrow translation layer for the Gemini Live bidirectional streaming API.
//!
//! Everything that knows what the vendor's JSON envelopes look like lives in
//! this crate. Callers hand in raw PCM or acknowledgements and get back JSON
//! text ready for the socket; incoming frames are decoded into [`ServerEvent`]s.

pub mod types;

use base64::Engine;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

pub use tokio_tungstenite::tungstenite;
pub use types::{FunctionCall, FunctionResponse, Setup};

use types::{Blob, ClientMessage, RealtimeInput, ServerMessage, ToolResponse};

/// Mime type of the fixed input format: 16 kHz mono little-endian PCM16.
pub const INPUT_AUDIO_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// A connected upstream socket.
pub type LiveStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A frame from upstream could not be decoded as JSON.
#[derive(Debug, Error)]
#[error("malformed upstream message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// One decoded upstream event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Acknowledgement of the setup message.
    SetupComplete,
    /// Raw PCM audio produced by the model.
    Audio(Vec<u8>),
    /// Transcription fragment of the user's speech.
    InputTranscript(String),
    /// Transcription fragment of the model's speech.
    OutputTranscript(String),
    /// Function calls that must each be acknowledged.
    ToolCall(Vec<FunctionCall>),
    /// Previously issued calls the model no longer needs.
    ToolCallCancellation(Vec<String>),
    TurnComplete,
    Interrupted,
}

/// Builds the WebSocket URL of the `BidiGenerateContent` service.
pub fn live_endpoint(host: &str, api_key: &str) -> String {
    format!(
        "wss://{host}/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent?key={api_key}"
    )
}

/// Opens the upstream socket.
pub async fn connect(url: &str) -> Result<LiveStream, tungstenite::Error> {
    let (ws_stream, response) = connect_async(url).await?;
    debug!(status = %response.status(), "Connected to Gemini Live WebSocket.");
    Ok(ws_stream)
}

/// Serializes the session setup message.
pub fn encode_setup(setup: &Setup) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ClientMessage::Setup(setup.clone()))
}

/// Wraps one chunk of raw input PCM in a realtime-input envelope.
pub fn encode_audio_chunk(pcm: &[u8]) -> Result<String, serde_json::Error> {
    let msg = ClientMessage::RealtimeInput(RealtimeInput {
        audio: Blob {
            mime_type: INPUT_AUDIO_MIME_TYPE.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(pcm),
        },
    });
    serde_json::to_string(&msg)
}

/// Serializes acknowledgements for one or more function calls.
pub fn encode_tool_response(
    function_responses: Vec<FunctionResponse>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ClientMessage::ToolResponse(ToolResponse {
        function_responses,
    }))
}

/// Decodes one upstream frame (text or binary; both carry JSON).
///
/// A tool call or a tool-call cancellation is returned on its own. Otherwise
/// server content is flattened in the order audio, input transcript, output
/// transcript, turn complete, interrupted. Unknown shapes decode to no events.
pub fn decode_server_event(payload: &[u8]) -> Result<Vec<ServerEvent>, DecodeError> {
    let msg: ServerMessage = serde_json::from_slice(payload)?;

    if let Some(tool_call) = msg.tool_call {
        return Ok(vec![ServerEvent::ToolCall(tool_call.function_calls)]);
    }
    if let Some(cancellation) = msg.tool_call_cancellation {
        return Ok(vec![ServerEvent::ToolCallCancellation(cancellation.ids)]);
    }

    let mut events = Vec::new();
    if msg.setup_complete.is_some() {
        events.push(ServerEvent::SetupComplete);
    }

    let Some(content) = msg.server_content else {
        return Ok(events);
    };

    if let Some(model_turn) = content.model_turn {
        for blob in model_turn.parts.into_iter().filter_map(|p| p.inline_data) {
            if blob.data.is_empty() {
                continue;
            }
            match base64::engine::general_purpose::STANDARD.decode(&blob.data) {
                Ok(pcm) => events.push(ServerEvent::Audio(pcm)),
                Err(e) => warn!(error = %e, "Skipping undecodable audio part."),
            }
        }
    }
    if let Some(transcript) = content.input_transcription {
        events.push(ServerEvent::InputTranscript(transcript.text));
    }
    if let Some(transcript) = content.output_transcription {
        events.push(ServerEvent::OutputTranscript(transcript.text));
    }
    if content.turn_complete == Some(true) {
        events.push(ServerEvent::TurnComplete);
    }
    if content.interrupted == Some(true) {
        events.push(ServerEvent::Interrupted);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use types::{
        AudioTranscriptionConfig, Content, FunctionDeclaration, GenerationConfig,
        ResponseModality, Schema, SpeechConfig, Tool,
    };

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_encode_audio_chunk_round_trips_payload() {
        let pcm: Vec<u8> = (0..=255u8).collect();
        let encoded = encode_audio_chunk(&pcm).unwrap();

        let value: Value = serde_json::from_str(&encoded).unwrap();
        let audio = &value["realtimeInput"]["audio"];
        assert_eq!(audio["mimeType"], INPUT_AUDIO_MIME_TYPE);

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(audio["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, pcm);
    }

    #[test]
    fn test_encode_setup_shape() {
        let setup = Setup {
            model: "models/test-model".to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec![ResponseModality::Audio],
                speech_config: SpeechConfig::prebuilt("Kore"),
            },
            tools: vec![Tool {
                function_declarations: vec![FunctionDeclaration {
                    name: "update_task_draft".to_string(),
                    description: "Updates the draft.".to_string(),
                    parameters: Schema::object(
                        vec![
                            ("title", Schema::string("The title.")),
                            ("priority", Schema::integer("1 to 5.")),
                        ],
                        vec!["title".to_string()],
                    ),
                }],
            }],
            system_instruction: Content::text("be nice"),
            input_audio_transcription: AudioTranscriptionConfig::default(),
            output_audio_transcription: AudioTranscriptionConfig::default(),
        };

        let value: Value = serde_json::from_str(&encode_setup(&setup).unwrap()).unwrap();
        let setup = &value["setup"];
        assert_eq!(setup["model"], "models/test-model");
        assert_eq!(setup["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            setup["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Kore"
        );
        let decl = &setup["tools"][0]["functionDeclarations"][0];
        assert_eq!(decl["name"], "update_task_draft");
        assert_eq!(decl["parameters"]["type"], "OBJECT");
        assert_eq!(decl["parameters"]["properties"]["priority"]["type"], "INTEGER");
        assert_eq!(decl["parameters"]["required"], json!(["title"]));
        assert_eq!(setup["systemInstruction"]["parts"][0]["text"], "be nice");
        assert_eq!(setup["inputAudioTranscription"], json!({}));
        assert_eq!(setup["outputAudioTranscription"], json!({}));
    }

    #[test]
    fn test_encode_tool_response() {
        let encoded = encode_tool_response(vec![
            FunctionResponse::ok("call-1", "update_task_draft"),
            FunctionResponse::error("call-2", "update_task_draft", "bad args"),
        ])
        .unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        let responses = &value["toolResponse"]["functionResponses"];
        assert_eq!(responses[0]["id"], "call-1");
        assert_eq!(responses[0]["response"], json!({ "result": "ok" }));
        assert_eq!(responses[1]["id"], "call-2");
        assert_eq!(
            responses[1]["response"],
            json!({ "result": "error", "error": "bad args" })
        );
    }

    #[test]
    fn test_decode_setup_complete() {
        let events = decode_server_event(br#"{"setupComplete":{}}"#).unwrap();
        assert_eq!(events, vec![ServerEvent::SetupComplete]);
    }

    #[test]
    fn test_decode_server_content_ordering() {
        let raw = json!({
            "serverContent": {
                "interrupted": true,
                "turnComplete": true,
                "outputTranscription": { "text": "ok" },
                "inputTranscription": { "text": "hi" },
                "modelTurn": { "parts": [
                    { "inlineData": { "mimeType": "audio/pcm", "data": b64(&[1, 2]) } },
                    { "text": "ignored" },
                    { "inlineData": { "data": b64(&[3]) } }
                ] }
            }
        });
        let events = decode_server_event(raw.to_string().as_bytes()).unwrap();
        assert_eq!(
            events,
            vec![
                ServerEvent::Audio(vec![1, 2]),
                ServerEvent::Audio(vec![3]),
                ServerEvent::InputTranscript("hi".to_string()),
                ServerEvent::OutputTranscript("ok".to_string()),
                ServerEvent::TurnComplete,
                ServerEvent::Interrupted,
            ]
        );
    }

    #[test]
    fn test_decode_tool_call_takes_precedence() {
        let raw = json!({
            "toolCall": { "functionCalls": [
                { "id": "a", "name": "update_task_draft", "args": { "title": "x" } },
                { "name": "other", "args": null }
            ] },
            "serverContent": { "turnComplete": true }
        });
        let events = decode_server_event(raw.to_string().as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::ToolCall(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].id.as_deref(), Some("a"));
                assert_eq!(calls[0].args, Some(json!({ "title": "x" })));
                assert_eq!(calls[1].id, None);
                assert_eq!(calls[1].name.as_deref(), Some("other"));
                assert_eq!(calls[1].args, None);
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_tool_call_cancellation() {
        let events =
            decode_server_event(br#"{"toolCallCancellation":{"ids":["a","b"]}}"#).unwrap();
        assert_eq!(
            events,
            vec![ServerEvent::ToolCallCancellation(vec![
                "a".to_string(),
                "b".to_string()
            ])]
        );
    }

    #[test]
    fn test_decode_ignores_unknown_shapes_and_bad_audio() {
        assert!(decode_server_event(br#"{"usageMetadata":{"totalTokenCount":3}}"#)
            .unwrap()
            .is_empty());
        let raw = br#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"data":"%%%"}}]}}}"#;
        assert!(decode_server_event(raw).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = decode_server_event(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("malformed upstream message"));
    }

    #[test]
    fn test_live_endpoint() {
        assert_eq!(
            live_endpoint("example.test", "k"),
            "wss://example.test/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent?key=k"
        );
    }
}
