//! Wire types for the Gemini Live `BidiGenerateContent` protocol.
//!
//! Only the subset of the protocol the relay speaks is modelled. Server-side
//! types are permissive (every field optional) so that schema additions on the
//! vendor side never break decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// --- Client -> server ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ToolResponse(ToolResponse),
}

/// The single setup message sent right after connecting.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub tools: Vec<Tool>,
    pub system_instruction: Content,
    pub input_audio_transcription: AudioTranscriptionConfig,
    pub output_audio_transcription: AudioTranscriptionConfig,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    pub speech_config: SpeechConfig,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Text,
    Audio,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl SpeechConfig {
    pub fn prebuilt(voice_name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice_name.into(),
                },
            },
        }
    }
}

/// Empty marker object that switches on transcription for one direction.
#[derive(Serialize, Debug, Clone, Default)]
pub struct AudioTranscriptionConfig {}

#[derive(Serialize, Debug, Clone)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Part {
    pub text: String,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize, Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Schema,
}

/// OpenAPI-flavoured schema object as accepted by the Live API.
#[derive(Serialize, Debug, Clone)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Object,
    String,
    Integer,
}

impl Schema {
    pub fn object(properties: Vec<(&str, Schema)>, required: Vec<String>) -> Self {
        Self {
            kind: SchemaType::Object,
            description: None,
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
            required,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::scalar(SchemaType::String, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::scalar(SchemaType::Integer, description)
    }

    fn scalar(kind: SchemaType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: Some(description.into()),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub audio: Blob,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// Acknowledgement for one function call, correlated by the call id.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

impl FunctionResponse {
    pub fn ok(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            response: serde_json::json!({ "result": "ok" }),
        }
    }

    pub fn error(id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            response: serde_json::json!({ "result": "error", "error": error.into() }),
        }
    }
}

// --- Server -> client ---

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<LiveServerContent>,
    pub tool_call: Option<LiveToolCall>,
    pub tool_call_cancellation: Option<LiveToolCallCancellation>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveServerContent {
    pub model_turn: Option<ServerContentTurn>,
    pub input_transcription: Option<ServerTranscription>,
    pub output_transcription: Option<ServerTranscription>,
    pub turn_complete: Option<bool>,
    pub interrupted: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ServerContentTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerPart {
    pub inline_data: Option<ServerBlob>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ServerBlob {
    #[serde(default)]
    pub data: String,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct ServerTranscription {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// One function invocation requested by the model.
///
/// Every field is optional on the wire; the relay must still acknowledge a
/// call with a missing id or name, so nothing here is validated.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct LiveToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}
