//! Session setup for the Gemini Live service.

use crate::config::Config;
use gemini_realtime::{
    Setup,
    types::{
        AudioTranscriptionConfig, Content, FunctionDeclaration, GenerationConfig,
        ResponseModality, Schema, SpeechConfig, Tool,
    },
};
use taskvoice_core::task_draft::UPDATE_TASK_DRAFT;

/// The one tool the model may call to fill in the task draft.
pub fn update_task_draft_declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: UPDATE_TASK_DRAFT.to_string(),
        description: "Updates the current draft of the task based on user voice input."
            .to_string(),
        parameters: Schema::object(
            vec![
                ("title", Schema::string("The title of the task.")),
                (
                    "description",
                    Schema::string("The description or notes for the task."),
                ),
                ("assignee", Schema::string("Who is responsible for the task.")),
                ("dueDate", Schema::string("Due date in YYYY-MM-DD format.")),
                (
                    "priority",
                    Schema::integer("Priority from 1 (Low) to 5 (Critical)."),
                ),
            ],
            vec!["title".to_string()],
        ),
    }
}

/// Builds the setup message: audio out with the configured voice, both
/// transcriptions on, and the task tool declared.
pub fn session_setup(config: &Config, system_instruction: String) -> Setup {
    Setup {
        model: format!("models/{}", config.live_model),
        generation_config: GenerationConfig {
            response_modalities: vec![ResponseModality::Audio],
            speech_config: SpeechConfig::prebuilt(config.live_voice.as_str()),
        },
        tools: vec![Tool {
            function_declarations: vec![update_task_draft_declaration()],
        }],
        system_instruction: Content::text(system_instruction),
        input_audio_transcription: AudioTranscriptionConfig::default(),
        output_audio_transcription: AudioTranscriptionConfig::default(),
    }
}
