//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources handed to every handler and live session.

use crate::config::Config;
use std::sync::Arc;
use taskvoice_core::{glossary::GlossaryCache, sink::DraftSink};

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub glossary: Arc<GlossaryCache>,
    /// Persona template for live sessions, with a `{glossary_rules}` placeholder.
    pub system_instruction_template: Arc<String>,
    pub draft_sink: Arc<dyn DraftSink>,
}
