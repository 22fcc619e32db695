//! Main Entrypoint for the Live Voice Task API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading the persona prompt and seeding the phonetic glossary.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{collections::HashMap, fs, net::SocketAddr, path::Path, sync::Arc};
use taskvoice_api::{config::Config, router::create_router, state::AppState};
use taskvoice_core::{glossary::GlossaryCache, sink::LogDraftSink};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Prompt file (without extension) holding the live persona template.
const LIVE_SYSTEM_INSTRUCTION: &str = "live_system_instruction";

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C.");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Loads every `.md` file in `prompts_path`, keyed by file stem.
fn load_prompts(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Failed to read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Prompt and Glossary ---
    let mut prompts = load_prompts(&config.prompts_path)?;
    let system_instruction_template = Arc::new(
        prompts
            .remove(LIVE_SYSTEM_INSTRUCTION)
            .with_context(|| format!("{LIVE_SYSTEM_INSTRUCTION}.md not found in prompts directory"))?,
    );

    let glossary = Arc::new(GlossaryCache::new(&config.glossary_path));
    glossary
        .ensure_seeded()
        .context("Failed to prepare glossary file")?;
    info!(
        path = %glossary.path().display(),
        terms = glossary.load().len(),
        "Glossary ready."
    );

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        glossary,
        system_instruction_template,
        draft_sink: Arc::new(LogDraftSink),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        model = %config.live_model,
        voice = %config.live_voice,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
