//! Upstream connection to the real-time voice service.

pub mod gemini;

use super::relay::RelayError;
use crate::config::Config;
use gemini_realtime::LiveStream;
use tracing::info;

/// Encodes the setup for `system_instruction` and opens the upstream socket.
///
/// Returns the connected stream together with the setup payload, which the
/// relay sends before anything else.
pub async fn open_upstream(
    config: &Config,
    system_instruction: String,
) -> Result<(LiveStream, String), RelayError> {
    let setup = gemini::session_setup(config, system_instruction);
    let setup_payload = gemini_realtime::encode_setup(&setup)?;

    // The URL carries the API key; log the host only.
    let url = gemini_realtime::live_endpoint(&config.live_api_host, &config.google_api_key);
    info!(host = %config.live_api_host, model = %config.live_model, "Connecting to live service.");
    let stream = gemini_realtime::connect(&url)
        .await
        .map_err(|e| RelayError::Handshake(e.to_string()))?;

    Ok((stream, setup_payload))
}
