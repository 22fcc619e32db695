//! Live Voice Relay
//!
//! Bridges a browser WebSocket to the Gemini Live service. Submodules:
//!
//! - `protocol`: JSON events exchanged with the browser.
//! - `session`: Connection lifecycle, from upgrade to draft submission.
//! - `relay`: The forwarding loops and their supervisor.
//! - `tools`: Execution and acknowledgement of model tool calls.
//! - `provider`: Upstream connection and session setup.

pub mod protocol;
mod provider;
pub mod relay;
pub mod session;
mod tools;

pub use relay::RelayError;
pub use session::ws_handler;
