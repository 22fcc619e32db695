//! Live Voice Task API Library Crate
//!
//! This library contains the web service around the live session relay:
//! configuration, application state, REST handlers for the glossary, the
//! WebSocket relay itself, and routing. The `api` binary is a thin wrapper
//! around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
