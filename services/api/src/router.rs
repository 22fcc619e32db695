//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the live WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        DeleteTermPayload, ErrorResponse, GlossaryBulkPayload, GlossaryTermPayload,
        HealthResponse,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_glossary,
        handlers::save_glossary,
        handlers::add_term,
        handlers::delete_term,
    ),
    components(
        schemas(GlossaryBulkPayload, GlossaryTermPayload, DeleteTermPayload, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Live Voice Task API", description = "Glossary management and live voice relay for task drafting")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route(
            "/api/v1/glossary",
            get(handlers::get_glossary).post(handlers::save_glossary),
        )
        .route(
            "/api/v1/glossary/term",
            post(handlers::add_term).delete(handlers::delete_term),
        )
        .route("/api/v1/voice/live", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::{net::SocketAddr, path::PathBuf, time::Duration};
    use taskvoice_core::{glossary::GlossaryCache, sink::LogDraftSink};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use tracing::Level;

    fn test_state(dir: &TempDir) -> Arc<AppState> {
        let glossary_path = dir.path().join("glossary.json");
        let config = Config {
            bind_address: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
            google_api_key: "test-key".to_string(),
            live_model: "test-model".to_string(),
            live_voice: "Kore".to_string(),
            live_api_host: "localhost".to_string(),
            log_level: Level::INFO,
            prompts_path: PathBuf::from("./prompts"),
            glossary_path: glossary_path.clone(),
            keepalive_interval: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(10),
        };
        Arc::new(AppState {
            config: Arc::new(config),
            glossary: Arc::new(GlossaryCache::new(glossary_path)),
            system_instruction_template: Arc::new("{glossary_rules}".to_string()),
            draft_sink: Arc::new(LogDraftSink),
        })
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let app = create_router(test_state(&dir));
        let (status, body) = call(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_glossary_crud() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = call(
            create_router(state.clone()),
            Method::POST,
            "/api/v1/glossary",
            Some(json!({ "data": { "Odoo": ["Odo"] } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "Odoo": ["Odo"] }));

        let (status, body) = call(
            create_router(state.clone()),
            Method::POST,
            "/api/v1/glossary/term",
            Some(json!({ "term": "  APN ", "variations": ["A pena"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "APN": ["A pena"], "Odoo": ["Odo"] }));

        let (status, body) = call(
            create_router(state.clone()),
            Method::DELETE,
            "/api/v1/glossary/term",
            Some(json!({ "term": "Odoo" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "APN": ["A pena"] }));

        let (status, body) =
            call(create_router(state), Method::GET, "/api/v1/glossary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "APN": ["A pena"] }));
    }

    #[tokio::test]
    async fn test_blank_term_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = call(
            create_router(state.clone()),
            Method::POST,
            "/api/v1/glossary/term",
            Some(json!({ "term": "   ", "variations": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "term must not be empty" }));

        let (status, _) = call(
            create_router(state),
            Method::DELETE,
            "/api/v1/glossary/term",
            Some(json!({ "term": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_term_requests_all_persist() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let requests = (0..8).map(|i| {
            call(
                create_router(state.clone()),
                Method::POST,
                "/api/v1/glossary/term",
                Some(json!({ "term": format!("Cliente {i}"), "variations": [format!("cliente {i}")] })),
            )
        });
        for (status, _) in futures::future::join_all(requests).await {
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) =
            call(create_router(state), Method::GET, "/api/v1/glossary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_openapi_lists_glossary_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/glossary"));
        assert!(doc.paths.paths.contains_key("/api/v1/glossary/term"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
