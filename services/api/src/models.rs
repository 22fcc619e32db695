//! API Models
//!
//! Request and response bodies of the REST API. All of them derive `ToSchema`
//! so they appear in the generated OpenAPI document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug)]
pub struct GlossaryBulkPayload {
    /// Canonical term -> list of misheard variants. Replaces the whole glossary.
    #[schema(example = json!({"Odoo": ["Odo", "Hoodoo"]}))]
    pub data: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct GlossaryTermPayload {
    #[schema(example = "Intelbras")]
    pub term: String,
    #[serde(default)]
    #[schema(example = json!(["Intel", "Inteobras"]))]
    pub variations: Vec<String>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct DeleteTermPayload {
    #[schema(example = "Intelbras")]
    pub term: String,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_payload_deserialization() {
        let json = r#"{"data": {"APN": ["PN", "A pena"], "Odoo": []}}"#;
        let payload: GlossaryBulkPayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.data["APN"], vec!["PN", "A pena"]);
        assert!(payload.data["Odoo"].is_empty());
    }

    #[test]
    fn test_bulk_payload_rejects_non_object() {
        let result: Result<GlossaryBulkPayload, _> = serde_json::from_str(r#"{"data": ["x"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_term_payload_variations_default_to_empty() {
        let payload: GlossaryTermPayload = serde_json::from_str(r#"{"term": "Datatem"}"#).unwrap();
        assert_eq!(payload.term, "Datatem");
        assert!(payload.variations.is_empty());
    }

    #[test]
    fn test_term_payload_missing_term() {
        let result: Result<GlossaryTermPayload, _> =
            serde_json::from_str(r#"{"variations": ["x"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "term must not be empty".to_string(),
        };

        let json = serde_json::to_string(&error).unwrap();
        let expected = r#"{"message":"term must not be empty"}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_health_response_serialization() {
        let health = HealthResponse {
            status: "ok".to_string(),
        };
        assert_eq!(serde_json::to_string(&health).unwrap(), r#"{"status":"ok"}"#);
    }
}
