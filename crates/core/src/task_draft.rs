//! Task Draft
//!
//! The structured record that a voice conversation fills in, and the typed
//! argument set of the `update_task_draft` tool the model calls to change it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Name of the only tool declared to the model.
pub const UPDATE_TASK_DRAFT: &str = "update_task_draft";

/// Lowest and highest accepted priority (1 = low, 5 = critical).
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

/// The incrementally assembled task.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    /// Due date as `YYYY-MM-DD`, kept verbatim.
    pub due_date: Option<String>,
    pub priority: Option<u8>,
}

impl TaskDraft {
    /// Overwrites every field carried by `update`; absent fields are left alone.
    pub fn apply(&mut self, update: &TaskDraftUpdate) {
        if let Some(title) = &update.title {
            self.title = Some(title.clone());
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(assignee) = &update.assignee {
            self.assignee = Some(assignee.clone());
        }
        if let Some(due_date) = &update.due_date {
            self.due_date = Some(due_date.clone());
        }
        if let Some(priority) = update.priority {
            self.priority = Some(priority);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Arguments of one `update_task_draft` call after coercion.
///
/// Serializes with only the fields that were present, which is exactly the
/// `data` payload of a `task_update` event.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraftUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// The tool arguments could not be turned into a [`TaskDraftUpdate`].
#[derive(Debug, thiserror::Error)]
#[error("invalid update_task_draft arguments: {0}")]
pub struct ToolArgsError(#[from] serde_json::Error);

impl TaskDraftUpdate {
    /// Builds an update from raw tool arguments.
    ///
    /// Missing or non-object arguments count as an empty update. `priority` is
    /// coerced to an integer and silently dropped (with a warning) when that is
    /// impossible. Any other type mismatch is an error.
    pub fn from_tool_args(args: Option<Value>) -> Result<Self, ToolArgsError> {
        let mut args = match args {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                warn!(args = %other, "Tool call args is not an object; treating as empty.");
                Map::new()
            }
        };
        coerce_priority(&mut args);
        Ok(serde_json::from_value(Value::Object(args))?)
    }
}

/// Rewrites `args["priority"]` as an integer in range, or removes it.
pub fn coerce_priority(args: &mut Map<String, Value>) {
    let Some(raw) = args.remove("priority") else {
        return;
    };
    match priority_from_value(&raw) {
        Some(priority) => {
            args.insert("priority".to_string(), Value::from(priority));
        }
        None => warn!(priority = %raw, "Invalid priority value, removing it."),
    }
}

fn priority_from_value(raw: &Value) -> Option<i64> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    PRIORITY_RANGE.contains(&parsed).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_string_is_coerced() {
        let update = TaskDraftUpdate::from_tool_args(Some(json!({ "priority": "3" }))).unwrap();
        assert_eq!(update.priority, Some(3));
    }

    #[test]
    fn test_non_numeric_priority_is_dropped() {
        let update = TaskDraftUpdate::from_tool_args(Some(json!({
            "title": "Ligar para cliente",
            "priority": "high"
        })))
        .unwrap();
        assert_eq!(update.priority, None);
        assert_eq!(update.title.as_deref(), Some("Ligar para cliente"));
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "title": "Ligar para cliente" })
        );
    }

    #[test]
    fn test_priority_float_and_out_of_range() {
        let mut args = json!({ "priority": 4.0 }).as_object().unwrap().clone();
        coerce_priority(&mut args);
        assert_eq!(args["priority"], json!(4));

        for bad in [json!(0), json!(9), json!(true), json!(null), json!("2.5")] {
            let mut args = Map::new();
            args.insert("priority".to_string(), bad);
            coerce_priority(&mut args);
            assert!(!args.contains_key("priority"));
        }
    }

    #[test]
    fn test_missing_or_non_object_args_are_empty() {
        assert_eq!(
            TaskDraftUpdate::from_tool_args(None).unwrap(),
            TaskDraftUpdate::default()
        );
        assert_eq!(
            TaskDraftUpdate::from_tool_args(Some(json!("title=foo"))).unwrap(),
            TaskDraftUpdate::default()
        );
    }

    #[test]
    fn test_wrong_field_type_is_an_error() {
        let err = TaskDraftUpdate::from_tool_args(Some(json!({ "title": 42 }))).unwrap_err();
        assert!(err.to_string().contains("invalid update_task_draft arguments"));
    }

    #[test]
    fn test_due_date_uses_camel_case() {
        let update =
            TaskDraftUpdate::from_tool_args(Some(json!({ "dueDate": "2025-03-01" }))).unwrap();
        assert_eq!(update.due_date.as_deref(), Some("2025-03-01"));
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "dueDate": "2025-03-01" })
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let update = TaskDraftUpdate {
            title: Some("Revisar contrato".to_string()),
            assignee: Some("Ana".to_string()),
            priority: Some(2),
            ..Default::default()
        };

        let mut once = TaskDraft::default();
        once.apply(&update);
        let mut twice = once.clone();
        twice.apply(&update);

        assert_eq!(once, twice);
        assert_eq!(twice.title.as_deref(), Some("Revisar contrato"));
        assert_eq!(twice.description, None);
    }

    #[test]
    fn test_apply_overwrites_only_present_fields() {
        let mut draft = TaskDraft {
            title: Some("Old".to_string()),
            description: Some("Keep me".to_string()),
            ..Default::default()
        };
        draft.apply(&TaskDraftUpdate {
            title: Some("New".to_string()),
            ..Default::default()
        });
        assert_eq!(draft.title.as_deref(), Some("New"));
        assert_eq!(draft.description.as_deref(), Some("Keep me"));
        assert!(!draft.is_empty());
        assert!(TaskDraft::default().is_empty());
    }
}
