//! Change events and the webhook wire payload

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::trigger::{Operation, TriggerDefinition};

/// A row image: column name to JSON value
pub type Row = serde_json::Map<String, Value>;

/// One row mutation as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub operation: Operation,
    pub old: Option<Row>,
    pub new: Option<Row>,
}

impl RowChange {
    pub fn insert(new: Row) -> Self {
        Self {
            operation: Operation::Insert,
            old: None,
            new: Some(new),
        }
    }

    pub fn update(old: Row, new: Row) -> Self {
        Self {
            operation: Operation::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn delete(old: Row) -> Self {
        Self {
            operation: Operation::Delete,
            old: Some(old),
            new: None,
        }
    }
}

/// Structured description of a row mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub operation: Operation,
    pub schema: String,
    pub table: String,
    pub old: Option<Row>,
    pub new: Option<Row>,
}

impl ChangeEvent {
    /// Decide whether `definition` fires for `change` and build the event.
    ///
    /// Returns `None` when the operation is not watched, when an UPDATE
    /// leaves every tracked column unchanged, or when the host supplied a
    /// row image shape that does not match the operation.
    pub fn build(definition: &TriggerDefinition, change: &RowChange) -> Option<ChangeEvent> {
        if !definition.fires_on(change.operation) {
            return None;
        }

        let (old, new) = match change.operation {
            Operation::Insert => (None, Some(change.new.clone()?)),
            Operation::Delete => (Some(change.old.clone()?), None),
            Operation::Update => {
                let old = change.old.as_ref()?;
                let new = change.new.as_ref()?;
                if !definition.update_columns.is_empty()
                    && !tracked_columns_changed(&definition.update_columns, old, new)
                {
                    return None;
                }
                (Some(old.clone()), Some(new.clone()))
            }
        };

        Some(ChangeEvent {
            operation: change.operation,
            schema: definition.id.schema.clone(),
            table: definition.id.table.clone(),
            old,
            new,
        })
    }

    pub fn into_envelope(self, trigger_name: impl Into<String>) -> TriggerEnvelope {
        TriggerEnvelope {
            trigger: TriggerInfo {
                name: trigger_name.into(),
            },
            event: EventBody {
                op: self.operation,
                data: EventData {
                    old: self.old,
                    new: self.new,
                },
            },
        }
    }
}

/// True iff any tracked column differs by value between the two images.
///
/// A column missing from an image counts as NULL.
pub fn tracked_columns_changed(columns: &[String], old: &Row, new: &Row) -> bool {
    columns.iter().any(|column| {
        let before = old.get(column).unwrap_or(&Value::Null);
        let after = new.get(column).unwrap_or(&Value::Null);
        before != after
    })
}

// ============================================================================
// Wire format
// ============================================================================

/// JSON body POSTed to the webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEnvelope {
    pub trigger: TriggerInfo,
    pub event: EventBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    pub op: Operation,
    pub data: EventData,
}

/// Absent images serialize as `null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub old: Option<Row>,
    pub new: Option<Row>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        RetryBackoff, Timing, TriggerId, WebhookEndpoint, WebhookTarget,
    };
    use chrono::Utc;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn definition(operations: &[Operation], update_columns: &[&str]) -> TriggerDefinition {
        TriggerDefinition {
            id: TriggerId::new("public", "employees", "t1"),
            operations: operations.iter().copied().collect(),
            timing: Timing::After,
            target: WebhookTarget::Inline(WebhookEndpoint::new("http://127.0.0.1:8000/webhook")),
            update_columns: update_columns.iter().map(|c| c.to_string()).collect(),
            timeout_ms: 5_000,
            retry_number: 3,
            retry_interval_ms: 1_000,
            retry_backoff: RetryBackoff::Linear,
            cancel_on_failure: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_event_has_no_old_image() {
        let def = definition(&[Operation::Insert], &[]);
        let change = RowChange::insert(row(json!({"name": "A", "salary": 1})));

        let event = ChangeEvent::build(&def, &change).unwrap();
        assert_eq!(event.operation, Operation::Insert);
        assert_eq!(event.table, "employees");
        assert!(event.old.is_none());
        assert_eq!(event.new, Some(row(json!({"name": "A", "salary": 1}))));
    }

    #[test]
    fn test_delete_event_has_no_new_image() {
        let def = definition(&[Operation::Delete], &[]);
        let change = RowChange::delete(row(json!({"name": "Alice Brown"})));

        let event = ChangeEvent::build(&def, &change).unwrap();
        assert_eq!(event.old, Some(row(json!({"name": "Alice Brown"}))));
        assert!(event.new.is_none());
    }

    #[test]
    fn test_unwatched_operation_is_skipped() {
        let def = definition(&[Operation::Insert], &[]);
        let change = RowChange::delete(row(json!({"id": 1})));
        assert!(ChangeEvent::build(&def, &change).is_none());
    }

    #[test]
    fn test_update_without_tracked_columns_always_fires() {
        let def = definition(&[Operation::Update], &[]);
        let same = row(json!({"id": 1, "salary": 10}));
        let change = RowChange::update(same.clone(), same);

        let event = ChangeEvent::build(&def, &change).unwrap();
        assert!(event.old.is_some());
        assert!(event.new.is_some());
    }

    #[test]
    fn test_update_of_untracked_column_is_skipped() {
        let def = definition(&[Operation::Update], &["salary"]);
        let change = RowChange::update(
            row(json!({"name": "Bob", "salary": 70000, "department": null})),
            row(json!({"name": "Bob", "salary": 70000, "department": "HR"})),
        );
        assert!(ChangeEvent::build(&def, &change).is_none());
    }

    #[test]
    fn test_update_of_tracked_column_fires() {
        let def = definition(&[Operation::Update], &["salary"]);
        let change = RowChange::update(
            row(json!({"name": "Jane", "salary": 60000})),
            row(json!({"name": "Jane", "salary": 65000})),
        );

        let event = ChangeEvent::build(&def, &change).unwrap();
        assert_eq!(event.old.unwrap()["salary"], json!(60000));
        assert_eq!(event.new.unwrap()["salary"], json!(65000));
    }

    #[test]
    fn test_null_comparison_semantics() {
        let cols = vec!["department".to_string()];
        let null_row = row(json!({"department": null}));
        let missing_row = row(json!({}));
        let hr_row = row(json!({"department": "HR"}));

        assert!(!tracked_columns_changed(&cols, &null_row, &null_row));
        assert!(!tracked_columns_changed(&cols, &null_row, &missing_row));
        assert!(tracked_columns_changed(&cols, &null_row, &hr_row));
        assert!(tracked_columns_changed(&cols, &hr_row, &null_row));
    }

    #[test]
    fn test_mismatched_row_shape_is_skipped() {
        let def = definition(&Operation::ALL, &[]);
        let bad_insert = RowChange {
            operation: Operation::Insert,
            old: None,
            new: None,
        };
        let bad_update = RowChange {
            operation: Operation::Update,
            old: None,
            new: Some(row(json!({"id": 1}))),
        };
        assert!(ChangeEvent::build(&def, &bad_insert).is_none());
        assert!(ChangeEvent::build(&def, &bad_update).is_none());
    }

    #[test]
    fn test_envelope_wire_format() {
        let def = definition(&[Operation::Insert], &[]);
        let change = RowChange::insert(row(json!({"name": "A", "salary": 1})));
        let envelope = ChangeEvent::build(&def, &change).unwrap().into_envelope("t1");

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "trigger": {"name": "t1"},
                "event": {
                    "op": "INSERT",
                    "data": {"old": null, "new": {"name": "A", "salary": 1}}
                }
            })
        );
    }
}
