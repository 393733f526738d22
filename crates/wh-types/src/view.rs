//! Field projections applied to branch payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the self-reference field every payload carries.
pub const ID_FIELD: &str = "id";

/// Per-branch projection restricting which fields are exposed.
///
/// Serialized as `{"with": [...]}` or `{"without": [...]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Keep only the named fields (the `id` field is always kept).
    With(Vec<String>),
    /// Drop the named fields and keep everything else.
    Without(Vec<String>),
}

impl View {
    /// Project a payload through this view.
    ///
    /// Non-object payloads are returned unchanged.
    pub fn project(&self, value: &Value) -> Value {
        let Value::Object(fields) = value else {
            return value.clone();
        };
        let projected: Map<String, Value> = match self {
            View::With(keep) => fields
                .iter()
                .filter(|(key, _)| key.as_str() == ID_FIELD || keep.iter().any(|k| k == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            View::Without(drop) => fields
                .iter()
                .filter(|(key, _)| !drop.iter().any(|k| k == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };
        Value::Object(projected)
    }
}

/// Project through an optional view.
pub fn project(value: &Value, view: Option<&View>) -> Value {
    match view {
        Some(view) => view.project(value),
        None => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_keeps_named_fields_and_id() {
        let payload = json!({"id": "contact@1", "name": "Ada", "mail": "a@x", "age": 36});
        let view = View::With(vec!["name".into()]);
        assert_eq!(view.project(&payload), json!({"id": "contact@1", "name": "Ada"}));
    }

    #[test]
    fn without_drops_named_fields() {
        let payload = json!({"id": "contact@1", "name": "Ada", "secret": 1});
        let view = View::Without(vec!["secret".into()]);
        assert_eq!(view.project(&payload), json!({"id": "contact@1", "name": "Ada"}));
    }

    #[test]
    fn scalar_payload_is_untouched() {
        let view = View::With(vec!["x".into()]);
        assert_eq!(view.project(&json!(42)), json!(42));
    }

    #[test]
    fn serde_shape() {
        let view: View = serde_json::from_value(json!({"with": ["a", "b"]})).unwrap();
        assert_eq!(view, View::With(vec!["a".into(), "b".into()]));
        assert_eq!(
            serde_json::to_value(View::Without(vec!["c".into()])).unwrap(),
            json!({"without": ["c"]})
        );
    }
}
