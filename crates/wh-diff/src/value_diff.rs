//! Structural diff between two JSON values.
//!
//! Differences are expressed as JSON-Patch style operations addressed by
//! JSON pointers. Objects are compared key by key; arrays of equal length
//! element by element; anything else is replaced whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DiffError, DiffResult};

/// Operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
}

/// One patch operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: OpKind,
    /// JSON pointer, `""` for the whole value.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    fn add(path: &[String], value: Value) -> Self {
        Self {
            op: OpKind::Add,
            path: to_pointer(path),
            value: Some(value),
        }
    }

    fn remove(path: &[String]) -> Self {
        Self {
            op: OpKind::Remove,
            path: to_pointer(path),
            value: None,
        }
    }

    fn replace(path: &[String], value: Value) -> Self {
        Self {
            op: OpKind::Replace,
            path: to_pointer(path),
            value: Some(value),
        }
    }
}

/// Render segments as a JSON pointer.
pub fn to_pointer(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Split a JSON pointer into segments.
pub fn from_pointer(pointer: &str) -> DiffResult<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(DiffError::InvalidPath(pointer.to_string()));
    };
    Ok(rest
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Compute the operations turning `old` into `new`.
pub fn diff_values(old: &Value, new: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    let mut path = Vec::new();
    diff_into(old, new, &mut path, &mut ops);
    ops
}

fn diff_into(old: &Value, new: &Value, path: &mut Vec<String>, ops: &mut Vec<PatchOp>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, value) in before {
                path.push(key.clone());
                match after.get(key) {
                    Some(next) => diff_into(value, next, path, ops),
                    None => ops.push(PatchOp::remove(path)),
                }
                path.pop();
            }
            for (key, value) in after {
                if !before.contains_key(key) {
                    path.push(key.clone());
                    ops.push(PatchOp::add(path, value.clone()));
                    path.pop();
                }
            }
        }
        (Value::Array(before), Value::Array(after)) if before.len() == after.len() => {
            for (index, (value, next)) in before.iter().zip(after).enumerate() {
                path.push(index.to_string());
                diff_into(value, next, path, ops);
                path.pop();
            }
        }
        _ => ops.push(PatchOp::replace(path, new.clone())),
    }
}

/// Apply operations to a value in order.
pub fn apply_ops(target: &mut Value, ops: &[PatchOp]) -> DiffResult<()> {
    for op in ops {
        apply_op(target, op)?;
    }
    Ok(())
}

fn apply_op(target: &mut Value, op: &PatchOp) -> DiffResult<()> {
    let segments = from_pointer(&op.path)?;
    let missing = || DiffError::MissingTarget(op.path.clone());
    let value = || op.value.clone().unwrap_or(Value::Null);

    let Some((last, parents)) = segments.split_last() else {
        *target = match op.op {
            OpKind::Remove => Value::Null,
            OpKind::Add | OpKind::Replace => value(),
        };
        return Ok(());
    };

    let mut node = target;
    for segment in parents {
        node = match node {
            Value::Object(fields) => fields.get_mut(segment).ok_or_else(missing)?,
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| missing())?;
                items.get_mut(index).ok_or_else(missing)?
            }
            _ => return Err(missing()),
        };
    }

    match (node, op.op) {
        (Value::Object(fields), OpKind::Add) => {
            fields.insert(last.clone(), value());
        }
        (Value::Object(fields), OpKind::Remove) => {
            fields.remove(last).ok_or_else(missing)?;
        }
        (Value::Object(fields), OpKind::Replace) => {
            *fields.get_mut(last).ok_or_else(missing)? = value();
        }
        (Value::Array(items), OpKind::Add) => {
            if last == "-" {
                items.push(value());
            } else {
                let index: usize = last.parse().map_err(|_| missing())?;
                if index > items.len() {
                    return Err(missing());
                }
                items.insert(index, value());
            }
        }
        (Value::Array(items), OpKind::Remove) => {
            let index: usize = last.parse().map_err(|_| missing())?;
            if index >= items.len() {
                return Err(missing());
            }
            items.remove(index);
        }
        (Value::Array(items), OpKind::Replace) => {
            let index: usize = last.parse().map_err(|_| missing())?;
            *items.get_mut(index).ok_or_else(missing)? = value();
        }
        _ => return Err(missing()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn identical_values_no_ops() {
        let v = json!({"a": [1, 2], "b": {"c": null}});
        assert!(diff_values(&v, &v).is_empty());
    }

    #[test]
    fn nested_field_replace() {
        let old = json!({"config": {"debug": false, "port": 8080}});
        let new = json!({"config": {"debug": true, "port": 8080}});
        assert_eq!(
            diff_values(&old, &new),
            vec![PatchOp::replace(&["config".into(), "debug".into()], json!(true))]
        );
    }

    #[test]
    fn add_and_remove_keys() {
        let old = json!({"keep": 1, "drop": 2});
        let new = json!({"keep": 1, "fresh": 3});
        let ops = diff_values(&old, &new);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].op, OpKind::Remove);
        assert_eq!(ops[0].path, "/drop");
        assert_eq!(ops[1].op, OpKind::Add);
        assert_eq!(ops[1].path, "/fresh");
    }

    #[test]
    fn resized_array_is_replaced() {
        let old = json!({"list": [1, 2]});
        let new = json!({"list": [1, 2, 3]});
        assert_eq!(
            diff_values(&old, &new),
            vec![PatchOp::replace(&["list".into()], json!([1, 2, 3]))]
        );
    }

    #[test]
    fn pointer_escaping() {
        let segments = vec!["a/b".to_string(), "c~d".to_string()];
        let pointer = to_pointer(&segments);
        assert_eq!(pointer, "/a~1b/c~0d");
        assert_eq!(from_pointer(&pointer).unwrap(), segments);
        assert!(from_pointer("no-slash").is_err());
    }

    #[test]
    fn serde_shape() {
        let op = PatchOp::remove(&["x".into()]);
        assert_eq!(serde_json::to_value(&op).unwrap(), json!({"op": "remove", "path": "/x"}));
    }

    #[test]
    fn apply_to_missing_target_fails() {
        let mut v = json!({"a": 1});
        let op = PatchOp::replace(&["b".into()], json!(2));
        assert_eq!(apply_ops(&mut v, &[op]), Err(DiffError::MissingTarget("/b".into())));
    }

    #[test]
    fn array_append_and_insert() {
        let mut v = json!([1, 3]);
        let ops = vec![
            PatchOp {
                op: OpKind::Add,
                path: "/-".into(),
                value: Some(json!(4)),
            },
            PatchOp {
                op: OpKind::Add,
                path: "/1".into(),
                value: Some(json!(2)),
            },
        ];
        apply_ops(&mut v, &ops).unwrap();
        assert_eq!(v, json!([1, 2, 3, 4]));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (-100i64..100).prop_map(Value::from),
            "[a-z]{0,4}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-c/~]{1,2}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn applying_the_diff_reaches_the_target(old in arb_json(), new in arb_json()) {
            let ops = diff_values(&old, &new);
            let mut patched = old.clone();
            apply_ops(&mut patched, &ops).unwrap();
            prop_assert_eq!(patched, new);
        }
    }
}
