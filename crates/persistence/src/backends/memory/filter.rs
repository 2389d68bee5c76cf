//! Evaluation of document filters against in-memory documents.
//!
//! Field paths are dotted and traverse arrays: `provenance.provUsed.uri`
//! resolves to the `uri` of every element of `provUsed`. A condition on a
//! path holds when it holds for any resolved value, and an array value
//! also matches through any of its elements.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::core::Document;
use crate::error::BackendError;

/// Returns true when `document` satisfies every condition of `filter`.
pub(crate) fn matches(document: &Document, filter: &Map<String, Value>) -> Result<bool, BackendError> {
    for (key, condition) in filter {
        let holds = match key.as_str() {
            "$or" => any_branch(document, condition)?,
            "$and" => all_branches(document, condition)?,
            op if op.starts_with('$') => return Err(unsupported(op)),
            path => field_matches(&resolve(document, path), condition)?,
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn branches(condition: &Value) -> Result<&Vec<Value>, BackendError> {
    condition.as_array().ok_or_else(|| BackendError::QueryError {
        message: "$or/$and expects an array of filters".to_string(),
    })
}

fn branch_matches(document: &Document, branch: &Value) -> Result<bool, BackendError> {
    match branch {
        Value::Object(filter) => matches(document, filter),
        _ => Err(BackendError::QueryError {
            message: "filter branch must be an object".to_string(),
        }),
    }
}

fn any_branch(document: &Document, condition: &Value) -> Result<bool, BackendError> {
    for branch in branches(condition)? {
        if branch_matches(document, branch)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn all_branches(document: &Document, condition: &Value) -> Result<bool, BackendError> {
    for branch in branches(condition)? {
        if !branch_matches(document, branch)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolves a dotted path, descending into arrays.
pub(crate) fn resolve<'a>(document: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = document.get(*first) {
            descend(value, rest, &mut out);
        }
    }
    out
}

fn descend<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(*segment) {
                descend(child, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                descend(item, segments, out);
            }
        }
        _ => {}
    }
}

/// Resolved values plus the elements of resolved arrays.
pub(crate) fn flatten<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn is_operator_map(condition: &Value) -> bool {
    match condition {
        Value::Object(map) => !map.is_empty() && map.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn field_matches(values: &[&Value], condition: &Value) -> Result<bool, BackendError> {
    let Value::Object(operators) = condition else {
        return Ok(equals(values, condition));
    };
    if !is_operator_map(condition) {
        return Ok(equals(values, condition));
    }

    for (op, operand) in operators {
        let holds = match op.as_str() {
            "$in" => {
                let allowed = operand.as_array().ok_or_else(|| BackendError::QueryError {
                    message: "$in expects an array".to_string(),
                })?;
                allowed.iter().any(|candidate| equals(values, candidate))
            }
            "$ne" => !equals(values, operand),
            "$exists" => {
                let wanted = operand.as_bool().unwrap_or(true);
                values.is_empty() != wanted
            }
            "$size" => {
                let wanted = operand.as_u64().ok_or_else(|| BackendError::QueryError {
                    message: "$size expects a non-negative integer".to_string(),
                })?;
                values
                    .iter()
                    .any(|v| v.as_array().is_some_and(|items| items.len() as u64 == wanted))
            }
            "$gt" => compares(values, operand, |o| o == Ordering::Greater),
            "$gte" => compares(values, operand, |o| o != Ordering::Less),
            "$lt" => compares(values, operand, |o| o == Ordering::Less),
            "$lte" => compares(values, operand, |o| o != Ordering::Greater),
            other => return Err(unsupported(other)),
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(values: &[&Value], target: &Value) -> bool {
    if target.is_null() && values.is_empty() {
        return true;
    }
    flatten(values).into_iter().any(|v| v == target)
}

fn compares(values: &[&Value], operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    flatten(values)
        .into_iter()
        .filter_map(|v| comparable(v, operand))
        .any(accept)
}

/// Orders two values of the same kind. Mixed kinds do not compare.
fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting: missing and null first, then numbers,
/// strings, objects, arrays and booleans.
pub(crate) fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Some(x), Some(y)) => comparable(x, y).unwrap_or_else(|| x.to_string().cmp(&y.to_string())),
        _ => Ordering::Equal,
    }
}

fn unsupported(op: &str) -> BackendError {
    BackendError::QueryError {
        message: format!("unsupported filter operator {op}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn filter(value: Value) -> Map<String, Value> {
        doc(value)
    }

    #[test]
    fn test_dotted_path_through_arrays() {
        let d = doc(json!({
            "provenance": { "provUsed": [{ "uri": "d1" }, { "uri": "d2" }] }
        }));
        assert!(matches(&d, &filter(json!({ "provenance.provUsed.uri": "d2" }))).unwrap());
        assert!(!matches(&d, &filter(json!({ "provenance.provUsed.uri": "d3" }))).unwrap());
    }

    #[test]
    fn test_in_matches_array_elements() {
        let d = doc(json!({ "scientificObjects": ["a", "b"] }));
        assert!(matches(&d, &filter(json!({ "scientificObjects": { "$in": ["b", "z"] } }))).unwrap());
        assert!(!matches(&d, &filter(json!({ "scientificObjects": { "$in": ["z"] } }))).unwrap());
    }

    #[test]
    fn test_exists_and_size() {
        let without = doc(json!({ "provenance": { "uri": "p" } }));
        let empty = doc(json!({ "provenance": { "uri": "p", "provUsed": [] } }));
        let with = doc(json!({ "provenance": { "uri": "p", "provUsed": [{ "uri": "d" }] } }));

        let missing = filter(json!({ "provenance.provUsed": { "$exists": false } }));
        let sized = filter(json!({ "provenance.provUsed": { "$size": 0 } }));
        assert!(matches(&without, &missing).unwrap());
        assert!(!matches(&with, &missing).unwrap());
        assert!(matches(&empty, &sized).unwrap());
        assert!(!matches(&with, &sized).unwrap());
    }

    #[test]
    fn test_range_on_strings_and_numbers() {
        let d = doc(json!({ "date": "2020-01-15T00:00:00.000Z", "confidence": 0.7 }));
        let f = filter(json!({
            "date": { "$gte": "2020-01-01T00:00:00.000Z", "$lt": "2020-02-01T00:00:00.000Z" },
            "confidence": { "$gte": 0.5, "$lte": 0.7 },
        }));
        assert!(matches(&d, &f).unwrap());
        let f = filter(json!({ "confidence": { "$gt": 0.7 } }));
        assert!(!matches(&d, &f).unwrap());
    }

    #[test]
    fn test_or_branches() {
        let d = doc(json!({ "variable": "v1" }));
        let f = filter(json!({ "$or": [{ "variable": "v2" }, { "variable": "v1" }] }));
        assert!(matches(&d, &f).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let d = doc(json!({ "variable": "v1" }));
        let f = filter(json!({ "variable": { "$regex": "v" } }));
        assert!(matches(&d, &f).is_err());
    }

    #[test]
    fn test_sort_order_puts_missing_first() {
        let one = json!(1);
        let text = json!("a");
        assert_eq!(sort_order(None, Some(&one)), Ordering::Less);
        assert_eq!(sort_order(Some(&one), Some(&text)), Ordering::Less);
        assert_eq!(sort_order(Some(&text), Some(&text)), Ordering::Equal);
    }
}
