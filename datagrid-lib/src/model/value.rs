//! Helpers for dynamic JSON field values

use std::cmp::Ordering;

use serde_json::Value;

/// Looks up a dot-separated property path inside a JSON value.
///
/// Array elements are addressed either with a numeric segment (`tags.0`) or
/// with brackets (`tags[0]`). An empty path returns the value itself.
///
/// # Example
///
/// ```
/// use datagrid_lib::model::get_path;
/// use serde_json::json;
///
/// let row = json!({ "address": { "city": "Oslo" }, "tags": ["a", "b"] });
/// assert_eq!(get_path(&row, "address.city"), Some(&json!("Oslo")));
/// assert_eq!(get_path(&row, "tags[1]"), Some(&json!("b")));
/// assert_eq!(get_path(&row, "missing.field"), None);
/// ```
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    let normalized = path.replace('[', ".").replace(']', "");
    let mut current = value;
    for segment in normalized.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Returns the JSON type name of a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns `true` if the value counts as set for flag-style fields.
///
/// `null`, `false`, `0`, `""` and missing values are falsy; everything else
/// is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Renders a value as a row identity string.
///
/// Strings are used verbatim; other values use their JSON text.
pub fn key_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over optional JSON values used by the sort engine.
///
/// Missing values and `null` sort first, then booleans, numbers, strings,
/// arrays (element-wise) and objects (all equal). Values of different types
/// order by that type rank.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare_values(Some(left), Some(right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Loose equality used by the default column filter.
///
/// Numbers compare numerically, and a string filter value matches a number
/// or boolean field with the same text, since filter values usually come
/// from text inputs.
pub fn loose_eq(filter: &Value, field: Option<&Value>) -> bool {
    let Some(field) = field else {
        return filter.is_null();
    };
    match (filter, field) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), Value::Number(_)) | (Value::String(s), Value::Bool(_)) => {
            *s == field.to_string()
        }
        (Value::Number(_), Value::String(s)) | (Value::Bool(_), Value::String(s)) => {
            *s == filter.to_string()
        }
        _ => filter == field,
    }
}
