//! Loggable handler arguments and result payload inspection

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Placeholder recorded in place of arguments that must not be serialized
pub const IGNORED_ARG: &str = "[ignore]";

/// One argument of an audited handler
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Json(Value),
    /// Uploaded file content (multipart bodies)
    Upload { filename: Option<String> },
    /// The raw request itself
    RawRequest,
    /// The raw response writer
    RawResponse,
    /// Validation outcome of another argument
    BindingResult,
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// True when this value, or anything nested in it, cannot be logged
    pub fn is_ignored(&self) -> bool {
        match self {
            ArgValue::Json(_) => false,
            ArgValue::Upload { .. }
            | ArgValue::RawRequest
            | ArgValue::RawResponse
            | ArgValue::BindingResult => true,
            ArgValue::List(items) => items.iter().any(ArgValue::is_ignored),
            ArgValue::Map(entries) => entries.values().any(ArgValue::is_ignored),
        }
    }

    /// JSON form; only meaningful when `is_ignored` is false
    fn to_json(&self) -> Value {
        match self {
            ArgValue::Json(value) => value.clone(),
            ArgValue::List(items) => Value::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            _ => Value::String(IGNORED_ARG.to_string()),
        }
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        ArgValue::Json(value)
    }
}

/// name → value object with ignored arguments replaced by `"[ignore]"`
pub fn args_to_json(args: &[(String, ArgValue)]) -> Value {
    let mut object = Map::new();
    for (name, value) in args {
        let json = if value.is_ignored() {
            Value::String(IGNORED_ARG.to_string())
        } else {
            value.to_json()
        };
        object.insert(name.clone(), json);
    }
    Value::Object(object)
}

/// Code, message and data of a `CommonResult` envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub code: i32,
    pub msg: String,
    pub data: Value,
}

/// Recognise a `{ code, msg?, data? }` envelope
pub fn parse_envelope(payload: &Value) -> Option<Envelope> {
    let object = payload.as_object()?;
    let code = object.get("code")?.as_i64()?;
    let code = i32::try_from(code).ok()?;
    if !object.contains_key("data") && !object.contains_key("msg") {
        return None;
    }
    let msg = object
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = object.get("data").cloned().unwrap_or(Value::Null);
    Some(Envelope { code, msg, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ignored_is_recursive() {
        assert!(!ArgValue::Json(json!({"a": 1})).is_ignored());
        assert!(ArgValue::RawRequest.is_ignored());

        let list = ArgValue::List(vec![json!(1).into(), ArgValue::Upload { filename: None }]);
        assert!(list.is_ignored());

        let mut map = BTreeMap::new();
        map.insert("ok".to_string(), ArgValue::Json(json!("x")));
        assert!(!ArgValue::Map(map.clone()).is_ignored());
        map.insert("nested".to_string(), ArgValue::List(vec![ArgValue::BindingResult]));
        assert!(ArgValue::Map(map).is_ignored());
    }

    #[test]
    fn test_args_to_json_replaces_ignored() {
        let args = vec![
            ("id".to_string(), ArgValue::Json(json!(12))),
            ("file".to_string(), ArgValue::Upload { filename: Some("a.xlsx".into()) }),
            (
                "ids".to_string(),
                ArgValue::List(vec![json!(1).into(), json!(2).into()]),
            ),
        ];
        assert_eq!(
            args_to_json(&args),
            json!({"id": 12, "file": "[ignore]", "ids": [1, 2]})
        );
    }

    #[test]
    fn test_parse_envelope() {
        let env = parse_envelope(&json!({"code": 0, "msg": "", "data": {"id": 1}})).unwrap();
        assert_eq!(env.code, 0);
        assert_eq!(env.data, json!({"id": 1}));

        let env = parse_envelope(&json!({"code": 500, "msg": "boom", "data": null})).unwrap();
        assert_eq!(env.msg, "boom");

        assert!(parse_envelope(&json!({"code": 1})).is_none());
        assert!(parse_envelope(&json!([1, 2])).is_none());
        assert!(parse_envelope(&json!({"id": 1, "data": 2})).is_none());
    }
}
