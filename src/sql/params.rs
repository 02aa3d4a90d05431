//! Convert serde_json::Value into text parameters; placeholders cast them to the column type.

use serde_json::Value;

/// Text form of a bound value. Null binds as SQL NULL; arrays and objects bind as JSON text.
pub fn to_text_param(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}
