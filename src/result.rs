//! Uniform outcome envelope returned by every action.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field name -> messages. A bare message is always stored as a one-element list.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Immutable success/error value. Only built through [`ActionResult::success`] and
/// [`ActionResult::error`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionResult {
    success: bool,
    message: String,
    errors: FieldErrors,
    data: Map<String, Value>,
}

/// Error input accepted by [`ActionResult::error`]: either one message or several.
#[derive(Clone, Debug)]
pub enum ErrorValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ErrorValue {
    fn from(s: &str) -> Self {
        ErrorValue::One(s.to_string())
    }
}

impl From<String> for ErrorValue {
    fn from(s: String) -> Self {
        ErrorValue::One(s)
    }
}

impl From<Vec<String>> for ErrorValue {
    fn from(v: Vec<String>) -> Self {
        ErrorValue::Many(v)
    }
}

impl From<Vec<&str>> for ErrorValue {
    fn from(v: Vec<&str>) -> Self {
        ErrorValue::Many(v.into_iter().map(String::from).collect())
    }
}

impl ActionResult {
    pub const DEFAULT_SUCCESS_MESSAGE: &'static str = "Ok";
    pub const DEFAULT_ERROR_MESSAGE: &'static str = "Error";

    pub fn success(message: impl Into<String>, data: Map<String, Value>) -> Self {
        ActionResult {
            success: true,
            message: message.into(),
            errors: FieldErrors::new(),
            data,
        }
    }

    /// `success("Ok", {})`.
    pub fn ok() -> Self {
        Self::success(Self::DEFAULT_SUCCESS_MESSAGE, Map::new())
    }

    pub fn error<I, K, V>(errors: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ErrorValue>,
    {
        let errors = errors
            .into_iter()
            .map(|(field, value)| {
                let messages = match value.into() {
                    ErrorValue::One(m) => vec![m],
                    ErrorValue::Many(v) => v,
                };
                (field.into(), messages)
            })
            .collect();
        ActionResult {
            success: false,
            message: message.into(),
            errors,
            data: Map::new(),
        }
    }

    /// Error envelope with a message and no field errors.
    pub fn error_message(message: impl Into<String>) -> Self {
        Self::error(Vec::<(String, String)>::new(), message)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "success": self.success,
            "errors": self.errors,
            "message": self.message,
            "data": self.data,
        })
    }
}

impl Default for ActionResult {
    fn default() -> Self {
        Self::ok()
    }
}
