//! Action units: validate action data, then run the variant's handler over the resolved records.

mod delete;

pub use delete::DeleteAction;

use crate::error::AppError;
use crate::query::Record;
use crate::result::ActionResult;
use crate::storage::Collection;
use crate::validation::{validate, ValidationRules};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The acting user, as far as actions are concerned: a capability check per record.
pub trait Principal: Send + Sync {
    fn can(&self, ability: &str, record: &Record) -> bool;
}

/// One action variant (e.g. `delete`). Registered under a type name in an
/// [`crate::service::ActionService`].
#[async_trait]
pub trait CrudAction: Send + Sync {
    /// Variant name reported in the success payload's `action` key.
    fn name(&self) -> &str;

    /// Schema the action data must satisfy before [`CrudAction::handle`] runs.
    fn validation_rules(&self) -> ValidationRules {
        ValidationRules::new()
    }

    async fn handle(&self, unit: &ActionUnit) -> Result<ActionResult, AppError>;
}

/// One invocation of an action: the resolved records, the opaque action data and the user.
pub struct ActionUnit {
    action: Arc<dyn CrudAction>,
    records: Vec<Record>,
    data: Value,
    user: Option<Arc<dyn Principal>>,
    collection: Arc<dyn Collection>,
    identifier_field: String,
}

impl ActionUnit {
    pub fn new(
        action: Arc<dyn CrudAction>,
        records: Vec<Record>,
        data: Value,
        user: Option<Arc<dyn Principal>>,
        collection: Arc<dyn Collection>,
        identifier_field: impl Into<String>,
    ) -> Self {
        ActionUnit {
            action,
            records,
            data,
            user,
            collection,
            identifier_field: identifier_field.into(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn user(&self) -> Option<&Arc<dyn Principal>> {
        self.user.as_ref()
    }

    /// Collection the records were resolved from; handlers mutate through it.
    pub fn collection(&self) -> &dyn Collection {
        self.collection.as_ref()
    }

    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    /// Validate the data, then handle. Invalid data never reaches the handler: the result is
    /// an error envelope with every field error and a one-line summary message.
    pub async fn process_action(&self) -> Result<ActionResult, AppError> {
        let rules = self.action.validation_rules();
        if !rules.is_empty() {
            let errors = validate(&self.data, &rules);
            if let Some(message) = errors.summary() {
                tracing::debug!(action = %self.action.name(), errors = errors.total(), "action data rejected");
                return Ok(ActionResult::error(errors.into_fields(), message));
            }
        }
        self.action.handle(self).await
    }

    /// Success envelope with data `{msg, action, data}`.
    pub fn success(&self, message: impl Into<String>, data: Map<String, Value>) -> ActionResult {
        let message = message.into();
        let mut wrapped = Map::new();
        wrapped.insert("msg".into(), Value::String(message.clone()));
        wrapped.insert("action".into(), Value::String(self.action.name().to_string()));
        wrapped.insert("data".into(), Value::Object(data));
        ActionResult::success(message, wrapped)
    }

    /// Error envelope; "Unprocessable action" is the conventional message.
    pub fn failure(&self, message: impl Into<String>) -> ActionResult {
        ActionResult::error_message(message)
    }
}
