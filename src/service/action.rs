//! ActionService: resolves a batch of records by identifier and runs a registered action on them.

use crate::action::{ActionUnit, CrudAction, Principal};
use crate::config::ActionSettings;
use crate::error::{AppError, ConfigError};
use crate::query::Query;
use crate::result::ActionResult;
use crate::storage::Collection;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Inbound action: which action, on which records, with what data.
#[derive(Clone, Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(rename = "relatedIds", alias = "related_ids")]
    pub related_ids: Vec<Value>,
    #[serde(default)]
    pub data: Value,
}

pub struct ActionService {
    collection: Option<Arc<dyn Collection>>,
    action_types: HashMap<String, Arc<dyn CrudAction>>,
    max_models_per_action: usize,
    identifier_field: String,
}

impl Default for ActionService {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionService {
    pub const DEFAULT_MAX_MODELS_PER_ACTION: usize = 100;

    pub fn new() -> Self {
        ActionService {
            collection: None,
            action_types: HashMap::new(),
            max_models_per_action: Self::DEFAULT_MAX_MODELS_PER_ACTION,
            identifier_field: "id".into(),
        }
    }

    pub fn from_settings(settings: &ActionSettings) -> Self {
        Self::new()
            .set_identifier_field(settings.identifier_field.clone())
            .set_max_models_per_action(settings.max_models_per_action)
    }

    pub fn set_action_model(mut self, collection: Arc<dyn Collection>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn set_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    pub fn set_max_models_per_action(mut self, max: usize) -> Self {
        self.max_models_per_action = max;
        self
    }

    pub fn add_action_type(mut self, name: impl Into<String>, action: Arc<dyn CrudAction>) -> Self {
        self.action_types.insert(name.into(), action);
        self
    }

    pub fn with_action_type(self, name: impl Into<String>, action: impl CrudAction + 'static) -> Self {
        self.add_action_type(name, Arc::new(action))
    }

    pub fn has_action_type(&self, name: &str) -> bool {
        self.action_types.contains_key(name)
    }

    pub fn max_models_per_action(&self) -> usize {
        self.max_models_per_action
    }

    /// Resolve `related_ids`, enforce the batch ceiling, then validate and handle.
    ///
    /// Over the ceiling the result is an error envelope and nothing is mutated. Callers check
    /// [`ActionService::has_action_type`] first; an unregistered type is an error.
    pub async fn process_action(
        &self,
        request: ActionRequest,
        user: Option<Arc<dyn Principal>>,
    ) -> Result<ActionResult, AppError> {
        let collection = self.collection.clone().ok_or_else(|| {
            ConfigError::ActionModelNotDefined(std::any::type_name::<Self>().to_string())
        })?;
        let action = self
            .action_types
            .get(&request.action_type)
            .cloned()
            .ok_or_else(|| AppError::UnknownActionType(request.action_type.clone()))?;

        let mut query = Query::new();
        query.where_in(self.identifier_field.clone(), request.related_ids);

        let matched = collection.count(&query).await?;
        if matched > self.max_models_per_action as u64 {
            tracing::warn!(
                action = %request.action_type,
                matched,
                max = self.max_models_per_action,
                "action rejected: too many records"
            );
            return Ok(ActionResult::error_message(format!(
                "The number of models to process exceeds the maximum allowed ({}).",
                self.max_models_per_action
            )));
        }

        let records = collection.fetch(&query, None).await?;
        tracing::info!(action = %request.action_type, collection = %collection.name(), records = records.len(), "processing action");
        let unit = ActionUnit::new(action, records, request.data, user, collection, self.identifier_field.clone());
        unit.process_action().await
    }
}
