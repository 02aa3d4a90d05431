//! Shared application state: the resources exposed over HTTP.

use crate::action::{CrudAction, DeleteAction};
use crate::config::{ActionSettings, ListSettings, ResolvedModel};
use crate::error::ConfigError;
use crate::filter::{CustomFilter, KeywordFilter};
use crate::service::{ActionService, ListService};
use crate::storage::{Collection, PgCollection};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One listable, actionable collection and everything needed to build its per-request services.
pub struct Resource {
    pub collection: Arc<dyn Collection>,
    pub list: ListSettings,
    pub actions: ActionSettings,
    pub custom_filters: Vec<Arc<dyn CustomFilter>>,
    pub keyword_filter: Option<Arc<dyn KeywordFilter>>,
    pub action_types: HashMap<String, Arc<dyn CrudAction>>,
}

impl Resource {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Resource {
            collection,
            list: ListSettings::default(),
            actions: ActionSettings::default(),
            custom_filters: Vec::new(),
            keyword_filter: None,
            action_types: HashMap::new(),
        }
    }

    pub fn with_list_settings(mut self, settings: ListSettings) -> Self {
        self.list = settings;
        self
    }

    pub fn with_action_settings(mut self, settings: ActionSettings) -> Self {
        self.actions = settings;
        self
    }

    pub fn with_custom_filter(mut self, filter: impl CustomFilter + 'static) -> Self {
        self.custom_filters.push(Arc::new(filter));
        self
    }

    pub fn with_keyword_filter(mut self, filter: impl KeywordFilter + 'static) -> Self {
        self.keyword_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_action_type(mut self, name: impl Into<String>, action: impl CrudAction + 'static) -> Self {
        self.action_types.insert(name.into(), Arc::new(action));
        self
    }

    /// Fresh list service for one request.
    pub fn list_service(&self) -> ListService {
        let mut service = ListService::from_settings(&self.list).set_list_model(self.collection.clone());
        for f in &self.custom_filters {
            service = service.add_custom_filter(f.clone());
        }
        if let Some(k) = &self.keyword_filter {
            service = service.set_keyword_filter(k.clone());
        }
        service
    }

    /// Fresh action service for one request.
    pub fn action_service(&self) -> ActionService {
        self.action_types.iter().fold(
            ActionService::from_settings(&self.actions).set_action_model(self.collection.clone()),
            |service, (name, action)| service.add_action_type(name.clone(), action.clone()),
        )
    }
}

#[derive(Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<String, Arc<Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, resource: Resource) -> Self {
        self.resources.insert(name.into(), Arc::new(resource));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<Resource>> {
        self.resources.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// One PostgreSQL-backed resource per entity, each with the `delete` action.
    pub fn from_model(pool: &PgPool, model: &ResolvedModel) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for entity in &model.entities {
            let collection = PgCollection::from_model(pool.clone(), model, &entity.name)?;
            let resource = Resource::new(Arc::new(collection))
                .with_list_settings(entity.list.clone())
                .with_action_settings(entity.actions.clone())
                .with_action_type("delete", DeleteAction);
            registry = registry.register(entity.name.clone(), resource);
        }
        Ok(registry)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<ResourceRegistry>,
}

impl AppState {
    pub fn new(resources: ResourceRegistry) -> Self {
        AppState {
            resources: Arc::new(resources),
        }
    }
}
