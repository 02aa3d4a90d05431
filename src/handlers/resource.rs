//! Resource handlers: list, all ids, find including, bulk action.

use crate::error::{AppError, ConfigError};
use crate::extractors::{MaybeUser, SearchParams};
use crate::response;
use crate::result::ActionResult;
use crate::service::{ActionRequest, ListService};
use crate::state::{AppState, Resource};
use crate::validation::{validate, ValidationRules};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const INVALID_ACTION_TYPE: &str = "The action type is not valid.";

const LIST_RULES: [(&str, &str); 7] = [
    ("per_page", "nullable|integer|min:0|max:10000"),
    ("page", "nullable|integer|min:1"),
    ("keyword", "nullable|string"),
    ("sort_field", "nullable|string"),
    ("sort_direction", "nullable|string"),
    ("belongs_to", "nullable|string"),
    ("relation_id", "nullable|string"),
];

const ACTION_RULES: [(&str, &str); 3] = [
    ("type", "required|string|max:250"),
    ("relatedIds", "required|array"),
    ("data", "present"),
];

fn rules(pairs: &[(&str, &str)]) -> Result<ValidationRules, AppError> {
    ValidationRules::parse(pairs.iter().copied()).map_err(|e| AppError::Config(ConfigError::Validation(e)))
}

fn resource(state: &AppState, name: &str) -> Result<Arc<Resource>, AppError> {
    state
        .resources
        .get(name)
        .ok_or_else(|| AppError::NotFound(format!("resource '{}'", name)))
}

/// Query parameters into a configured list service. `rejected` wraps the validation summary:
/// listing and lookup answer 400, the identifier listing 422.
fn list_service(
    resource: &Resource,
    params: Map<String, Value>,
    rejected: fn(String) -> AppError,
) -> Result<ListService, AppError> {
    let errors = validate(&Value::Object(params.clone()), &rules(&LIST_RULES)?);
    if let Some(summary) = errors.summary() {
        return Err(rejected(summary));
    }
    Ok(params
        .into_iter()
        .fold(resource.list_service(), |service, (k, v)| service.set_search_configuration_value(&k, v)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    SearchParams(params): SearchParams,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource(&state, &name)?;
    let results = list_service(&resource, params, AppError::BadRequest)?.get_results().await?;
    let count = results.count_items();
    Ok(response::listing(results, count))
}

pub async fn all_ids(
    State(state): State<AppState>,
    Path(name): Path<String>,
    SearchParams(params): SearchParams,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource(&state, &name)?;
    let ids = list_service(&resource, params, AppError::Validation)?.get_all_ids().await?;
    let count = ids.len() as u64;
    Ok(response::listing(ids, count))
}

pub async fn find_including(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    SearchParams(params): SearchParams,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource(&state, &name)?;
    let record = list_service(&resource, params, AppError::BadRequest)?
        .find_including(Value::String(id.clone()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} '{}'", name, id)))?;
    Ok(response::one(record))
}

pub async fn handle_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
    MaybeUser(user): MaybeUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let resource = resource(&state, &name)?;
    let errors = validate(&body, &rules(&ACTION_RULES)?);
    if let Some(summary) = errors.summary() {
        return Ok(response::action_result(&ActionResult::error(errors.into_fields(), summary)));
    }
    let request: ActionRequest =
        serde_json::from_value(body).map_err(|e| AppError::BadRequest(format!("invalid action body: {}", e)))?;

    let service = resource.action_service();
    if !service.has_action_type(&request.action_type) {
        tracing::debug!(resource = %name, action = %request.action_type, "unknown action type");
        let result = ActionResult::error([("type", INVALID_ACTION_TYPE)], INVALID_ACTION_TYPE);
        return Ok(response::action_result(&result));
    }
    let result = service.process_action(request, user).await?;
    Ok(response::action_result(&result))
}
