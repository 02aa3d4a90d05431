//! Bulk delete: removes every resolved record the user may delete.

use super::{ActionUnit, CrudAction};
use crate::error::AppError;
use crate::query::field;
use crate::result::ActionResult;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct DeleteAction;

#[async_trait]
impl CrudAction for DeleteAction {
    fn name(&self) -> &str {
        "delete"
    }

    async fn handle(&self, unit: &ActionUnit) -> Result<ActionResult, AppError> {
        let user = unit.user().ok_or(AppError::Unauthenticated)?;
        let id_field = unit.identifier_field();
        let mut deleted = Vec::new();
        for record in unit.records() {
            if !user.can("delete", record) {
                tracing::debug!(id = %field(record, id_field), "delete denied");
                continue;
            }
            let id = field(record, id_field).clone();
            if unit.collection().delete(id_field, &id).await? {
                deleted.push(id);
            }
        }
        let n = deleted.len();
        tracing::info!(collection = %unit.collection().name(), deleted = n, "delete action done");
        let message = format!("Deleted {} {} successfully", n, if n == 1 { "item" } else { "items" });
        let mut data = Map::new();
        data.insert("delete_count".into(), Value::from(n));
        data.insert("delete_elems".into(), Value::Array(deleted));
        Ok(unit.success(message, data))
    }
}
