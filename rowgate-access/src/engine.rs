//! Permission-checked access engine
//!
//! Every collection operation runs the same state machine:
//!
//! ```text
//! resolve table → get definition → validate parameters
//!   → (update/delete) fetch existing row → check permissions
//!   → pre-action → mutate (inserter | default) → return
//! ```
//!
//! Any step's failure short-circuits the rest. No mutation is applied
//! once validation or a permission check fails; a pre-action or
//! inserter failure happens after those checks, so partial external
//! effects are possible there and the hooks are documented as needing
//! idempotency.

use serde_json::Value as JsonValue;
use std::sync::Arc;

use rowgate_common::{AccessConfig, Error, Result, SortDirection, Verb};
use rowgate_query::{compile, order_by, parse_filter_clause};

use crate::backend::StorageBackend;
use crate::definition::{ParamValueType, PermissionDefinition, SuppliedParam};
use crate::registry::CollectionRegistry;

/// A list request against one collection
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Raw filter clause; absent means "match everything"
    pub filter: Option<String>,
    /// Single-column ordering
    pub order: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Supplied query parameters, validated against `neededParameters`
    pub params: Vec<SuppliedParam>,
}

/// The permission-checked access layer between requests and storage
pub struct AccessEngine {
    registry: CollectionRegistry,
    backend: Arc<dyn StorageBackend>,
    config: AccessConfig,
}

impl AccessEngine {
    pub fn new(
        registry: CollectionRegistry,
        backend: Arc<dyn StorageBackend>,
        config: AccessConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            config,
        }
    }

    /// The registry this engine authorizes against
    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    // ========================================================================
    // Mid-level operations (also exposed for the route layer)
    // ========================================================================

    /// Look up the permission definition for a table+verb pair
    pub fn definition_for_method(&self, table: &str, verb: Verb) -> Result<&PermissionDefinition> {
        self.registry.permissions.definition_for_method(table, verb)
    }

    /// Check that every declared required parameter was supplied with
    /// the declared operator. This is how, for example, a DELETE is
    /// forced to filter by a specific key instead of matching
    /// everything.
    pub fn validate_required_parameters(
        &self,
        definition: &PermissionDefinition,
        supplied: &[SuppliedParam],
    ) -> Result<()> {
        for needed in &definition.needed_parameters {
            let found = supplied.iter().find(|p| p.name == needed.name);
            match found {
                None => {
                    return Err(Error::Validation(format!(
                        "Missing required parameter '{}[{}]'",
                        needed.name,
                        needed.operator.as_str()
                    )));
                }
                Some(param) if param.operator != needed.operator => {
                    return Err(Error::Validation(format!(
                        "Parameter '{}' must use operator '{}', got '{}'",
                        needed.name,
                        needed.operator.as_str(),
                        param.operator.as_str()
                    )));
                }
                Some(param) => {
                    if !value_matches_type(&param.value, needed.value_type) {
                        return Err(Error::Validation(format!(
                            "Parameter '{}' has the wrong value type",
                            needed.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the definition's field checkers against a request body
    pub async fn check_permissions_via_body(
        &self,
        definition: &PermissionDefinition,
        user_id: &str,
        body: &JsonValue,
    ) -> Result<()> {
        self.check_permissions(definition, user_id, body).await
    }

    /// Run the definition's field checkers against a fetched row
    pub async fn check_permissions_via_row(
        &self,
        definition: &PermissionDefinition,
        user_id: &str,
        row: &JsonValue,
    ) -> Result<()> {
        self.check_permissions(definition, user_id, row).await
    }

    /// Fetch the row addressed by the primary-id parameter and run the
    /// definition's field checkers against it. This is the read-side
    /// counterpart of [`Self::check_permissions_via_body`]: the checked
    /// subject is what storage holds, not what the caller sent.
    pub async fn check_permissions_via_url_params(
        &self,
        definition: &PermissionDefinition,
        user_id: &str,
        table: &str,
        params: &[SuppliedParam],
    ) -> Result<JsonValue> {
        let id_param = definition
            .needed_parameters
            .iter()
            .find(|needed| needed.is_primary_id)
            .and_then(|needed| params.iter().find(|p| p.name == needed.name))
            .ok_or_else(|| {
                Error::Validation("Missing primary id parameter".to_string())
            })?;
        let row = self
            .backend
            .find_by_id(table, &id_param.value)
            .await?
            .ok_or_else(|| Error::RowNotFound(id_param.value.clone()))?;
        self.check_permissions(definition, user_id, &row).await?;
        Ok(row)
    }

    /// Extract each declared field from the subject, normalize
    /// non-arrays to a single element, and require every checker
    /// result to carry the declared permission flag.
    async fn check_permissions(
        &self,
        definition: &PermissionDefinition,
        user_id: &str,
        subject: &JsonValue,
    ) -> Result<()> {
        for field in &definition.check_permissions_for {
            let value = subject.get(&field.field).cloned().unwrap_or(JsonValue::Null);
            let elements = match value {
                JsonValue::Array(items) => items,
                single => vec![single],
            };
            for element in &elements {
                let grant = field.checker.check(user_id, element).await?;
                if !grant.allows(field.permission) {
                    tracing::warn!(
                        field = %field.field,
                        permission = ?field.permission,
                        "permission checker denied access"
                    );
                    return Err(Error::NoPermission);
                }
            }
        }
        Ok(())
    }

    /// Apply the optional pre-mutation transform; failures surface as
    /// validation errors.
    pub async fn apply_pre_action(
        &self,
        definition: &PermissionDefinition,
        user_id: &str,
        body: JsonValue,
    ) -> Result<JsonValue> {
        match &definition.pre_action {
            Some(pre_action) => match pre_action.apply(user_id, body).await {
                Ok(body) => Ok(body),
                Err(Error::Validation(message)) => Err(Error::Validation(message)),
                Err(other) => Err(Error::Validation(other.to_string())),
            },
            None => Ok(body),
        }
    }

    // ========================================================================
    // Collection operations
    // ========================================================================

    /// GET /{table} — list rows matching an optional filter clause
    pub async fn list(
        &self,
        user_id: &str,
        raw_table: &str,
        request: ListRequest,
    ) -> Result<Vec<JsonValue>> {
        let table = self.registry.tables.normalize_table_name(raw_table)?;
        let definition = self.definition_for_method(&table, Verb::Get)?;
        self.validate_required_parameters(definition, &request.params)?;

        let ast = match &request.filter {
            Some(filter) => parse_filter_clause(filter)?,
            None => None,
        };
        let mut conditions = compile(&self.registry.tables, &table, ast.as_ref())?;
        let condition = conditions.remove(&table);

        let order = match &request.order {
            Some((column, direction)) => Some(order_by(
                &self.registry.tables,
                &table,
                column,
                *direction,
            )?),
            None => None,
        };

        let limit = request
            .limit
            .map_or(self.config.max_rows, |l| l.min(self.config.max_rows));

        tracing::debug!(%table, filtered = condition.is_some(), "listing collection");
        let rows = self
            .backend
            .select(&table, condition.as_ref(), order.as_ref(), Some(limit), request.offset)
            .await?;

        // Read permissions run against each fetched row, never the
        // request.
        for row in &rows {
            self.check_permissions(definition, user_id, row).await?;
        }
        Ok(rows)
    }

    /// GET /{table}/{id} — fetch a single row
    pub async fn get_one(
        &self,
        user_id: &str,
        raw_table: &str,
        id: &str,
        params: &[SuppliedParam],
    ) -> Result<JsonValue> {
        let table = self.registry.tables.normalize_table_name(raw_table)?;
        let definition = self.definition_for_method(&table, Verb::Get)?;
        self.validate_required_parameters(definition, params)?;

        let row = self
            .backend
            .find_by_id(&table, id)
            .await?
            .ok_or_else(|| Error::RowNotFound(id.to_string()))?;
        self.check_permissions(definition, user_id, &row).await?;
        Ok(row)
    }

    /// POST /{table} — create a row
    pub async fn create(
        &self,
        user_id: &str,
        raw_table: &str,
        body: JsonValue,
        params: &[SuppliedParam],
    ) -> Result<JsonValue> {
        let table = self.registry.tables.normalize_table_name(raw_table)?;
        let definition = self.definition_for_method(&table, Verb::Post)?;
        self.validate_required_parameters(definition, params)?;
        if !body.is_object() {
            return Err(Error::Validation("Request body must be an object".into()));
        }

        // Create permissions run against the incoming body.
        self.check_permissions(definition, user_id, &body).await?;
        let mut body = self.apply_pre_action(definition, user_id, body).await?;

        if let Some(inserter) = &definition.inserter {
            return inserter.insert(user_id, body).await;
        }

        if self.config.generate_missing_ids && body.get("id").is_none() {
            body["id"] = JsonValue::String(uuid::Uuid::new_v4().to_string());
        }
        self.backend.insert(&table, body).await
    }

    /// PUT /{table}/{id} — update a row with the merged-row strategy
    pub async fn update(
        &self,
        user_id: &str,
        raw_table: &str,
        id: &str,
        body: JsonValue,
        params: &[SuppliedParam],
    ) -> Result<JsonValue> {
        let table = self.registry.tables.normalize_table_name(raw_table)?;
        let definition = self.definition_for_method(&table, Verb::Put)?;
        self.validate_required_parameters(definition, params)?;

        // The existing row is fetched before any mutation, and write
        // permissions run against it rather than the incoming body —
        // a forged payload must not be able to grant itself access.
        let existing = self
            .backend
            .find_by_id(&table, id)
            .await?
            .ok_or_else(|| Error::RowNotFound(id.to_string()))?;
        self.check_permissions(definition, user_id, &existing).await?;

        let body = self.apply_pre_action(definition, user_id, body).await?;

        if let Some(inserter) = &definition.inserter {
            return inserter.insert(user_id, body).await;
        }

        let merged = merge_rows(&existing, body)?;
        self.backend.update(&table, id, merged).await
    }

    /// DELETE /{table}/{id} — delete a row
    pub async fn delete(
        &self,
        user_id: &str,
        raw_table: &str,
        id: &str,
        params: &[SuppliedParam],
    ) -> Result<u64> {
        let table = self.registry.tables.normalize_table_name(raw_table)?;
        let definition = self.definition_for_method(&table, Verb::Delete)?;
        self.validate_required_parameters(definition, params)?;

        let existing = self
            .backend
            .find_by_id(&table, id)
            .await?
            .ok_or_else(|| Error::RowNotFound(id.to_string()))?;
        self.check_permissions(definition, user_id, &existing).await?;

        self.backend.delete(&table, id).await
    }
}

fn value_matches_type(value: &str, value_type: ParamValueType) -> bool {
    match value_type {
        ParamValueType::Str => true,
        ParamValueType::Number => value.parse::<f64>().is_ok(),
        ParamValueType::Bool => matches!(value, "true" | "false"),
    }
}

/// Merge an update body over the existing row: unset fields keep the
/// existing value, and the row identifier is never client-overridable.
fn merge_rows(existing: &JsonValue, body: JsonValue) -> Result<JsonValue> {
    let JsonValue::Object(patch) = body else {
        return Err(Error::Validation("Update body must be an object".into()));
    };
    let mut merged = existing
        .as_object()
        .cloned()
        .unwrap_or_default();
    for (key, value) in patch {
        merged.insert(key, value);
    }
    if let Some(id) = existing.get("id") {
        merged.insert("id".to_string(), id.clone());
    }
    Ok(JsonValue::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_rows_keeps_unset_fields_and_id() {
        let existing = json!({"id": 1, "name": "old.png", "bucket": "b"});
        let merged = merge_rows(&existing, json!({"name": "a.png", "id": 999})).unwrap();
        assert_eq!(merged, json!({"id": 1, "name": "a.png", "bucket": "b"}));
    }

    #[test]
    fn test_merge_rows_rejects_non_object_body() {
        let existing = json!({"id": 1});
        let err = merge_rows(&existing, json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
