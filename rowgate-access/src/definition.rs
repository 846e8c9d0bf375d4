//! Declarative per-table, per-verb permission definitions
//!
//! A [`PermissionDefinition`] describes what a single collection
//! operation requires before it may touch storage: which query
//! parameters must be present, which fields need an async permission
//! check, and optional pre-mutation / custom-insert hooks.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use rowgate_common::{CrudPermission, Error, PermissionKind, Result};

// ============================================================================
// Hook traits
// ============================================================================

/// Field-level async permission check.
///
/// Maps `(user_id, field value)` to a per-instance CRUD grant. Runs
/// concurrently across requests with no mutual exclusion; it must not
/// assume it is the only check in flight for a row.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn check(&self, user_id: &str, value: &JsonValue) -> Result<CrudPermission>;
}

/// Payload transform applied before persistence (e.g. encrypting a
/// sensitive field).
///
/// Validation and permission checks have already passed when this
/// runs, but the mutation itself can still fail afterwards — any
/// externally visible side effect here must therefore be idempotent.
#[async_trait]
pub trait PreAction: Send + Sync {
    async fn apply(&self, user_id: &str, body: JsonValue) -> Result<JsonValue>;
}

/// Custom insert strategy replacing the default "insert via resolved
/// table" path, enabling conflict-aware upserts.
#[async_trait]
pub trait Inserter: Send + Sync {
    async fn insert(&self, user_id: &str, body: JsonValue) -> Result<JsonValue>;
}

// ============================================================================
// Required parameters
// ============================================================================

/// Operator a required query parameter must be supplied with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl ParamOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamOperator::Eq => "eq",
            ParamOperator::Neq => "neq",
            ParamOperator::Gt => "gt",
            ParamOperator::Gte => "gte",
            ParamOperator::Lt => "lt",
            ParamOperator::Lte => "lte",
            ParamOperator::Like => "like",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(ParamOperator::Eq),
            "neq" => Some(ParamOperator::Neq),
            "gt" => Some(ParamOperator::Gt),
            "gte" => Some(ParamOperator::Gte),
            "lt" => Some(ParamOperator::Lt),
            "lte" => Some(ParamOperator::Lte),
            "like" => Some(ParamOperator::Like),
            _ => None,
        }
    }
}

/// Declared type of a required parameter's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValueType {
    Str,
    Number,
    Bool,
}

/// One required query parameter on an operation
#[derive(Debug, Clone)]
pub struct NeededParameter {
    pub name: String,
    pub operator: ParamOperator,
    pub value_type: ParamValueType,
    pub is_primary_id: bool,
}

impl NeededParameter {
    pub fn new(name: impl Into<String>, operator: ParamOperator) -> Self {
        Self {
            name: name.into(),
            operator,
            value_type: ParamValueType::Str,
            is_primary_id: false,
        }
    }

    pub fn typed(mut self, value_type: ParamValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn primary_id(mut self) -> Self {
        self.is_primary_id = true;
        self
    }
}

/// A query parameter as supplied by the caller, in `name[op]=value`
/// wire shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppliedParam {
    pub name: String,
    pub operator: ParamOperator,
    pub value: String,
}

impl SuppliedParam {
    pub fn new(name: impl Into<String>, operator: ParamOperator, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parse a raw query pair like `("id[eq]", "42")`. A bare name
    /// without brackets defaults to the `eq` operator.
    pub fn from_query_pair(key: &str, value: &str) -> Result<Self> {
        match key.split_once('[') {
            Some((name, rest)) => {
                let op = rest
                    .strip_suffix(']')
                    .and_then(ParamOperator::parse)
                    .ok_or_else(|| {
                        Error::Validation(format!("Malformed parameter key '{}'", key))
                    })?;
                Ok(Self::new(name, op, value))
            }
            None => Ok(Self::new(key, ParamOperator::Eq, value)),
        }
    }
}

// ============================================================================
// Permission definition
// ============================================================================

/// A field whose value must pass an async permission check
#[derive(Clone)]
pub struct FieldPermission {
    pub field: String,
    pub permission: PermissionKind,
    pub checker: Arc<dyn PermissionChecker>,
}

impl std::fmt::Debug for FieldPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldPermission")
            .field("field", &self.field)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// Everything one `(table, verb)` pair declares about an operation
#[derive(Clone, Default)]
pub struct PermissionDefinition {
    pub needed_parameters: Vec<NeededParameter>,
    pub check_permissions_for: Vec<FieldPermission>,
    pub pre_action: Option<Arc<dyn PreAction>>,
    pub inserter: Option<Arc<dyn Inserter>>,
}

impl PermissionDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a query parameter
    pub fn needs(mut self, parameter: NeededParameter) -> Self {
        self.needed_parameters.push(parameter);
        self
    }

    /// Run a permission checker against the named field of the
    /// request body (writes) or the fetched row (reads/deletes)
    pub fn checks(
        mut self,
        field: impl Into<String>,
        permission: PermissionKind,
        checker: Arc<dyn PermissionChecker>,
    ) -> Self {
        self.check_permissions_for.push(FieldPermission {
            field: field.into(),
            permission,
            checker,
        });
        self
    }

    pub fn with_pre_action(mut self, pre_action: Arc<dyn PreAction>) -> Self {
        self.pre_action = Some(pre_action);
        self
    }

    pub fn with_inserter(mut self, inserter: Arc<dyn Inserter>) -> Self {
        self.inserter = Some(inserter);
        self
    }
}

impl std::fmt::Debug for PermissionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionDefinition")
            .field("needed_parameters", &self.needed_parameters)
            .field("check_permissions_for", &self.check_permissions_for)
            .field("has_pre_action", &self.pre_action.is_some())
            .field("has_inserter", &self.inserter.is_some())
            .finish()
    }
}
