//! Common types for the collection access layer

use serde::{Deserialize, Serialize};

// ============================================================================
// Verbs & Permissions
// ============================================================================

/// Collection operation verb, keyed the way the route layer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// The permission flag a field-level checker must grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Read,
    Write,
    Delete,
    Create,
}

/// Per-instance CRUD grant returned by a permission checker
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudPermission {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub create: bool,
}

impl CrudPermission {
    /// Grant everything
    pub fn allow_all() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
            create: true,
        }
    }

    /// Grant nothing
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Grant only reads
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Whether the grant carries the given flag
    pub fn allows(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Read => self.read,
            PermissionKind::Write => self.write,
            PermissionKind::Delete => self.delete,
            PermissionKind::Create => self.create,
        }
    }
}

/// Sort direction for the single-column ordering helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

// ============================================================================
// Response Types
// ============================================================================

/// Standard API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<&crate::error::Error> for ApiError {
    fn from(err: &crate::error::Error) -> Self {
        ApiError::new(err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud_permission_flags() {
        let perm = CrudPermission::read_only();
        assert!(perm.allows(PermissionKind::Read));
        assert!(!perm.allows(PermissionKind::Write));
        assert!(!perm.allows(PermissionKind::Delete));
        assert!(!perm.allows(PermissionKind::Create));

        assert!(CrudPermission::allow_all().allows(PermissionKind::Delete));
        assert!(!CrudPermission::deny_all().allows(PermissionKind::Read));
    }

    #[test]
    fn test_verb_serde() {
        let json = serde_json::to_string(&Verb::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
        let verb: Verb = serde_json::from_str("\"GET\"").unwrap();
        assert_eq!(verb, Verb::Get);
    }

    #[test]
    fn test_api_error() {
        let error = ApiError::new("validation_error", "Missing required parameter")
            .with_hint("Supply id[eq]");
        assert_eq!(error.code, "validation_error");
        assert!(error.hint.is_some());
    }
}
