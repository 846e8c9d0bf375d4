//! Error types for the collection access layer

use thiserror::Error;

use crate::types::Verb;

/// Failure taxonomy shared by the query compiler and the access engine.
///
/// Every variant is local and non-fatal: it describes either a
/// malformed request or a structural authorization denial, never a
/// transient fault, so no variant should be retried automatically.
#[derive(Error, Debug)]
pub enum Error {
    // Filter text errors
    #[error("Syntax error: {0}")]
    Syntax(String),

    // Schema errors
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    #[error("Operator not supported: {0}")]
    UnsupportedOperator(String),

    // Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Authorization errors
    #[error("No Permission")]
    NoPermission,

    // Lookup errors
    #[error("No permission definition found for {table} {verb}")]
    DefinitionNotFound { table: String, verb: Verb },

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for rowgate operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status code the (out-of-scope) route layer should map this to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Syntax(_) | Self::Validation(_) => 400,

            Self::NoPermission => 403,

            Self::TableNotFound(_)
            | Self::ColumnNotFound { .. }
            | Self::DefinitionNotFound { .. }
            | Self::RowNotFound(_) => 404,

            Self::UnsupportedOperator(_) => 501,

            Self::Json(_) => 500,
        }
    }

    /// Stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "syntax_error",
            Self::TableNotFound(_) => "table_not_found",
            Self::ColumnNotFound { .. } => "column_not_found",
            Self::UnsupportedOperator(_) => "unsupported_operator",
            Self::Validation(_) => "validation_error",
            Self::NoPermission => "no_permission",
            Self::DefinitionNotFound { .. } => "definition_not_found",
            Self::RowNotFound(_) => "row_not_found",
            Self::Json(_) => "json_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::Syntax("bad".into()).status_code(), 400);
        assert_eq!(Error::NoPermission.status_code(), 403);
        assert_eq!(Error::TableNotFound("x".into()).status_code(), 404);
        assert_eq!(
            Error::UnsupportedOperator("?>".into()).status_code(),
            501
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::ColumnNotFound {
                table: "users".into(),
                column: "nope".into()
            }
            .error_code(),
            "column_not_found"
        );
        assert_eq!(Error::NoPermission.error_code(), "no_permission");
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = Error::TableNotFound("user-groupz".into());
        assert!(err.to_string().contains("user-groupz"));

        let err = Error::ColumnNotFound {
            table: "files".into(),
            column: "sise".into(),
        };
        assert!(err.to_string().contains("files.sise"));
    }
}
