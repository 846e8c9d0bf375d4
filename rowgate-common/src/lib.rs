//! Shared types for the rowgate collection access layer
//!
//! Holds the error taxonomy, the verb/permission vocabulary, and the
//! engine configuration used by every other rowgate crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::AccessConfig;
pub use error::{Error, Result};
pub use types::{ApiError, CrudPermission, PermissionKind, SortDirection, Verb};
