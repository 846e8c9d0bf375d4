//! Rowgate access layer
//!
//! Authorizes and executes collection operations on top of the query
//! crate: declarative per-table, per-verb permission definitions,
//! frozen boot-time registries, a pluggable storage backend, and the
//! [`AccessEngine`] state machine tying them together.

pub mod backend;
pub mod definition;
pub mod engine;
pub mod registry;

pub use backend::{MemoryBackend, StorageBackend};
pub use definition::{
    FieldPermission, Inserter, NeededParameter, ParamOperator, ParamValueType,
    PermissionChecker, PermissionDefinition, PreAction, SuppliedParam,
};
pub use engine::{AccessEngine, ListRequest};
pub use registry::{
    CollectionPlugin, CollectionRegistry, PermissionMap, PermissionRegistry, RegistryBuilder,
};
