//! Boot-time registry of tables and permission definitions
//!
//! Built-in definitions and plugin contributions are merged exactly
//! once, then frozen. Request handling only reads the result, so both
//! registries are plain maps behind `Arc` — no locks, no per-request
//! mutation, and a hot reload (out of scope) would have to swap the
//! whole value atomically.

use std::collections::HashMap;
use std::sync::Arc;

use rowgate_common::{Error, Result, Verb};
use rowgate_query::{TableDef, TableRegistry};

use crate::definition::PermissionDefinition;

/// Table name → verb → definition
pub type PermissionMap = HashMap<String, HashMap<Verb, PermissionDefinition>>;

/// Contract an external collection plugin must satisfy.
///
/// Plugins are statically linked and registered explicitly on the
/// builder by the process entry point; there is no filesystem
/// discovery.
pub trait CollectionPlugin: Send + Sync {
    /// Plugin name, for boot logging only
    fn name(&self) -> &str;
    /// Tables this plugin contributes to the table registry
    fn tables(&self) -> Vec<TableDef>;
    /// Permission definitions this plugin contributes
    fn permissions(&self) -> PermissionMap;
}

/// Frozen verb-keyed permission registry
pub struct PermissionRegistry {
    by_table: PermissionMap,
}

impl PermissionRegistry {
    /// The single authorization gate for every collection operation.
    /// An unregistered `(table, verb)` pair never falls open.
    pub fn definition_for_method(&self, table: &str, verb: Verb) -> Result<&PermissionDefinition> {
        self.by_table
            .get(table)
            .and_then(|verbs| verbs.get(&verb))
            .ok_or_else(|| Error::DefinitionNotFound {
                table: table.to_string(),
                verb,
            })
    }

    pub fn has_definition(&self, table: &str, verb: Verb) -> bool {
        self.by_table
            .get(table)
            .is_some_and(|verbs| verbs.contains_key(&verb))
    }
}

/// The immutable output of [`RegistryBuilder::build`]: everything the
/// access engine needs to resolve names and authorize operations.
#[derive(Clone)]
pub struct CollectionRegistry {
    pub tables: Arc<TableRegistry>,
    pub permissions: Arc<PermissionRegistry>,
}

/// Collects built-in and plugin contributions, then freezes them
#[derive(Default)]
pub struct RegistryBuilder {
    tables: Vec<TableDef>,
    permissions: PermissionMap,
    plugin_count: usize,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in table
    pub fn table(mut self, def: TableDef) -> Self {
        self.tables.push(def);
        self
    }

    /// Register a built-in permission definition for one table+verb
    pub fn permission(
        mut self,
        table: impl Into<String>,
        verb: Verb,
        def: PermissionDefinition,
    ) -> Self {
        self.permissions
            .entry(table.into())
            .or_default()
            .insert(verb, def);
        self
    }

    /// Merge a plugin's tables and permission definitions. A plugin
    /// definition for an already-registered table+verb replaces the
    /// built-in one.
    pub fn plugin(mut self, plugin: &dyn CollectionPlugin) -> Self {
        tracing::debug!(plugin = plugin.name(), "merging collection plugin");
        self.tables.extend(plugin.tables());
        for (table, verbs) in plugin.permissions() {
            let entry = self.permissions.entry(table).or_default();
            for (verb, def) in verbs {
                entry.insert(verb, def);
            }
        }
        self.plugin_count += 1;
        self
    }

    /// Freeze everything into the immutable registry pair
    pub fn build(self) -> CollectionRegistry {
        let tables = TableRegistry::builder().tables(self.tables).build();
        let definition_count: usize = self.permissions.values().map(HashMap::len).sum();
        tracing::info!(
            definitions = definition_count,
            plugins = self.plugin_count,
            "permission registry frozen"
        );
        CollectionRegistry {
            tables: Arc::new(tables),
            permissions: Arc::new(PermissionRegistry {
                by_table: self.permissions,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{NeededParameter, ParamOperator};

    struct AuditPlugin;

    impl CollectionPlugin for AuditPlugin {
        fn name(&self) -> &str {
            "audit"
        }

        fn tables(&self) -> Vec<TableDef> {
            vec![TableDef::new("auditEvents", ["id", "actorId", "action"])]
        }

        fn permissions(&self) -> PermissionMap {
            let mut map = PermissionMap::new();
            map.entry("auditEvents".to_string())
                .or_default()
                .insert(Verb::Get, PermissionDefinition::new());
            map
        }
    }

    #[test]
    fn test_definition_lookup() {
        let registry = RegistryBuilder::new()
            .table(TableDef::new("users", ["id", "name"]))
            .permission(
                "users",
                Verb::Delete,
                PermissionDefinition::new()
                    .needs(NeededParameter::new("id", ParamOperator::Eq).primary_id()),
            )
            .build();

        let def = registry
            .permissions
            .definition_for_method("users", Verb::Delete)
            .unwrap();
        assert_eq!(def.needed_parameters.len(), 1);
    }

    #[test]
    fn test_unregistered_pair_never_falls_open() {
        let registry = RegistryBuilder::new()
            .table(TableDef::new("users", ["id"]))
            .permission("users", Verb::Get, PermissionDefinition::new())
            .build();

        let err = registry
            .permissions
            .definition_for_method("users", Verb::Delete)
            .unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));
        assert!(err.to_string().contains("No permission definition found"));

        let err = registry
            .permissions
            .definition_for_method("ghosts", Verb::Get)
            .unwrap_err();
        assert!(matches!(err, Error::DefinitionNotFound { .. }));
    }

    #[test]
    fn test_plugin_contribution_resolves_like_builtin() {
        let registry = RegistryBuilder::new()
            .table(TableDef::new("users", ["id"]))
            .plugin(&AuditPlugin)
            .build();

        // Plugin table is resolvable, hyphenated form included.
        assert_eq!(
            registry.tables.normalize_table_name("audit-events").unwrap(),
            "auditEvents"
        );
        assert!(registry.permissions.has_definition("auditEvents", Verb::Get));
        assert!(!registry.permissions.has_definition("auditEvents", Verb::Post));
    }
}
