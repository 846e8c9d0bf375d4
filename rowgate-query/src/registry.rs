//! Table registry and name resolver
//!
//! The registry is assembled once at process start (built-in schemas
//! plus plugin-contributed tables) and frozen; request handling only
//! ever reads it, so it is a plain map shared by `Arc` with no locks.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use rowgate_common::{Error, Result};

/// A table contribution: the unit both built-in schemas and collection
/// plugins register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableDef {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resolver output for one canonical table; lives as long as the
/// registry itself.
#[derive(Debug, Clone)]
pub struct TableHandle {
    name: String,
    columns: BTreeSet<String>,
}

impl TableHandle {
    /// Canonical table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a column identifier, failing with the table and column
    /// both named.
    pub fn column(&self, column: &str) -> Result<&str> {
        self.columns
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| Error::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

/// Immutable table registry, built once at boot
#[derive(Debug)]
pub struct TableRegistry {
    tables: HashMap<String, TableHandle>,
}

impl TableRegistry {
    pub fn builder() -> TableRegistryBuilder {
        TableRegistryBuilder::default()
    }

    /// Normalize an external-facing (possibly hyphenated) table name to
    /// its canonical registry key: `user-groups` becomes `userGroups`.
    ///
    /// Fails with [`Error::TableNotFound`] naming the raw input
    /// verbatim when no such table is registered.
    pub fn normalize_table_name(&self, raw: &str) -> Result<String> {
        let canonical = camelize(raw);
        if self.tables.contains_key(&canonical) {
            Ok(canonical)
        } else {
            Err(Error::TableNotFound(raw.to_string()))
        }
    }

    /// Resolve a canonical table name to its handle
    pub fn resolve(&self, name: &str) -> Result<&TableHandle> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

/// Collects table contributions, then freezes them into a registry
#[derive(Debug, Default)]
pub struct TableRegistryBuilder {
    tables: Vec<TableDef>,
}

impl TableRegistryBuilder {
    pub fn table(mut self, def: TableDef) -> Self {
        self.tables.push(def);
        self
    }

    pub fn tables<I>(mut self, defs: I) -> Self
    where
        I: IntoIterator<Item = TableDef>,
    {
        self.tables.extend(defs);
        self
    }

    /// Freeze the collected contributions. A table registered twice
    /// merges its column sets (a plugin may extend a built-in table).
    pub fn build(self) -> TableRegistry {
        let mut tables: HashMap<String, TableHandle> = HashMap::new();
        for def in self.tables {
            let handle = tables.entry(def.name.clone()).or_insert_with(|| TableHandle {
                name: def.name.clone(),
                columns: BTreeSet::new(),
            });
            handle.columns.extend(def.columns);
        }
        tracing::info!(tables = tables.len(), "table registry frozen");
        TableRegistry { tables }
    }
}

/// Hyphen-to-camel normalization: drop each hyphen and uppercase the
/// character that followed it.
fn camelize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut upper_next = false;
    for c in raw.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TableRegistry {
        TableRegistry::builder()
            .table(TableDef::new("users", ["id", "name", "email"]))
            .table(TableDef::new("userGroups", ["id", "userId", "groupId"]))
            .build()
    }

    #[test]
    fn test_normalize_hyphenated_name() {
        let reg = registry();
        assert_eq!(reg.normalize_table_name("user-groups").unwrap(), "userGroups");
        assert_eq!(reg.normalize_table_name("users").unwrap(), "users");
    }

    #[test]
    fn test_unknown_name_is_reported_verbatim() {
        let err = registry().normalize_table_name("user-groupz").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(ref name) if name == "user-groupz"));
    }

    #[test]
    fn test_resolve_and_column_lookup() {
        let reg = registry();
        let handle = reg.resolve("users").unwrap();
        assert_eq!(handle.column("email").unwrap(), "email");

        let err = handle.column("age").unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnNotFound { ref table, ref column }
                if table == "users" && column == "age"
        ));
    }

    #[test]
    fn test_resolve_unknown_table() {
        let err = registry().resolve("sessions").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(_)));
    }

    #[test]
    fn test_duplicate_registration_merges_columns() {
        let reg = TableRegistry::builder()
            .table(TableDef::new("files", ["id", "name"]))
            .table(TableDef::new("files", ["bucket"]))
            .build();
        let handle = reg.resolve("files").unwrap();
        assert!(handle.has_column("name"));
        assert!(handle.has_column("bucket"));
    }
}
