//! Storage backend contract and the in-memory implementation
//!
//! The engine talks to storage exclusively through [`StorageBackend`];
//! a relational engine translates compiled conditions into its own
//! predicate language, while [`MemoryBackend`] evaluates them row by
//! row for development and tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use rowgate_common::{Error, Result, SortDirection};
use rowgate_query::{Condition, OrderSpec};

/// Asynchronous row storage for one process.
///
/// Implementations own durability and row-level concurrency control;
/// this layer never serializes mutations itself.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch rows matching a compiled condition, in the given order
    async fn select(
        &self,
        table: &str,
        condition: Option<&Condition>,
        order: Option<&OrderSpec>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<JsonValue>>;

    /// Fetch a single row by its identifier
    async fn find_by_id(&self, table: &str, id: &str) -> Result<Option<JsonValue>>;

    /// Insert a complete row, returning it as stored
    async fn insert(&self, table: &str, row: JsonValue) -> Result<JsonValue>;

    /// Replace the row with the given identifier
    async fn update(&self, table: &str, id: &str, row: JsonValue) -> Result<JsonValue>;

    /// Delete the row with the given identifier, returning the number
    /// of rows removed
    async fn delete(&self, table: &str, id: &str) -> Result<u64>;
}

/// In-memory backend for development and testing
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<JsonValue>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a table with rows
    pub fn with_rows(self, table: impl Into<String>, rows: Vec<JsonValue>) -> Self {
        self.tables.write().insert(table.into(), rows);
        self
    }

    fn row_id_matches(row: &JsonValue, id: &str) -> bool {
        match row.get("id") {
            Some(JsonValue::String(s)) => s == id,
            Some(JsonValue::Number(n)) => n.to_string() == id,
            _ => false,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn select(
        &self,
        table: &str,
        condition: Option<&Condition>,
        order: Option<&OrderSpec>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<JsonValue>> {
        let tables = self.tables.read();
        let mut rows: Vec<JsonValue> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| condition.map_or(true, |c| c.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(spec) = order {
            rows.sort_by(|a, b| {
                let ordering = compare_fields(a.get(&spec.column), b.get(&spec.column));
                match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_by_id(&self, table: &str, id: &str) -> Result<Option<JsonValue>> {
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| Self::row_id_matches(row, id)))
            .cloned())
    }

    async fn insert(&self, table: &str, mut row: JsonValue) -> Result<JsonValue> {
        if row.get("created_at").is_none() {
            row["created_at"] = JsonValue::String(chrono::Utc::now().to_rfc3339());
        }
        let mut tables = self.tables.write();
        tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, mut row: JsonValue) -> Result<JsonValue> {
        row["updated_at"] = JsonValue::String(chrono::Utc::now().to_rfc3339());
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| Error::RowNotFound(id.to_string()))?;
        let slot = rows
            .iter_mut()
            .find(|existing| Self::row_id_matches(existing, id))
            .ok_or_else(|| Error::RowNotFound(id.to_string()))?;
        *slot = row.clone();
        Ok(row)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<u64> {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !Self::row_id_matches(row, id));
        Ok((before - rows.len()) as u64)
    }
}

fn compare_fields(a: Option<&JsonValue>, b: Option<&JsonValue>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
