//! Condition compiler
//!
//! Walks a parsed filter AST, resolves every `table.column` or bare
//! `column` reference through the table registry, and produces
//! storage-level boolean conditions — one aggregated condition per
//! referenced table.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use rowgate_common::{Error, Result, SortDirection};

use crate::ast::{FilterExpr, FilterValue, LogicalOp};
use crate::registry::TableRegistry;
use crate::token::Operator;

/// Storage-level comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

/// A compiled boolean condition over one table's rows
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        table: String,
        column: String,
        predicate: Predicate,
        value: FilterValue,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

/// Single-column sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub table: String,
    pub column: String,
    pub direction: SortDirection,
}

/// Compile a filter AST into per-table conditions.
///
/// A `None` AST compiles to an empty map, consistent with "no filter
/// means match everything". Multi-table filters produce one
/// independent condition per referenced table, not a single
/// cross-table expression.
pub fn compile(
    registry: &TableRegistry,
    default_table: &str,
    ast: Option<&FilterExpr>,
) -> Result<BTreeMap<String, Condition>> {
    let mut by_table = BTreeMap::new();
    if let Some(expr) = ast {
        walk(registry, default_table, expr, &mut by_table)?;
    }
    Ok(by_table)
}

/// Post-order walk. Returns the condition for the visited subtree with
/// its true AND/OR shape; per-table aggregation happens as a side
/// effect in [`merge_into`].
fn walk(
    registry: &TableRegistry,
    default_table: &str,
    expr: &FilterExpr,
    by_table: &mut BTreeMap<String, Condition>,
) -> Result<Condition> {
    match expr {
        FilterExpr::Group(inner) => walk(registry, default_table, inner, by_table),

        FilterExpr::Logical { op, left, right } => {
            let l = walk(registry, default_table, left, by_table)?;
            let r = walk(registry, default_table, right, by_table)?;
            Ok(match op {
                LogicalOp::And => Condition::And(Box::new(l), Box::new(r)),
                LogicalOp::Or => Condition::Or(Box::new(l), Box::new(r)),
            })
        }

        FilterExpr::Comparison { field, op, value } => {
            let (table_name, column_name) = match field.split_once('.') {
                Some((table, column)) => (table, column),
                None => (default_table, field.as_str()),
            };

            let handle = registry.resolve(table_name)?;
            let column = handle.column(column_name)?.to_string();
            let predicate = predicate_for(*op)?;

            // The literal string 'null' means the null value, not the
            // four-character string.
            let value = match value {
                FilterValue::Str(s) if s == "null" => FilterValue::Null,
                other => other.clone(),
            };

            let condition = Condition::Compare {
                table: handle.name().to_string(),
                column,
                predicate,
                value,
            };
            merge_into(by_table, handle.name(), condition.clone());
            Ok(condition)
        }
    }
}

/// Map a filter operator to its storage predicate.
///
/// `?=`/`?!=` compile to null checks; the remaining any-of operators
/// have no implemented semantics and are rejected outright rather
/// than mis-evaluated.
fn predicate_for(op: Operator) -> Result<Predicate> {
    match op {
        Operator::Eq => Ok(Predicate::Eq),
        Operator::Ne => Ok(Predicate::Ne),
        Operator::Gt => Ok(Predicate::Gt),
        Operator::Gte => Ok(Predicate::Gte),
        Operator::Lt => Ok(Predicate::Lt),
        Operator::Lte => Ok(Predicate::Lte),
        Operator::Like => Ok(Predicate::Like),
        Operator::NotLike => Ok(Predicate::NotLike),
        Operator::AnyEq => Ok(Predicate::IsNull),
        Operator::AnyNe => Ok(Predicate::IsNotNull),
        Operator::AnyGt
        | Operator::AnyGte
        | Operator::AnyLt
        | Operator::AnyLte
        | Operator::AnyLike
        | Operator::AnyNotLike => Err(Error::UnsupportedOperator(op.symbol().to_string())),
    }
}

/// AND-merge a comparison into its table's running entry.
///
/// Invariant: the per-table map always combines with AND, even when
/// the comparison's ancestor in the AST is an `||` node. Only the
/// condition returned up the recursion preserves the full boolean
/// shape. Changing this reducer is the single place to correct that
/// behavior if requirements ever change.
fn merge_into(by_table: &mut BTreeMap<String, Condition>, table: &str, condition: Condition) {
    match by_table.remove(table) {
        Some(existing) => {
            by_table.insert(
                table.to_string(),
                Condition::And(Box::new(existing), Box::new(condition)),
            );
        }
        None => {
            by_table.insert(table.to_string(), condition);
        }
    }
}

/// Map a `(column, direction)` pair to a sort specification
pub fn order_by(
    registry: &TableRegistry,
    table: &str,
    column: &str,
    direction: SortDirection,
) -> Result<OrderSpec> {
    let handle = registry.resolve(table)?;
    let column = handle.column(column)?.to_string();
    Ok(OrderSpec {
        table: handle.name().to_string(),
        column,
        direction,
    })
}

impl Condition {
    /// Evaluate this condition against a single JSON row.
    ///
    /// Used by in-memory storage; a relational backend would translate
    /// the condition tree to its own predicate language instead.
    pub fn matches(&self, row: &JsonValue) -> bool {
        match self {
            Condition::And(l, r) => l.matches(row) && r.matches(row),
            Condition::Or(l, r) => l.matches(row) || r.matches(row),
            Condition::Compare {
                column,
                predicate,
                value,
                ..
            } => {
                let field = row.get(column);
                match predicate {
                    Predicate::IsNull => field.map_or(true, JsonValue::is_null),
                    Predicate::IsNotNull => field.is_some_and(|v| !v.is_null()),
                    Predicate::Eq => field.is_some_and(|v| json_eq(v, value)),
                    Predicate::Ne => field.map_or(true, |v| !json_eq(v, value)),
                    Predicate::Gt => cmp_is(field, value, |o| o == std::cmp::Ordering::Greater),
                    Predicate::Gte => cmp_is(field, value, |o| o != std::cmp::Ordering::Less),
                    Predicate::Lt => cmp_is(field, value, |o| o == std::cmp::Ordering::Less),
                    Predicate::Lte => cmp_is(field, value, |o| o != std::cmp::Ordering::Greater),
                    Predicate::Like => like_is(field, value),
                    Predicate::NotLike => !like_is(field, value),
                }
            }
        }
    }
}

fn json_eq(field: &JsonValue, value: &FilterValue) -> bool {
    match (field, value) {
        (JsonValue::String(s), FilterValue::Str(v)) => s == v,
        (JsonValue::Number(n), FilterValue::Number(v)) => n.as_f64() == Some(*v),
        (JsonValue::Bool(b), FilterValue::Bool(v)) => b == v,
        (JsonValue::Null, FilterValue::Null) => true,
        _ => false,
    }
}

fn cmp_is(
    field: Option<&JsonValue>,
    value: &FilterValue,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    let Some(field) = field else { return false };
    let ordering = match (field, value) {
        (JsonValue::Number(n), FilterValue::Number(v)) => {
            n.as_f64().and_then(|n| n.partial_cmp(v))
        }
        (JsonValue::String(s), FilterValue::Str(v)) => Some(s.as_str().cmp(v.as_str())),
        _ => None,
    };
    ordering.is_some_and(accept)
}

fn like_is(field: Option<&JsonValue>, value: &FilterValue) -> bool {
    let (Some(JsonValue::String(text)), FilterValue::Str(pattern)) = (field, value) else {
        return false;
    };
    like_match(text, pattern)
}

/// Case-insensitive LIKE-style match. `%` is the only wildcard; a
/// pattern without one matches by substring containment.
fn like_match(text: &str, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();

    if !pattern.contains('%') {
        return text.contains(&pattern);
    }
    wildcard_match(&text.chars().collect::<Vec<_>>(), &pattern.chars().collect::<Vec<_>>())
}

/// Greedy `%`-wildcard matcher with single-star backtracking
fn wildcard_match(text: &[char], pattern: &[char]) -> bool {
    let (mut ti, mut pi) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < text.len() {
        if pi < pattern.len() && pattern[pi] != '%' && pattern[pi] == text[ti] {
            ti += 1;
            pi += 1;
        } else if pi < pattern.len() && pattern[pi] == '%' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < pattern.len() && pattern[pi] == '%' {
        pi += 1;
    }
    pi == pattern.len()
}
