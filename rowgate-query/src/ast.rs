//! Abstract syntax tree for parsed filter expressions

use crate::token::Operator;

/// Logical connective between two filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A literal value on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl FilterValue {
    /// Whether this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }
}

/// A parsed filter expression, immutable once built.
///
/// `Comparison.field` may contain a single dot for `table.column`
/// qualification; resolution against the table registry happens in the
/// condition compiler, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Logical {
        op: LogicalOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    Comparison {
        field: String,
        op: Operator,
        value: FilterValue,
    },
    Group(Box<FilterExpr>),
}

impl FilterExpr {
    /// Convenience constructor for a comparison node
    pub fn comparison(field: impl Into<String>, op: Operator, value: FilterValue) -> Self {
        FilterExpr::Comparison {
            field: field.into(),
            op,
            value,
        }
    }

    /// Convenience constructor for a logical node
    pub fn logical(op: LogicalOp, left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
