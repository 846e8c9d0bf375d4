//! Filter-query compiler for the rowgate collection access layer
//!
//! Turns a compact filter string such as
//! `status = 'active' && sessions.userId = 'u1'` into storage-level
//! boolean conditions, resolved against a boot-time table registry:
//!
//! - [`token`]: flat tokenizer with longest-match operator scanning
//! - [`parser`]: recursive-descent parser (AND binds tighter than OR)
//! - [`registry`]: table/column registry with hyphenated-name
//!   normalization, frozen once at boot
//! - [`compiler`]: AST-to-condition compilation, one aggregated
//!   condition per referenced table, plus the ordering helper

pub mod ast;
pub mod compiler;
pub mod parser;
pub mod registry;
pub mod token;

pub use ast::{FilterExpr, FilterValue, LogicalOp};
pub use compiler::{compile, order_by, Condition, OrderSpec, Predicate};
pub use parser::parse_filter_clause;
pub use registry::{TableDef, TableHandle, TableRegistry, TableRegistryBuilder};
pub use token::{tokenize, Operator, Token, TokenKind};
