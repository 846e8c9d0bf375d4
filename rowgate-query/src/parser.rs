//! Recursive-descent parser for the filter language
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! expression := logicalOr
//! logicalOr  := logicalAnd ( "||" logicalAnd )*
//! logicalAnd := comparison ( "&&" comparison )*
//! comparison := "(" expression ")" | IDENTIFIER OPERATOR VALUE
//! ```
//!
//! `&&` binds tighter than `||`; both are left-associative.

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use rowgate_common::{Error, Result};

use crate::ast::{FilterExpr, FilterValue, LogicalOp};
use crate::token::{tokenize, Token, TokenKind};

/// Parse a raw filter clause into an AST.
///
/// Empty or whitespace-only input is a defined no-op: it returns
/// `Ok(None)`, and callers must treat "no filter" as "match
/// everything".
pub fn parse_filter_clause(input: &str) -> Result<Option<FilterExpr>> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    parse(tokens).map(Some)
}

/// Parse a token stream into an AST.
///
/// Any unconsumed trailing token is a parse error, never a silent
/// partial parse.
pub fn parse(tokens: Vec<Token>) -> Result<FilterExpr> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(Error::Syntax(format!(
            "Unexpected token '{}' after expression",
            extra.text
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|t| t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expression(&mut self) -> Result<FilterExpr> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<FilterExpr> {
        let mut expr = self.logical_and()?;
        while self.matches(TokenKind::Or) {
            let right = self.logical_and()?;
            expr = FilterExpr::logical(LogicalOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<FilterExpr> {
        let mut expr = self.comparison()?;
        while self.matches(TokenKind::And) {
            let right = self.comparison()?;
            expr = FilterExpr::logical(LogicalOp::And, expr, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<FilterExpr> {
        if self.matches(TokenKind::OpenParen) {
            let inner = self.expression()?;
            if !self.matches(TokenKind::CloseParen) {
                return Err(Error::Syntax("Expect ')' after expression".into()));
            }
            return Ok(FilterExpr::Group(Box::new(inner)));
        }

        let field = match self.advance() {
            Some(t) if t.kind == TokenKind::Identifier => t.text.clone(),
            _ => return Err(Error::Syntax("Expected identifier".into())),
        };

        let op = match self.advance() {
            Some(t) => match t.kind {
                TokenKind::Operator(op) => op,
                _ => {
                    return Err(Error::Syntax(format!(
                        "Expected operator after '{}'",
                        field
                    )))
                }
            },
            None => {
                return Err(Error::Syntax(format!(
                    "Expected operator after '{}'",
                    field
                )))
            }
        };

        let value = match self.advance() {
            Some(t) if t.kind == TokenKind::Value => typed_value(&t.text)?,
            // Bare `true`/`false` tokenize as identifiers but are
            // boolean literals in value position.
            Some(t) if t.kind == TokenKind::Identifier && t.text == "true" => {
                FilterValue::Bool(true)
            }
            Some(t) if t.kind == TokenKind::Identifier && t.text == "false" => {
                FilterValue::Bool(false)
            }
            _ => return Err(Error::Syntax("Expected value after operator".into())),
        };

        Ok(FilterExpr::comparison(field, op, value))
    }
}

/// Type a raw value token.
///
/// Quoted text becomes a string (quotes stripped, `\'` unescaped),
/// ISO-date-shaped text is canonicalized to an RFC 3339 UTC string at
/// parse time, everything else is numeric.
fn typed_value(text: &str) -> Result<FilterValue> {
    if let Some(quoted) = text.strip_prefix('\'') {
        let inner = quoted
            .strip_suffix('\'')
            .ok_or_else(|| Error::Syntax("Unterminated string value".into()))?;
        return Ok(FilterValue::Str(unescape(inner)));
    }

    if is_date_shaped(text) {
        return Ok(FilterValue::Str(canonicalize_date(text)?));
    }

    text.parse::<f64>()
        .map(FilterValue::Number)
        .map_err(|_| Error::Syntax(format!("Invalid numeric value '{}'", text)))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_date_shaped(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 10
        && b[0].is_ascii_digit()
        && b[1].is_ascii_digit()
        && b[2].is_ascii_digit()
        && b[3].is_ascii_digit()
        && b[4] == b'-'
        && b[5].is_ascii_digit()
        && b[6].is_ascii_digit()
        && b[7] == b'-'
        && b[8].is_ascii_digit()
        && b[9].is_ascii_digit()
}

/// Canonicalize a date literal to RFC 3339 UTC. A bare date gets a
/// midnight time part.
fn canonicalize_date(text: &str) -> Result<String> {
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is valid"))
        })
        .map_err(|_| Error::Syntax(format!("Invalid date literal '{}'", text)))?;

    Ok(Utc
        .from_utc_datetime(&naive)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Operator;

    fn parse_str(input: &str) -> FilterExpr {
        parse_filter_clause(input).unwrap().unwrap()
    }

    #[test]
    fn test_simple_comparison() {
        let expr = parse_str("name = 'Alice'");
        assert_eq!(
            expr,
            FilterExpr::comparison("name", Operator::Eq, FilterValue::Str("Alice".into()))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // a=1 && b=2 || c=3  parses as  (a=1 && b=2) || c=3
        let expr = parse_str("a = 1 && b = 2 || c = 3");
        match expr {
            FilterExpr::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                assert!(matches!(
                    *left,
                    FilterExpr::Logical {
                        op: LogicalOp::And,
                        ..
                    }
                ));
                assert!(matches!(*right, FilterExpr::Comparison { .. }));
            }
            other => panic!("expected OR at root, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_grouping_overrides_precedence() {
        let expr = parse_str("(a = 1 || b = 2) && c = 3");
        match expr {
            FilterExpr::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                match *left {
                    FilterExpr::Group(inner) => assert!(matches!(
                        *inner,
                        FilterExpr::Logical {
                            op: LogicalOp::Or,
                            ..
                        }
                    )),
                    other => panic!("expected group on the left, got {:?}", other),
                }
                assert!(matches!(*right, FilterExpr::Comparison { .. }));
            }
            other => panic!("expected AND at root, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_insensitive() {
        let a = parse_str("a=1&&b=2");
        let b = parse_str("  a = 1   &&   b = 2  ");
        assert_eq!(a, b);
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_str("a = 1 || b = 2 || c = 3");
        // ((a=1 || b=2) || c=3)
        match expr {
            FilterExpr::Logical {
                op: LogicalOp::Or,
                left,
                ..
            } => assert!(matches!(
                *left,
                FilterExpr::Logical {
                    op: LogicalOp::Or,
                    ..
                }
            )),
            other => panic!("expected OR at root, got {:?}", other),
        }
    }

    #[test]
    fn test_value_types() {
        assert_eq!(
            parse_str("n = 42"),
            FilterExpr::comparison("n", Operator::Eq, FilterValue::Number(42.0))
        );
        assert_eq!(
            parse_str("active = true"),
            FilterExpr::comparison("active", Operator::Eq, FilterValue::Bool(true))
        );
        assert_eq!(
            parse_str("name = 'x'"),
            FilterExpr::comparison("name", Operator::Eq, FilterValue::Str("x".into()))
        );
    }

    #[test]
    fn test_date_canonicalization() {
        let expr = parse_str("createdAt >= 2024-01-02");
        assert_eq!(
            expr,
            FilterExpr::comparison(
                "createdAt",
                Operator::Gte,
                FilterValue::Str("2024-01-02T00:00:00Z".into())
            )
        );

        let expr = parse_str("createdAt < 2024-01-02T10:30:00");
        assert_eq!(
            expr,
            FilterExpr::comparison(
                "createdAt",
                Operator::Lt,
                FilterValue::Str("2024-01-02T10:30:00Z".into())
            )
        );
    }

    #[test]
    fn test_invalid_date_rejected() {
        let err = parse_filter_clause("createdAt = 2024-13-99").unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn test_missing_close_paren() {
        let err = parse_filter_clause("(a = 1 && b = 2").unwrap_err();
        assert_eq!(err.to_string(), "Syntax error: Expect ')' after expression");
    }

    #[test]
    fn test_missing_value() {
        let err = parse_filter_clause("a =").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Syntax error: Expected value after operator"
        );
    }

    #[test]
    fn test_missing_operator() {
        let err = parse_filter_clause("a 'x'").unwrap_err();
        assert!(err.to_string().contains("Expected operator"));
    }

    #[test]
    fn test_trailing_input_rejected() {
        let err = parse_filter_clause("a = 1 b = 2").unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn test_empty_input_is_no_filter() {
        assert!(parse_filter_clause("").unwrap().is_none());
        assert!(parse_filter_clause("   ").unwrap().is_none());
    }

    #[test]
    fn test_escaped_quote() {
        let expr = parse_str(r"name = 'O\'Brien'");
        assert_eq!(
            expr,
            FilterExpr::comparison("name", Operator::Eq, FilterValue::Str("O'Brien".into()))
        );
    }
}
