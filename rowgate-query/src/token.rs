//! Tokenizer for the collection filter language
//!
//! Turns a filter string like `status = 'active' && age >= 21` into a
//! flat token stream. No precedence is resolved here; the parser owns
//! the grammar.

use rowgate_common::{Error, Result};

/// Comparison operators of the filter language.
///
/// The `?`-prefixed family is part of the wire grammar; only `?=` and
/// `?!=` have compile-time semantics (null checks). The rest are
/// rejected by the condition compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    AnyEq,
    AnyNe,
    AnyGt,
    AnyGte,
    AnyLt,
    AnyLte,
    AnyLike,
    AnyNotLike,
}

impl Operator {
    /// All operators, longest symbol first. Scan order matters: `?!~`
    /// must be tried before `!~`, and `!~` before `~`.
    pub const LONGEST_FIRST: [Operator; 16] = [
        Operator::AnyNotLike,
        Operator::AnyNe,
        Operator::AnyGte,
        Operator::AnyLte,
        Operator::AnyEq,
        Operator::AnyGt,
        Operator::AnyLt,
        Operator::AnyLike,
        Operator::Ne,
        Operator::Gte,
        Operator::Lte,
        Operator::NotLike,
        Operator::Eq,
        Operator::Gt,
        Operator::Lt,
        Operator::Like,
    ];

    /// The literal symbol as written in a filter string
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "~",
            Operator::NotLike => "!~",
            Operator::AnyEq => "?=",
            Operator::AnyNe => "?!=",
            Operator::AnyGt => "?>",
            Operator::AnyGte => "?>=",
            Operator::AnyLt => "?<",
            Operator::AnyLte => "?<=",
            Operator::AnyLike => "?~",
            Operator::AnyNotLike => "?!~",
        }
    }
}

/// Token kinds emitted by [`tokenize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    And,
    Or,
    Operator(Operator),
    Identifier,
    Value,
}

/// A single token: kind plus the raw text it was scanned from.
///
/// String values keep their surrounding quotes in `text`; the parser
/// strips and unescapes them when it types the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Tokenize a filter string into a flat token stream.
///
/// Fails with [`Error::Syntax`] on an unrecognized character or an
/// unterminated quoted string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c == '(' {
            tokens.push(Token::new(TokenKind::OpenParen, "("));
            pos += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token::new(TokenKind::CloseParen, ")"));
            pos += 1;
            continue;
        }

        if matches_at(&chars, pos, "&&") {
            tokens.push(Token::new(TokenKind::And, "&&"));
            pos += 2;
            continue;
        }
        if matches_at(&chars, pos, "||") {
            tokens.push(Token::new(TokenKind::Or, "||"));
            pos += 2;
            continue;
        }

        if let Some(op) = scan_operator(&chars, pos) {
            tokens.push(Token::new(TokenKind::Operator(op), op.symbol()));
            pos += op.symbol().len();
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            pos += 1;
            while pos < chars.len()
                && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_' || chars[pos] == '.')
            {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            tokens.push(Token::new(TokenKind::Identifier, text));
            continue;
        }

        if c == '\'' {
            let (text, next) = scan_string(&chars, pos)?;
            tokens.push(Token::new(TokenKind::Value, text));
            pos = next;
            continue;
        }

        if c.is_ascii_digit() {
            let (text, next) = if looks_like_date(&chars, pos) {
                scan_date(&chars, pos)
            } else {
                scan_number(&chars, pos)
            };
            tokens.push(Token::new(TokenKind::Value, text));
            pos = next;
            continue;
        }

        return Err(Error::Syntax(format!("Unexpected character '{}'", c)));
    }

    Ok(tokens)
}

fn matches_at(chars: &[char], pos: usize, pat: &str) -> bool {
    pat.chars()
        .enumerate()
        .all(|(i, p)| chars.get(pos + i) == Some(&p))
}

/// Greedy longest-match operator scan
fn scan_operator(chars: &[char], pos: usize) -> Option<Operator> {
    Operator::LONGEST_FIRST
        .iter()
        .copied()
        .find(|op| matches_at(chars, pos, op.symbol()))
}

/// Scan a single-quoted string, keeping the quotes in the token text.
/// A backslash escapes the next character (so `\'` does not terminate).
fn scan_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => pos += 2,
            '\'' => {
                let text: String = chars[start..=pos].iter().collect();
                return Ok((text, pos + 1));
            }
            _ => pos += 1,
        }
    }
    Err(Error::Syntax("Unterminated string value".into()))
}

/// Lookahead for an ISO-date-shaped literal: `\d{4}-\d{2}-\d{2}`
fn looks_like_date(chars: &[char], pos: usize) -> bool {
    let digit = |i: usize| chars.get(pos + i).is_some_and(|c| c.is_ascii_digit());
    let dash = |i: usize| chars.get(pos + i) == Some(&'-');
    digit(0)
        && digit(1)
        && digit(2)
        && digit(3)
        && dash(4)
        && digit(5)
        && digit(6)
        && dash(7)
        && digit(8)
        && digit(9)
}

/// Consume a date literal: digits, `-`, `T`, `:`
fn scan_date(chars: &[char], start: usize) -> (String, usize) {
    let mut pos = start;
    while pos < chars.len()
        && (chars[pos].is_ascii_digit()
            || chars[pos] == '-'
            || chars[pos] == 'T'
            || chars[pos] == ':')
    {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

/// Consume a bare numeric literal with at most one decimal point
fn scan_number(chars: &[char], start: usize) -> (String, usize) {
    let mut pos = start;
    let mut seen_dot = false;
    while pos < chars.len() {
        match chars[pos] {
            c if c.is_ascii_digit() => pos += 1,
            '.' if !seen_dot => {
                seen_dot = true;
                pos += 1;
            }
            _ => break,
        }
    }
    (chars[start..pos].iter().collect(), pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_comparison() {
        let tokens = tokenize("name = 'Alice'").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "name");
        assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::Eq));
        assert_eq!(tokens[2].kind, TokenKind::Value);
        assert_eq!(tokens[2].text, "'Alice'");
    }

    #[test]
    fn test_longest_match_operators() {
        let tokens = tokenize("a ?!~ 'x'").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::AnyNotLike));

        let tokens = tokenize("a !~ 'x'").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::NotLike));

        let tokens = tokenize("a ~ 'x'").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::Like));

        let tokens = tokenize("a ?>= 5").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::AnyGte));

        let tokens = tokenize("a >= 5").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::Gte));
    }

    #[test]
    fn test_logical_and_parens() {
        assert_eq!(
            kinds("(a = 1 && b = 2) || c = 3"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::Operator(Operator::Eq),
                TokenKind::Value,
                TokenKind::And,
                TokenKind::Identifier,
                TokenKind::Operator(Operator::Eq),
                TokenKind::Value,
                TokenKind::CloseParen,
                TokenKind::Or,
                TokenKind::Identifier,
                TokenKind::Operator(Operator::Eq),
                TokenKind::Value,
            ]
        );
    }

    #[test]
    fn test_dotted_identifier() {
        let tokens = tokenize("sessions.userId = 'u1'").unwrap();
        assert_eq!(tokens[0].text, "sessions.userId");
    }

    #[test]
    fn test_date_literal() {
        let tokens = tokenize("createdAt >= 2024-01-02T10:30:00").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Value);
        assert_eq!(tokens[2].text, "2024-01-02T10:30:00");
    }

    #[test]
    fn test_number_vs_date() {
        let tokens = tokenize("count = 1234").unwrap();
        assert_eq!(tokens[2].text, "1234");

        let tokens = tokenize("price = 12.5").unwrap();
        assert_eq!(tokens[2].text, "12.5");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let tokens = tokenize(r"name = 'O\'Brien'").unwrap();
        assert_eq!(tokens[2].text, r"'O\'Brien'");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("name = 'oops").unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("name = #").unwrap_err();
        assert!(err.to_string().contains('#'));
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
