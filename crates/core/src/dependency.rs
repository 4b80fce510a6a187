//! Dependency expressions controlling form-field visibility.
//!
//! A template field may carry an expression such as
//! `{Job.Remote} == 'Yes' && {Job.HoursPerWeek} >= 20`. Each `{field_key}`
//! names another field of the same form; its current response value is
//! coerced to a typed [`Value`] and the expression decides whether the
//! referencing field is shown.
//!
//! Expressions are tokenized, parsed into an [`Expr`] tree by a small
//! recursive-descent parser, and evaluated by walking that tree. There is no
//! textual substitution and no dynamic code path: the only names an
//! expression can mention are field references and the literals
//! `Yes`/`No`/`true`/`false`/`null` (plus their `True`/`False`/`None`
//! spellings).
//!
//! Grammar:
//!
//! ```text
//! expr       := or
//! or         := and ( "||" and )*
//! and        := comparison ( "&&" comparison )*
//! comparison := primary ( ( "==" | "!=" | ">" | "<" | ">=" | "<=" ) primary )*
//! primary    := literal | "{" field_key "}" | "(" expr ")"
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pattern matching a `{field_key}` reference inside an expression.
pub const FIELD_REFERENCE_PATTERN: &str = r"\{([^}]+)\}";

static FIELD_REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FIELD_REFERENCE_PATTERN).expect("valid regex"));

/// Response spellings coerced to boolean `true` (compared case-insensitively).
const TRUE_SPELLINGS: &[&str] = &["true", "yes", "1"];

/// Response spellings coerced to boolean `false` (compared case-insensitively).
const FALSE_SPELLINGS: &[&str] = &["false", "no", "0"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an expression could not be evaluated.
///
/// Never surfaces past [`is_visible`]; a failing expression hides its field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("empty field reference at offset {offset}")]
    EmptyReference { offset: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: &'static str },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("field '{0}' has no response")]
    UnresolvedField(String),

    #[error("cannot compare {lhs} {op} {rhs}")]
    TypeMismatch {
        lhs: &'static str,
        op: CompareOp,
        rhs: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A typed value produced from a literal or a coerced response.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Coerce a raw response string to a typed value.
    ///
    /// - absent or blank -> `Null`
    /// - `true`/`yes`/`1` (any case) -> `Bool(true)`
    /// - `false`/`no`/`0` (any case) -> `Bool(false)`
    /// - integer text -> `Int`; text containing `.` or an exponent -> `Float`
    /// - anything else -> `Str` (trimmed)
    pub fn coerce(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Value::Null;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }

        let lowered = trimmed.to_ascii_lowercase();
        if TRUE_SPELLINGS.contains(&lowered.as_str()) {
            return Value::Bool(true);
        }
        if FALSE_SPELLINGS.contains(&lowered.as_str()) {
            return Value::Bool(false);
        }

        let looks_fractional = trimmed.contains(|c: char| c == '.' || c == 'e' || c == 'E');
        if looks_fractional {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Float(f);
            }
        } else if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        } else if is_integer_text(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Float(f);
            }
        }

        Value::Str(trimmed.to_string())
    }

    /// Truthiness used by `&&` / `||` and by the final visibility decision.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    /// Numeric view; booleans count as 0/1.
    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Null | Value::Str(_) => None,
        }
    }

    fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    fn ordering(&self, op: CompareOp, other: &Value) -> Result<Option<Ordering>, ExpressionError> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Err(ExpressionError::TypeMismatch {
                    lhs: self.type_name(),
                    op,
                    rhs: other.type_name(),
                }),
            },
        }
    }
}

/// Optionally signed run of ASCII digits.
fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "'{s}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Field lookup
// ---------------------------------------------------------------------------

/// Read-only source of current response values, keyed by field key.
pub trait FieldLookup {
    /// The raw response value for `field_key`, or `None` when unanswered.
    fn response_value(&self, field_key: &str) -> Option<&str>;
}

impl FieldLookup for HashMap<String, String> {
    fn response_value(&self, field_key: &str) -> Option<&str> {
        self.get(field_key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),
    Compare(CompareOp),
    And,
    Or,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Field(k) => write!(f, "{{{k}}}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Int(i) => write!(f, "{i}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Ident(name) => f.write_str(name),
            Token::Compare(op) => f.write_str(op.as_str()),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

/// Split an expression into tokens.
///
/// Two-character operators are matched before their one-character
/// prefixes, so `>=` is never read as `>` followed by `=`.
fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, ch) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let two_char = match (ch, next) {
            ('=', Some('=')) => Some(Token::Compare(CompareOp::Eq)),
            ('!', Some('=')) => Some(Token::Compare(CompareOp::Ne)),
            ('>', Some('=')) => Some(Token::Compare(CompareOp::Ge)),
            ('<', Some('=')) => Some(Token::Compare(CompareOp::Le)),
            ('&', Some('&')) => Some(Token::And),
            ('|', Some('|')) => Some(Token::Or),
            _ => None,
        };
        if let Some(token) = two_char {
            tokens.push(token);
            i += 2;
            continue;
        }

        match ch {
            '>' => {
                tokens.push(Token::Compare(CompareOp::Gt));
                i += 1;
            }
            '<' => {
                tokens.push(Token::Compare(CompareOp::Lt));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&(_, c)| c == '}')
                    .map(|p| i + 1 + p)
                    .ok_or(ExpressionError::Unterminated {
                        what: "field reference",
                        offset,
                    })?;
                let key: String = chars[i + 1..close].iter().map(|&(_, c)| c).collect();
                let key = key.trim();
                if key.is_empty() {
                    return Err(ExpressionError::EmptyReference { offset });
                }
                tokens.push(Token::Field(key.to_string()));
                i = close + 1;
            }
            '\'' | '"' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&(_, c)| c == ch)
                    .map(|p| i + 1 + p)
                    .ok_or(ExpressionError::Unterminated {
                        what: "string literal",
                        offset,
                    })?;
                let text: String = chars[i + 1..close].iter().map(|&(_, c)| c).collect();
                tokens.push(Token::Str(text));
                i = close + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                tokens.push(parse_number(&text)?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                tokens.push(Token::Ident(name));
            }
            _ => return Err(ExpressionError::UnexpectedChar { ch, offset }),
        }
    }

    Ok(tokens)
}

fn parse_number(text: &str) -> Result<Token, ExpressionError> {
    if text.contains('.') {
        return text
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ExpressionError::InvalidNumber(text.to_string()));
    }
    match text.parse::<i64>() {
        Ok(i) => Ok(Token::Int(i)),
        Err(_) => text
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ExpressionError::InvalidNumber(text.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

/// Parsed dependency expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Field(String),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluate against current responses. `&&`/`||` short-circuit and
    /// yield the deciding operand, like their scripting-language namesakes.
    pub fn evaluate(&self, lookup: &dyn FieldLookup) -> Result<Value, ExpressionError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(key) => match lookup.response_value(key) {
                Some(raw) => Ok(Value::coerce(Some(raw))),
                None => Err(ExpressionError::UnresolvedField(key.clone())),
            },
            Expr::Compare { op, lhs, rhs } => {
                let left = lhs.evaluate(lookup)?;
                let right = rhs.evaluate(lookup)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
            Expr::And(lhs, rhs) => {
                let left = lhs.evaluate(lookup)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                rhs.evaluate(lookup)
            }
            Expr::Or(lhs, rhs) => {
                let left = lhs.evaluate(lookup)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                rhs.evaluate(lookup)
            }
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(key) => {
                if !out.contains(&key.as_str()) {
                    out.push(key);
                }
            }
            Expr::Compare { lhs, rhs, .. } | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, ExpressionError> {
    match op {
        CompareOp::Eq => Ok(left.loosely_equals(right)),
        CompareOp::Ne => Ok(!left.loosely_equals(right)),
        CompareOp::Gt | CompareOp::Lt | CompareOp::Ge | CompareOp::Le => {
            let Some(ordering) = left.ordering(op, right)? else {
                // NaN on either side: every ordering comparison is false.
                return Ok(false);
            };
            Ok(match op {
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Eq | CompareOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_comparison()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// `a < b < c` chains into `a < b && b < c`.
    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let first = self.parse_primary()?;
        let mut operands = vec![first];
        let mut ops = Vec::new();

        while let Some(Token::Compare(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            ops.push(op);
            operands.push(self.parse_primary()?);
        }

        if ops.is_empty() {
            return Ok(operands.remove(0));
        }

        let mut links = ops.iter().enumerate().map(|(i, op)| Expr::Compare {
            op: *op,
            lhs: Box::new(operands[i].clone()),
            rhs: Box::new(operands[i + 1].clone()),
        });
        let head = links.next().ok_or(ExpressionError::UnexpectedEnd {
            expected: "comparison",
        })?;
        Ok(links.fold(head, |acc, link| Expr::And(Box::new(acc), Box::new(link))))
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.advance().ok_or(ExpressionError::UnexpectedEnd {
            expected: "a value",
        })?;

        match token {
            Token::Field(key) => Ok(Expr::Field(key)),
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(text) => Ok(Expr::Literal(string_literal(text))),
            Token::Ident(name) => keyword_literal(&name)
                .map(Expr::Literal)
                .ok_or(ExpressionError::UnknownName(name)),
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExpressionError::UnexpectedToken {
                        found: other.to_string(),
                        expected: "')'",
                    }),
                    None => Err(ExpressionError::UnexpectedEnd { expected: "')'" }),
                }
            }
            other => Err(ExpressionError::UnexpectedToken {
                found: other.to_string(),
                expected: "a value",
            }),
        }
    }
}

/// The quoted answers `'Yes'` and `'No'` mean the booleans they name,
/// matching how yes/no responses are coerced.
fn string_literal(text: String) -> Value {
    match text.as_str() {
        "Yes" => Value::Bool(true),
        "No" => Value::Bool(false),
        _ => Value::Str(text),
    }
}

fn keyword_literal(name: &str) -> Option<Value> {
    match name {
        "Yes" | "true" | "True" => Some(Value::Bool(true)),
        "No" | "false" | "False" => Some(Value::Bool(false)),
        "null" | "None" => Some(Value::Null),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A parsed, reusable dependency expression.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyExpression {
    root: Expr,
}

impl DependencyExpression {
    /// Parse `source` into an expression tree.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if let Some(extra) = parser.advance() {
            return Err(ExpressionError::UnexpectedToken {
                found: extra.to_string(),
                expected: "end of expression",
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Distinct field keys referenced by the expression, in order of appearance.
    pub fn field_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_fields(&mut out);
        out
    }

    /// Evaluate to a show/hide decision.
    ///
    /// A referenced field without a response makes the whole expression
    /// fail, so the dependent field stays hidden until it is answered.
    pub fn evaluate(&self, lookup: &dyn FieldLookup) -> Result<bool, ExpressionError> {
        if let Some(missing) = self
            .field_references()
            .into_iter()
            .find(|key| lookup.response_value(key).is_none())
        {
            return Err(ExpressionError::UnresolvedField(missing.to_string()));
        }
        self.root.evaluate(lookup).map(|v| v.is_truthy())
    }
}

/// Decide whether a field with the given dependency expression is shown.
///
/// An absent or blank expression always shows the field. Any failure
/// (syntax error, unanswered reference, incomparable types) hides it.
pub fn is_visible(expression: Option<&str>, lookup: &dyn FieldLookup) -> bool {
    let Some(source) = expression.filter(|s| !s.trim().is_empty()) else {
        return true;
    };

    match DependencyExpression::parse(source).and_then(|expr| expr.evaluate(lookup)) {
        Ok(visible) => visible,
        Err(ExpressionError::UnresolvedField(key)) => {
            tracing::debug!(expression = source, field_key = %key, "Dependency not yet answered, hiding field");
            false
        }
        Err(e) => {
            tracing::warn!(expression = source, error = %e, "Dependency expression failed, hiding field");
            false
        }
    }
}

/// Extract every `{field_key}` reference from raw expression text.
///
/// Works on text that does not parse, so callers can still flag which
/// fields other fields depend on.
pub fn extract_field_references(expression: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for capture in FIELD_REFERENCE_RE.captures_iter(expression) {
        let key = capture[1].trim().to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn responses(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // -- Coercion -------------------------------------------------------------

    #[test]
    fn coerce_absent_and_blank_are_null() {
        assert_eq!(Value::coerce(None), Value::Null);
        assert_eq!(Value::coerce(Some("   ")), Value::Null);
    }

    #[test]
    fn coerce_boolean_spellings_case_insensitive() {
        assert_eq!(Value::coerce(Some("YES")), Value::Bool(true));
        assert_eq!(Value::coerce(Some("True")), Value::Bool(true));
        assert_eq!(Value::coerce(Some("1")), Value::Bool(true));
        assert_eq!(Value::coerce(Some("no")), Value::Bool(false));
        assert_eq!(Value::coerce(Some("FALSE")), Value::Bool(false));
        assert_eq!(Value::coerce(Some("0")), Value::Bool(false));
    }

    #[test]
    fn coerce_numbers() {
        assert_eq!(Value::coerce(Some(" 42 ")), Value::Int(42));
        assert_eq!(Value::coerce(Some("-7")), Value::Int(-7));
        assert_eq!(Value::coerce(Some("3.5")), Value::Float(3.5));
        assert_eq!(Value::coerce(Some("1e3")), Value::Float(1000.0));
    }

    #[test]
    fn coerce_integer_beyond_i64_as_float() {
        assert_eq!(
            Value::coerce(Some("99999999999999999999")),
            Value::Float(99999999999999999999.0)
        );
        assert_eq!(Value::coerce(Some("inf")), Value::Str("inf".to_string()));

        let values = responses(&[("A", "99999999999999999999")]);
        assert!(is_visible(Some("{A} > 5"), &values));
    }

    #[test]
    fn coerce_falls_back_to_trimmed_string() {
        assert_eq!(
            Value::coerce(Some("  Software Engineer ")),
            Value::Str("Software Engineer".to_string())
        );
        assert_eq!(Value::coerce(Some("1.2.3")), Value::Str("1.2.3".to_string()));
    }

    // -- Tokenizer ------------------------------------------------------------

    #[test]
    fn multi_char_operators_are_not_split() {
        let tokens = tokenize("{a}>=1&&{b}<=2||{c}!=3&&{d}==4").unwrap();
        let ops: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Compare(op) => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![CompareOp::Ge, CompareOp::Le, CompareOp::Ne, CompareOp::Eq]
        );
    }

    #[test]
    fn single_equals_is_rejected() {
        assert_matches!(
            DependencyExpression::parse("{a} = 1"),
            Err(ExpressionError::UnexpectedChar { ch: '=', .. })
        );
    }

    #[test]
    fn unterminated_reference_is_rejected() {
        assert_matches!(
            DependencyExpression::parse("{a == 1"),
            Err(ExpressionError::Unterminated { .. })
        );
    }

    // -- Parser ---------------------------------------------------------------

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = DependencyExpression::parse("{a} == 1 || {b} == 2 && {c} == 3").unwrap();
        assert_matches!(expr.root(), Expr::Or(_, rhs) if matches!(**rhs, Expr::And(_, _)));
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = DependencyExpression::parse("({a} == 1 || {b} == 2) && {c} == 3").unwrap();
        assert_matches!(expr.root(), Expr::And(lhs, _) if matches!(**lhs, Expr::Or(_, _)));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_matches!(
            DependencyExpression::parse("__import__"),
            Err(ExpressionError::UnknownName(_))
        );
        assert_matches!(
            DependencyExpression::parse("{a} == open"),
            Err(ExpressionError::UnknownName(_))
        );
    }

    #[test]
    fn call_syntax_is_rejected() {
        assert!(DependencyExpression::parse("len({a}) > 1").is_err());
        assert!(DependencyExpression::parse("{a}.upper() == 'X'").is_err());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert_matches!(
            DependencyExpression::parse("{a} == 1 {b}"),
            Err(ExpressionError::UnexpectedToken { .. })
        );
    }

    #[test]
    fn field_references_are_distinct_and_ordered() {
        let expr = DependencyExpression::parse("{b} == 1 && ({a} > 2 || {b} < 0)").unwrap();
        assert_eq!(expr.field_references(), vec!["b", "a"]);
    }

    // -- Evaluation -----------------------------------------------------------

    #[test]
    fn empty_expression_shows_field() {
        let r = responses(&[]);
        assert!(is_visible(None, &r));
        assert!(is_visible(Some(""), &r));
        assert!(is_visible(Some("   "), &r));
    }

    #[test]
    fn yes_and_greater_than_scenario() {
        let expr = "{A} == 'Yes' && {B} > 5";
        assert!(is_visible(Some(expr), &responses(&[("A", "Yes"), ("B", "10")])));
        assert!(!is_visible(Some(expr), &responses(&[("A", "Yes"), ("B", "3")])));
        assert!(!is_visible(Some(expr), &responses(&[("B", "10")])));
    }

    #[test]
    fn unresolved_reference_hides_even_with_inequality() {
        assert!(!is_visible(Some("{A} != 'Yes'"), &responses(&[])));
        assert!(!is_visible(Some("{A} == null"), &responses(&[])));
    }

    #[test]
    fn blank_response_compares_as_null() {
        let r = responses(&[("A", "  ")]);
        assert!(is_visible(Some("{A} == null"), &r));
    }

    #[test]
    fn bare_yes_no_literals() {
        let r = responses(&[("A", "no")]);
        assert!(is_visible(Some("{A} == No"), &r));
        assert!(!is_visible(Some("{A} == Yes"), &r));
        assert!(is_visible(Some("{A} == false"), &r));
    }

    #[test]
    fn string_equality() {
        let r = responses(&[("Country", "Canada")]);
        assert!(is_visible(Some("{Country} == 'Canada'"), &r));
        assert!(is_visible(Some("{Country} != \"Mexico\""), &r));
        assert!(!is_visible(Some("{Country} == 'canada'"), &r));
    }

    #[test]
    fn mixed_type_equality_is_false_not_error() {
        let r = responses(&[("A", "hello")]);
        assert!(!is_visible(Some("{A} == 5"), &r));
        assert!(is_visible(Some("{A} != 5"), &r));
    }

    #[test]
    fn incomparable_ordering_hides_field() {
        let r = responses(&[("A", "hello")]);
        assert!(!is_visible(Some("{A} > 5"), &r));
    }

    #[test]
    fn numeric_comparisons_across_int_and_float() {
        let r = responses(&[("Salary", "85000.50"), ("Hours", "40")]);
        assert!(is_visible(Some("{Salary} >= 85000"), &r));
        assert!(is_visible(Some("{Hours} <= 40.0"), &r));
        assert!(is_visible(Some("{Hours} == 40.0"), &r));
        assert!(!is_visible(Some("{Hours} < 40"), &r));
        assert!(is_visible(Some("{Hours} > -1"), &r));
    }

    #[test]
    fn booleans_compare_numerically() {
        let r = responses(&[("A", "yes")]);
        assert!(is_visible(Some("{A} == 1"), &r));
        assert!(!is_visible(Some("{A} > 5"), &r));
    }

    #[test]
    fn or_short_circuits_past_failing_branch() {
        let r = responses(&[("A", "Yes"), ("B", "text")]);
        assert!(is_visible(Some("{A} == 'Yes' || {B} > 5"), &r));
    }

    #[test]
    fn chained_comparison() {
        let r = responses(&[("Age", "30")]);
        assert!(is_visible(Some("18 <= {Age} < 65"), &r));
        assert!(!is_visible(Some("31 <= {Age} < 65"), &r));
    }

    #[test]
    fn response_text_cannot_inject_syntax() {
        let r = responses(&[("A", "x' || 'y"), ("B", "}) || true || ({")]);
        assert!(!is_visible(Some("{A} == 'z'"), &r));
        assert!(!is_visible(Some("{B} == 'z'"), &r));
    }

    #[test]
    fn evaluate_reports_unresolved_field() {
        let expr = DependencyExpression::parse("{A} == 1").unwrap();
        assert_matches!(
            expr.evaluate(&responses(&[])),
            Err(ExpressionError::UnresolvedField(key)) if key == "A"
        );
    }

    #[test]
    fn syntax_errors_hide_field() {
        let r = responses(&[("A", "1")]);
        assert!(!is_visible(Some("{A} =="), &r));
        assert!(!is_visible(Some("{A} === 1"), &r));
        assert!(!is_visible(Some("({A} == 1"), &r));
    }

    // -- Reference extraction -------------------------------------------------

    #[test]
    fn extract_references_from_valid_and_invalid_text() {
        assert_eq!(
            extract_field_references("{Job.Remote} == 'Yes' && {Job.Hours} > 20"),
            vec!["Job.Remote".to_string(), "Job.Hours".to_string()]
        );
        assert_eq!(
            extract_field_references("{A} ??? {A} {B}"),
            vec!["A".to_string(), "B".to_string()]
        );
        assert!(extract_field_references("no refs").is_empty());
    }
}
