//! JSON text front end.
//!
//! JSON values map onto the expression tree directly:
//!
//! | JSON | Expression |
//! |---|---|
//! | integer | `IntegerLiteral`; negative integers as the `-` prefix form |
//! | string / boolean | `StringLiteral` / `Boolean` |
//! | array | `Array` |
//! | object | `KeyValueObject`, keys lowercased, source order kept |
//!
//! `null` and non-integer numbers have no counterpart in the language and are
//! rejected. Keys starting with `//` are comments and are dropped.

use crate::ast::{Expression, KeyValuePair};
use crate::{Error, ParseError, ParseErrorKind};
use serde_json::Value;

/// Object keys starting with this prefix are comments
pub const COMMENT_PREFIX: &str = "//";

/// Options for [`parse_program_with_config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Normalise object keys to lowercase
    pub lowercase_keys: bool,
    /// Drop object entries whose key starts with [`COMMENT_PREFIX`]
    pub strip_comments: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            lowercase_keys: true,
            strip_comments: true,
        }
    }
}

fn parse_error(kind: ParseErrorKind, message: impl Into<String>) -> Error {
    Error::ParseError(ParseError::new(kind, message))
}

/// Parse a program with the default configuration.
pub fn parse_program(input: &str) -> Result<Expression, Error> {
    parse_program_with_config(input, ParseConfig::default())
}

pub fn parse_program_with_config(input: &str, config: ParseConfig) -> Result<Expression, Error> {
    let json: Value = serde_json::from_str(input)
        .map_err(|e| parse_error(ParseErrorKind::InvalidSyntax, format!("Invalid JSON: {e}")))?;
    compile_json(json, config)
}

fn compile_json(json: Value, config: ParseConfig) -> Result<Expression, Error> {
    match json {
        Value::Null => Err(parse_error(
            ParseErrorKind::Unsupported,
            "null is not a value in this language",
        )),
        Value::Bool(b) => Ok(Expression::Boolean(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) if i < 0 && i != i64::MIN => Ok(Expression::PrefixAtom {
                operator: "-".into(),
                right: Box::new(Expression::IntegerLiteral(-i)),
            }),
            Some(i) => Ok(Expression::IntegerLiteral(i)),
            None if n.is_u64() => Err(parse_error(
                ParseErrorKind::ImplementationLimit,
                format!("integer {n} does not fit in 64 bits"),
            )),
            None => Err(parse_error(
                ParseErrorKind::Unsupported,
                format!("non-integer number {n}"),
            )),
        },
        Value::String(s) => Ok(Expression::StringLiteral(s)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| compile_json(item, config))
            .collect::<Result<Vec<_>, _>>()
            .map(Expression::Array),
        Value::Object(map) => {
            let mut pairs: Vec<KeyValuePair> = Vec::with_capacity(map.len());
            for (key, value) in map {
                if config.strip_comments && key.starts_with(COMMENT_PREFIX) {
                    continue;
                }
                let key = if config.lowercase_keys {
                    key.to_lowercase()
                } else {
                    key
                };
                if pairs.iter().any(|pair| pair.key == key) {
                    return Err(parse_error(
                        ParseErrorKind::DuplicateKey,
                        format!("duplicate key '{key}'"),
                    ));
                }
                pairs.push(KeyValuePair::new(key, compile_json(value, config)?));
            }
            Ok(Expression::KeyValueObject(pairs))
        }
    }
}

/// Render an expression as a JSON value.
///
/// The `-` prefix form over an integer becomes a negative number again. Other
/// prefix forms have no JSON shape and are rendered as their source text in a
/// string.
pub fn expression_to_json(expr: &Expression) -> Value {
    match expr {
        Expression::IntegerLiteral(n) => Value::from(*n),
        Expression::StringLiteral(text) => Value::String(text.clone()),
        Expression::Boolean(b) => Value::Bool(*b),
        Expression::PrefixAtom { operator, right } => {
            match (operator.as_str(), right.as_ref()) {
                ("-", Expression::IntegerLiteral(n)) if *n != i64::MIN => Value::from(-n),
                _ => Value::String(expr.to_string()),
            }
        }
        Expression::Array(elements) => {
            Value::Array(elements.iter().map(expression_to_json).collect())
        }
        Expression::KeyValueObject(pairs) => Value::Object(
            pairs
                .iter()
                .map(|pair| (pair.key.clone(), expression_to_json(&pair.value)))
                .collect(),
        ),
    }
}

/// Render an expression as pretty-printed JSON text.
pub fn expression_to_string(expr: &Expression) -> Result<String, Error> {
    serde_json::to_string_pretty(&expression_to_json(expr))
        .map_err(|e| Error::EvalError(format!("cannot render expression as JSON: {e}")))
}
