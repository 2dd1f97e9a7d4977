//! This module defines the expression tree produced by the front end and
//! consumed by the macro passes and the evaluator. The tag set is closed:
//! integer, string, boolean, prefix atom, array and key/value object.
//!
//! Strings double as symbol references (text starting with `$`) and as
//! interpolation templates (text containing `{ $name }` spans); that reading
//! is the evaluator's business, the tree only stores the text.
//!
//! [`modify`] and [`try_modify`] implement the generic post-order rewrite
//! shared by quoting and macro expansion. They consume the input tree and
//! build a fresh one, so a tree held elsewhere (a macro body, a function
//! body) is never rewritten behind its owner's back.

use std::convert::Infallible;
use std::fmt;

/// Type alias for integer literals in the language
pub(crate) type IntegerType = i64;

/// One `"key": value` entry of a key/value object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: Expression,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: Expression) -> Self {
        KeyValuePair {
            key: key.into(),
            value,
        }
    }
}

/// Core expression type of the language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    IntegerLiteral(IntegerType),
    /// Plain text, a `$symbol` reference, or an interpolation template
    StringLiteral(String),
    Boolean(bool),
    /// Prefix operator applied to an atom, e.g. `-5`
    PrefixAtom {
        operator: String,
        right: Box<Expression>,
    },
    Array(Vec<Expression>),
    /// Ordered key/value pairs; keys are normalised and unique per object
    KeyValueObject(Vec<KeyValuePair>),
}

impl Expression {
    /// Look up `key` when this expression is a key/value object.
    pub fn get(&self, key: &str) -> Option<&Expression> {
        match self {
            Expression::KeyValueObject(pairs) => pairs
                .iter()
                .find(|pair| pair.key == key)
                .map(|pair| &pair.value),
            _ => None,
        }
    }

    /// The text of a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expression::StringLiteral(text) => Some(text),
            _ => None,
        }
    }

    /// The name of a `$`-prefixed symbol reference, `$` included.
    pub fn as_symbol(&self) -> Option<&str> {
        self.as_str().filter(|text| is_symbol(text))
    }
}

/// Symbol references are strings starting with `$`
pub(crate) fn is_symbol(text: &str) -> bool {
    text.starts_with('$')
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::IntegerLiteral(n) => write!(f, "{n}"),
            Expression::StringLiteral(text) => write!(f, "\"{text}\""),
            Expression::Boolean(b) => write!(f, "{b}"),
            Expression::PrefixAtom { operator, right } => write!(f, "{operator}{right}"),
            Expression::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Expression::KeyValueObject(pairs) => {
                write!(f, "{{")?;
                for (i, pair) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// From trait implementations for Expression - enables .into() conversion

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Expression::StringLiteral(text.to_owned())
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Expression::StringLiteral(text)
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::Boolean(b)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Expression {
            fn from(n: $int_type) -> Self {
                Expression::IntegerLiteral(IntegerType::from(n))
            }
        }
    };
}

impl_from_integer!(i32);
impl_from_integer!(IntegerType);
impl_from_integer!(u32);

impl<T: Into<Expression>> From<Vec<T>> for Expression {
    fn from(elements: Vec<T>) -> Self {
        Expression::Array(elements.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Expression>, const N: usize> From<[T; N]> for Expression {
    fn from(elements: [T; N]) -> Self {
        Expression::Array(elements.into_iter().map(Into::into).collect())
    }
}

/// Helper for building literal expressions in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn lit<T: Into<Expression>>(value: T) -> Expression {
    value.into()
}

/// Helper for building key/value objects in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn obj<const N: usize>(pairs: [(&str, Expression); N]) -> Expression {
    Expression::KeyValueObject(
        pairs
            .into_iter()
            .map(|(key, value)| KeyValuePair::new(key, value))
            .collect(),
    )
}

/// Helper for building `{"command": {"symbol": .., "args": ..}}` in tests
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn command(symbol: &str, args: Expression) -> Expression {
    obj([("command", obj([("symbol", lit(symbol)), ("args", args)]))])
}

/// Fallible post-order rewrite.
///
/// Children are rewritten before their parent, and `modifier` is applied to
/// every node including the root. Object keys are not expressions and are
/// left alone. The first error returned by `modifier` aborts the walk.
pub fn try_modify<F, E>(expr: Expression, modifier: &mut F) -> Result<Expression, E>
where
    F: FnMut(Expression) -> Result<Expression, E>,
{
    let rebuilt = match expr {
        Expression::PrefixAtom { operator, right } => Expression::PrefixAtom {
            operator,
            right: Box::new(try_modify(*right, modifier)?),
        },
        Expression::Array(elements) => Expression::Array(
            elements
                .into_iter()
                .map(|element| try_modify(element, modifier))
                .collect::<Result<_, _>>()?,
        ),
        Expression::KeyValueObject(pairs) => Expression::KeyValueObject(
            pairs
                .into_iter()
                .map(|KeyValuePair { key, value }| {
                    try_modify(value, modifier).map(|value| KeyValuePair { key, value })
                })
                .collect::<Result<_, _>>()?,
        ),
        leaf @ (Expression::IntegerLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::Boolean(_)) => leaf,
    };

    modifier(rebuilt)
}

/// Infallible post-order rewrite; see [`try_modify`].
pub fn modify<F>(expr: Expression, modifier: &mut F) -> Expression
where
    F: FnMut(Expression) -> Expression,
{
    match try_modify(expr, &mut |node| Ok::<_, Infallible>(modifier(node))) {
        Ok(rewritten) => rewritten,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_matches_source_shape() {
        let test_cases = vec![
            (lit(42), "42"),
            (lit("hello"), "\"hello\""),
            (lit(true), "true"),
            (
                Expression::PrefixAtom {
                    operator: "-".into(),
                    right: Box::new(lit(10)),
                },
                "-10",
            ),
            (lit([1, 2, 3]), "[1, 2, 3]"),
            (lit(Vec::<Expression>::new()), "[]"),
            (
                command("+", lit([1, 2])),
                "{\"command\": {\"symbol\": \"+\", \"args\": [1, 2]}}",
            ),
            (obj([]), "{}"),
        ];

        for (i, (expr, expected)) in test_cases.iter().enumerate() {
            assert_eq!(expr.to_string(), *expected, "case #{}", i + 1);
        }
    }

    #[test]
    fn test_lookup_helpers() {
        let form = obj([("symbol", lit("$f")), ("args", lit(1))]);
        assert_eq!(form.get("args"), Some(&lit(1)));
        assert_eq!(form.get("missing"), None);
        assert_eq!(lit(1).get("args"), None);

        assert_eq!(lit("$x").as_symbol(), Some("$x"));
        assert_eq!(lit("x").as_symbol(), None);
        assert_eq!(lit("x").as_str(), Some("x"));
        assert_eq!(lit(3).as_str(), None);
    }

    #[test]
    fn test_modify_is_post_order_and_reaches_root() {
        let tree = lit(vec![lit(1), command("+", lit([2, 3]))]);
        let mut visited = Vec::new();
        let rewritten = modify(tree.clone(), &mut |node| {
            visited.push(node.to_string());
            node
        });

        assert_eq!(rewritten, tree);
        assert_eq!(
            visited,
            vec![
                "1",
                "\"+\"",
                "2",
                "3",
                "[2, 3]",
                "{\"symbol\": \"+\", \"args\": [2, 3]}",
                "{\"command\": {\"symbol\": \"+\", \"args\": [2, 3]}}",
                "[1, {\"command\": {\"symbol\": \"+\", \"args\": [2, 3]}}]",
            ]
        );
    }

    #[test]
    fn test_modify_rewrites_leaves_without_touching_keys() {
        let tree = obj([("one", lit(1)), ("list", lit([1, 2]))]);
        let rewritten = modify(tree, &mut |node| match node {
            Expression::IntegerLiteral(1) => lit(2),
            other => other,
        });

        assert_eq!(rewritten, obj([("one", lit(2)), ("list", lit([2, 2]))]));
    }

    #[test]
    fn test_modify_sees_rewritten_children() {
        let tree = Expression::PrefixAtom {
            operator: "-".into(),
            right: Box::new(lit(5)),
        };
        let rewritten = modify(tree, &mut |node| match node {
            Expression::IntegerLiteral(n) => lit(n * 2),
            Expression::PrefixAtom { right, .. } => *right,
            other => other,
        });

        assert_eq!(rewritten, lit(10));
    }

    #[test]
    fn test_try_modify_stops_at_first_error() {
        let tree = lit(vec![lit(1), lit("boom"), lit(3)]);
        let mut seen = 0;
        let result = try_modify(tree, &mut |node| {
            seen += 1;
            match node {
                Expression::StringLiteral(text) => Err(text),
                other => Ok(other),
            }
        });

        assert_eq!(result, Err("boom".to_owned()));
        assert_eq!(seen, 2);
    }
}
