//! Runtime values produced by evaluation.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Expression, IntegerType};
use crate::builtinops::BuiltinOp;
use crate::evaluator::Environment;

/// A runtime value
#[derive(Clone)]
pub enum Object {
    Integer(IntegerType),
    String(String),
    Boolean(bool),
    Array(Vec<Object>),
    Null,
    /// Runtime error materialised as a value (array elements, final results)
    Error(Error),
    /// User-defined function closing over its defining environment
    Function {
        params: Vec<String>,
        body: Rc<Expression>,
        env: Environment,
    },
    /// Entry of the builtin table
    Builtin(&'static BuiltinOp),
    /// Unevaluated syntax produced by `quote`
    Quote(Expression),
    /// Macro registered by `defmacro`
    Macro {
        keys: Vec<String>,
        body: Rc<Expression>,
        env: Environment,
    },
}

impl Object {
    /// Tag name used in type error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::String(_) => "STRING",
            Object::Boolean(_) => "BOOLEAN",
            Object::Array(_) => "ARRAY",
            Object::Null => "NULL",
            Object::Error(_) => "ERROR",
            Object::Function { .. } => "FUNCTION",
            Object::Builtin(_) => "BUILTIN",
            Object::Quote(_) => "QUOTE",
            Object::Macro { .. } => "MACRO",
        }
    }

    /// Everything except `false` is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false))
    }

    /// Convert a value back into syntax, as `unquote` does.
    ///
    /// Only integers, booleans, strings, arrays of convertible values and
    /// quotes have a syntactic form.
    pub fn to_expression(&self) -> Option<Expression> {
        match self {
            Object::Integer(n) => Some(Expression::IntegerLiteral(*n)),
            Object::Boolean(b) => Some(Expression::Boolean(*b)),
            Object::String(text) => Some(Expression::StringLiteral(text.clone())),
            Object::Array(elements) => elements
                .iter()
                .map(Object::to_expression)
                .collect::<Option<Vec<_>>>()
                .map(Expression::Array),
            Object::Quote(expr) => Some(expr.clone()),
            Object::Null
            | Object::Error(_)
            | Object::Function { .. }
            | Object::Builtin(_)
            | Object::Macro { .. } => None,
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Inspect text: what `print` writes and what interpolation substitutes
impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(n) => write!(f, "{n}"),
            Object::String(text) => write!(f, "{text}"),
            Object::Boolean(b) => write!(f, "{b}"),
            Object::Array(elements) => {
                write!(f, "[")?;
                write_joined(f, elements)?;
                write!(f, "]")
            }
            Object::Null => write!(f, "null"),
            Object::Error(err) => write!(f, "ERROR: {err}"),
            Object::Function { params, body, .. } => {
                write!(f, "fn(")?;
                write_joined(f, params)?;
                write!(f, ") {{\n{body}\n}}")
            }
            Object::Builtin(op) => write!(f, "builtin function: {}", op.id),
            Object::Quote(expr) => write!(f, "QUOTE({expr})"),
            Object::Macro { keys, body, .. } => {
                write!(f, "macro(")?;
                write_joined(f, keys)?;
                write!(f, ") {{\n{body}\n}}")
            }
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(n) => write!(f, "Integer({n})"),
            Object::String(text) => write!(f, "String({text:?})"),
            Object::Boolean(b) => write!(f, "Boolean({b})"),
            Object::Array(elements) => f.debug_tuple("Array").field(elements).finish(),
            Object::Null => write!(f, "Null"),
            Object::Error(err) => f.debug_tuple("Error").field(err).finish(),
            // Closures hold their environment, which may hold the closure again
            Object::Function { params, body, .. } => f
                .debug_struct("Function")
                .field("params", params)
                .field("body", &body.to_string())
                .finish_non_exhaustive(),
            Object::Builtin(op) => write!(f, "Builtin({})", op.id),
            Object::Quote(expr) => write!(f, "Quote({expr})"),
            Object::Macro { keys, body, .. } => f
                .debug_struct("Macro")
                .field("keys", keys)
                .field("body", &body.to_string())
                .finish_non_exhaustive(),
        }
    }
}

/// Structural equality for data; identity for closures and macros
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Error(a), Object::Error(b)) => a == b,
            (Object::Builtin(a), Object::Builtin(b)) => a.id == b.id,
            (Object::Quote(a), Object::Quote(b)) => a == b,
            (
                Object::Function {
                    body: body_a,
                    env: env_a,
                    ..
                },
                Object::Function {
                    body: body_b,
                    env: env_b,
                    ..
                },
            )
            | (
                Object::Macro {
                    body: body_a,
                    env: env_a,
                    ..
                },
                Object::Macro {
                    body: body_b,
                    env: env_b,
                    ..
                },
            ) => Rc::ptr_eq(body_a, body_b) && env_a.ptr_eq(env_b),
            _ => false,
        }
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Object {
            fn from(n: $int_type) -> Self {
                Object::Integer(IntegerType::from(n))
            }
        }
    };
}

impl_from_integer!(i32);
impl_from_integer!(IntegerType);
impl_from_integer!(u32);

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<&str> for Object {
    fn from(text: &str) -> Self {
        Object::String(text.to_owned())
    }
}

impl From<String> for Object {
    fn from(text: String) -> Self {
        Object::String(text)
    }
}

impl<T: Into<Object>> From<Vec<T>> for Object {
    fn from(elements: Vec<T>) -> Self {
        Object::Array(elements.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<&Object> for IntegerType {
    type Error = Error;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        match value {
            Object::Integer(n) => Ok(*n),
            other => Err(Error::TypeError(format!(
                "expected INTEGER, got {}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<&Object> for bool {
    type Error = Error;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        match value {
            Object::Boolean(b) => Ok(*b),
            other => Err(Error::TypeError(format!(
                "expected BOOLEAN, got {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::{command, lit};
    use crate::builtinops::find_builtin;
    use pretty_assertions::assert_eq;

    fn function(params: &[&str], body: Expression, env: &Environment) -> Object {
        Object::Function {
            params: params.iter().map(|p| (*p).to_owned()).collect(),
            body: Rc::new(body),
            env: env.clone(),
        }
    }

    #[test]
    fn test_inspect_text() {
        let env = Environment::new();
        let test_cases = vec![
            (Object::Integer(-7), "-7"),
            (Object::from("plain"), "plain"),
            (Object::Boolean(false), "false"),
            (Object::from(vec![1i64, 2, 3]), "[1, 2, 3]"),
            (Object::Array(vec![]), "[]"),
            (
                Object::Array(vec![Object::from("a"), Object::Null]),
                "[a, null]",
            ),
            (Object::Null, "null"),
            (
                Object::Error(Error::UnboundVariable("$x".into())),
                "ERROR: symbol not found: $x",
            ),
            (
                function(&["$a", "$b"], command("+", lit(["$a", "$b"])), &env),
                "fn($a, $b) {\n{\"command\": {\"symbol\": \"+\", \"args\": [\"$a\", \"$b\"]}}\n}",
            ),
            (
                Object::Builtin(find_builtin("+").unwrap()),
                "builtin function: +",
            ),
            (Object::Quote(lit([1, 2])), "QUOTE([1, 2])"),
        ];

        for (i, (object, expected)) in test_cases.iter().enumerate() {
            assert_eq!(object.to_string(), *expected, "case #{}", i + 1);
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(Object::from(vec![1i64, 2]), Object::from(vec![1i64, 2]));
        assert_ne!(Object::Integer(1), Object::from("1"));
        assert_ne!(Object::Boolean(true), Object::Integer(1));
        assert_eq!(Object::Null, Object::Null);

        let env = Environment::new();
        let f = function(&["$x"], lit("$x"), &env);
        let same_text = function(&["$x"], lit("$x"), &env);
        assert_eq!(f, f.clone());
        assert_ne!(f, same_text);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Object::Boolean(false).is_truthy());
        assert!(Object::Boolean(true).is_truthy());
        assert!(Object::Integer(0).is_truthy());
        assert!(Object::Null.is_truthy());
        assert!(Object::from("").is_truthy());
    }

    #[test]
    fn test_to_expression() {
        assert_eq!(Object::Integer(-3).to_expression(), Some(lit(-3)));
        assert_eq!(Object::from("$x").to_expression(), Some(lit("$x")));
        assert_eq!(
            Object::from(vec![Object::Integer(1), Object::Boolean(true)]).to_expression(),
            Some(lit(vec![lit(1), lit(true)]))
        );
        assert_eq!(
            Object::Quote(command("-", lit([3, 2]))).to_expression(),
            Some(command("-", lit([3, 2])))
        );
        assert_eq!(Object::Null.to_expression(), None);
        assert_eq!(
            Object::from(vec![Object::Integer(1), Object::Null]).to_expression(),
            None
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(IntegerType::try_from(&Object::Integer(4)), Ok(4));
        assert_eq!(
            IntegerType::try_from(&Object::Boolean(true)),
            Err(Error::TypeError("expected INTEGER, got BOOLEAN".into()))
        );
        assert_eq!(bool::try_from(&Object::Boolean(true)), Ok(true));
        assert!(bool::try_from(&Object::Null).is_err());
    }
}
