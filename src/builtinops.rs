//! Built-in operations registry.
//!
//! Builtins are resolved by name before any user binding, so they cannot be
//! shadowed. Every builtin receives exactly one argument object, the value of
//! the command's `args`:
//!
//! ```json
//! {"command": {"symbol": "+", "args": [1, 2, 3]}}
//! {"command": {"symbol": "len", "args": "$list"}}
//! ```
//!
//! ## Operands
//!
//! Most operations spread their argument into operands: an array contributes
//! its elements, `null` (no `args`) contributes nothing and any other value is
//! a single operand. `len` and `print` instead take the argument as is, so
//! `len` of an array measures that array.
//!
//! ## Error Handling
//!
//! - **Type Safety**: operations reject incorrect types (`{"!": 1}` errors)
//! - **No Coercion**: integers never become strings or booleans
//! - **Overflow Detection**: arithmetic is checked; division by zero is an error
//! - **Arity Checking**: operand counts are validated before the call
//!
//! Errors are returned, never raised; the evaluator turns them into error
//! signals.

use crate::Error;
use crate::ast::IntegerType;
use crate::object::Object;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical builtin signature over the normalised operand list
pub type BuiltinFn = fn(Vec<Object>) -> Result<Object, Error>;

/// Expected number of operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn validate(self, got: usize) -> Result<(), Error> {
        match self {
            Arity::Exact(expected) if got != expected => Err(Error::arity_error(expected, got)),
            Arity::AtLeast(expected) if got < expected => Err(Error::arity_error(expected, got)),
            _ => Ok(()),
        }
    }
}

/// How the single argument object becomes the operand list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStyle {
    /// Array elements, nothing for `null`, otherwise the argument itself
    Spread,
    /// The argument itself as the only operand
    Whole,
}

/// Definition of a built-in operation
#[derive(Debug)]
pub struct BuiltinOp {
    /// Name used in a command's `symbol`
    pub id: &'static str,
    pub arguments: ArgumentStyle,
    pub arity: Arity,
    func: BuiltinFn,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    /// Apply this operation to an evaluated argument object.
    pub fn call(&self, argument: Object) -> Result<Object, Error> {
        let operands = match self.arguments {
            ArgumentStyle::Spread => match argument {
                Object::Array(elements) => elements,
                Object::Null => Vec::new(),
                other => vec![other],
            },
            ArgumentStyle::Whole => vec![argument],
        };
        self.arity.validate(operands.len())?;
        (self.func)(operands)
    }
}

//
// Operand helpers
//

fn type_error(id: &str, expected: &str, got: &Object) -> Error {
    Error::TypeError(format!(
        "'{id}' expects {expected}, got {}",
        got.type_name()
    ))
}

fn integer_operands(id: &str, operands: &[Object]) -> Result<Vec<IntegerType>, Error> {
    operands
        .iter()
        .map(|operand| {
            IntegerType::try_from(operand).map_err(|_| type_error(id, "INTEGER", operand))
        })
        .collect()
}

fn boolean_operands(id: &str, operands: &[Object]) -> Result<Vec<bool>, Error> {
    operands
        .iter()
        .map(|operand| bool::try_from(operand).map_err(|_| type_error(id, "BOOLEAN", operand)))
        .collect()
}

fn overflow(operation: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {operation}"))
}

/// Left fold over integer operands
fn fold_integers(
    id: &str,
    operands: &[Object],
    step: impl Fn(IntegerType, IntegerType) -> Result<IntegerType, Error>,
) -> Result<Object, Error> {
    let values = integer_operands(id, operands)?;
    let Some((&first, rest)) = values.split_first() else {
        return Err(Error::arity_error(1, 0));
    };
    rest.iter()
        .try_fold(first, |acc, &n| step(acc, n))
        .map(Object::Integer)
}

//
// Builtin Function Implementations
//

fn builtin_add(operands: Vec<Object>) -> Result<Object, Error> {
    fold_integers("+", &operands, |a, b| {
        a.checked_add(b).ok_or_else(|| overflow("addition"))
    })
}

fn builtin_sub(operands: Vec<Object>) -> Result<Object, Error> {
    fold_integers("-", &operands, |a, b| {
        a.checked_sub(b).ok_or_else(|| overflow("subtraction"))
    })
}

fn builtin_mul(operands: Vec<Object>) -> Result<Object, Error> {
    fold_integers("*", &operands, |a, b| {
        a.checked_mul(b).ok_or_else(|| overflow("multiplication"))
    })
}

fn builtin_div(operands: Vec<Object>) -> Result<Object, Error> {
    fold_integers("/", &operands, |a, b| {
        if b == 0 {
            return Err(Error::EvalError("division by zero".into()));
        }
        a.checked_div(b).ok_or_else(|| overflow("division"))
    })
}

fn builtin_rem(operands: Vec<Object>) -> Result<Object, Error> {
    fold_integers("%", &operands, |a, b| {
        if b == 0 {
            return Err(Error::EvalError("modulo by zero".into()));
        }
        a.checked_rem(b).ok_or_else(|| overflow("modulo"))
    })
}

// Macro to generate chained integer comparisons
macro_rules! integer_comparison {
    ($name:ident, $op:tt, $id:expr) => {
        fn $name(operands: Vec<Object>) -> Result<Object, Error> {
            let values = integer_operands($id, &operands)?;
            Ok(Object::Boolean(
                values.windows(2).all(|pair| pair[0] $op pair[1]),
            ))
        }
    };
}

integer_comparison!(builtin_lt, <, "<");
integer_comparison!(builtin_gt, >, ">");
integer_comparison!(builtin_le, <=, "<=");
integer_comparison!(builtin_ge, >=, ">=");

fn builtin_equal(operands: Vec<Object>) -> Result<Object, Error> {
    Ok(Object::Boolean(
        operands.windows(2).all(|pair| pair[0] == pair[1]),
    ))
}

fn builtin_not_equal(operands: Vec<Object>) -> Result<Object, Error> {
    Ok(Object::Boolean(
        operands.windows(2).any(|pair| pair[0] != pair[1]),
    ))
}

fn builtin_not(operands: Vec<Object>) -> Result<Object, Error> {
    match boolean_operands("!", &operands)?.as_slice() {
        [b] => Ok(Object::Boolean(!b)),
        values => Err(Error::arity_error(1, values.len())),
    }
}

fn builtin_and(operands: Vec<Object>) -> Result<Object, Error> {
    let values = boolean_operands("&&", &operands)?;
    Ok(Object::Boolean(values.iter().all(|b| *b)))
}

fn builtin_or(operands: Vec<Object>) -> Result<Object, Error> {
    let values = boolean_operands("||", &operands)?;
    Ok(Object::Boolean(values.iter().any(|b| *b)))
}

fn builtin_at(operands: Vec<Object>) -> Result<Object, Error> {
    let [container, index] = operands.as_slice() else {
        return Err(Error::arity_error(2, operands.len()));
    };
    let index = IntegerType::try_from(index).map_err(|_| type_error("at", "INTEGER index", index))?;
    let out_of_range = |len: usize| {
        Error::EvalError(format!("index out of range: {index} (length {len})"))
    };

    match container {
        Object::Array(elements) => usize::try_from(index)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .ok_or_else(|| out_of_range(elements.len())),
        Object::String(text) => usize::try_from(index)
            .ok()
            .and_then(|i| text.chars().nth(i))
            .map(|c| Object::String(c.to_string()))
            .ok_or_else(|| out_of_range(text.chars().count())),
        other => Err(type_error("at", "ARRAY or STRING", other)),
    }
}

fn builtin_len(operands: Vec<Object>) -> Result<Object, Error> {
    let len = match operands.first() {
        Some(Object::Array(elements)) => elements.len(),
        Some(Object::String(text)) => text.chars().count(),
        Some(other) => return Err(type_error("len", "ARRAY or STRING", other)),
        None => return Err(Error::arity_error(1, 0)),
    };
    IntegerType::try_from(len)
        .map(Object::Integer)
        .map_err(|_| overflow("len"))
}

fn builtin_print(operands: Vec<Object>) -> Result<Object, Error> {
    for operand in &operands {
        println!("{operand}");
    }
    Ok(Object::Null)
}

/// Builtin table, in lookup order for listings
static BUILTIN_OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "+",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(1),
        func: builtin_add,
    },
    BuiltinOp {
        id: "-",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_sub,
    },
    BuiltinOp {
        id: "*",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(1),
        func: builtin_mul,
    },
    BuiltinOp {
        id: "/",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_div,
    },
    BuiltinOp {
        id: "%",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_rem,
    },
    BuiltinOp {
        id: "==",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_equal,
    },
    BuiltinOp {
        id: "!=",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_not_equal,
    },
    BuiltinOp {
        id: "<",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_lt,
    },
    BuiltinOp {
        id: ">",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_gt,
    },
    BuiltinOp {
        id: "<=",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_le,
    },
    BuiltinOp {
        id: ">=",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_ge,
    },
    BuiltinOp {
        id: "!",
        arguments: ArgumentStyle::Spread,
        arity: Arity::Exact(1),
        func: builtin_not,
    },
    BuiltinOp {
        id: "&&",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_and,
    },
    BuiltinOp {
        id: "||",
        arguments: ArgumentStyle::Spread,
        arity: Arity::AtLeast(2),
        func: builtin_or,
    },
    BuiltinOp {
        id: "at",
        arguments: ArgumentStyle::Spread,
        arity: Arity::Exact(2),
        func: builtin_at,
    },
    BuiltinOp {
        id: "len",
        arguments: ArgumentStyle::Whole,
        arity: Arity::Exact(1),
        func: builtin_len,
    },
    BuiltinOp {
        id: "print",
        arguments: ArgumentStyle::Whole,
        arity: Arity::Exact(1),
        func: builtin_print,
    },
];

/// Lazy static map from id to BuiltinOp (private - use find_builtin)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.id, op)).collect());

/// Get all builtin operations
pub fn builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by name
pub fn find_builtin(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(values: &[IntegerType]) -> Object {
        Object::Array(values.iter().map(|n| Object::Integer(*n)).collect())
    }

    fn call_builtin(name: &str, argument: Object) -> Result<Object, Error> {
        find_builtin(name).unwrap().call(argument)
    }

    fn type_err(message: &str) -> Result<Object, Error> {
        Err(Error::TypeError(message.into()))
    }

    fn eval_err(message: &str) -> Result<Object, Error> {
        Err(Error::EvalError(message.into()))
    }

    #[test]
    fn test_builtin_ops_registry() {
        let add_op = find_builtin("+").unwrap();
        assert_eq!(add_op.arity, Arity::AtLeast(1));
        assert_eq!(add_op.arguments, ArgumentStyle::Spread);

        let len_op = find_builtin("len").unwrap();
        assert_eq!(len_op.arguments, ArgumentStyle::Whole);

        assert!(find_builtin("unknown").is_none());
        assert!(find_builtin("$x").is_none());

        let ids: Vec<_> = builtin_ops().iter().map(|op| op.id).collect();
        assert_eq!(
            ids,
            vec![
                "+", "-", "*", "/", "%", "==", "!=", "<", ">", "<=", ">=", "!", "&&", "||", "at",
                "len", "print"
            ]
        );
    }

    #[test]
    fn test_arity_validation() {
        assert_eq!(Arity::Exact(2).validate(2), Ok(()));
        assert_eq!(Arity::Exact(2).validate(3), Err(Error::arity_error(2, 3)));
        assert_eq!(Arity::AtLeast(1).validate(5), Ok(()));
        assert_eq!(Arity::AtLeast(2).validate(1), Err(Error::arity_error(2, 1)));
    }

    #[test]
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Object, Result<Object, Error>);

        let test_cases: Vec<TestCase> = vec![
            // Arithmetic
            ("+", ints(&[1, 2, 3]), Ok(Object::Integer(6))),
            ("+", Object::Integer(5), Ok(Object::Integer(5))),
            ("+", ints(&[]), Err(Error::arity_error(1, 0))),
            ("+", Object::Null, Err(Error::arity_error(1, 0))),
            ("+", ints(&[IntegerType::MAX, 1]), eval_err("Integer overflow in addition")),
            (
                "+",
                Object::Array(vec![Object::Integer(1), Object::from("2")]),
                type_err("'+' expects INTEGER, got STRING"),
            ),
            ("-", ints(&[10, 3, 2]), Ok(Object::Integer(5))),
            ("-", ints(&[3, 2]), Ok(Object::Integer(1))),
            ("-", ints(&[3]), Err(Error::arity_error(2, 1))),
            ("-", ints(&[IntegerType::MIN, 1]), eval_err("Integer overflow in subtraction")),
            ("*", ints(&[2, 3, 4]), Ok(Object::Integer(24))),
            ("*", ints(&[IntegerType::MAX, 2]), eval_err("Integer overflow in multiplication")),
            ("/", ints(&[20, 2, 5]), Ok(Object::Integer(2))),
            ("/", ints(&[-7, 2]), Ok(Object::Integer(-3))),
            ("/", ints(&[1, 0]), eval_err("division by zero")),
            ("/", ints(&[IntegerType::MIN, -1]), eval_err("Integer overflow in division")),
            ("%", ints(&[7, 4]), Ok(Object::Integer(3))),
            ("%", ints(&[10, 2]), Ok(Object::Integer(0))),
            ("%", ints(&[1, 0]), eval_err("modulo by zero")),
            // Equality works on any type
            ("==", ints(&[1, 1, 1]), Ok(Object::Boolean(true))),
            ("==", ints(&[1, 1, 2]), Ok(Object::Boolean(false))),
            (
                "==",
                Object::Array(vec![Object::from("a"), Object::from("a")]),
                Ok(Object::Boolean(true)),
            ),
            (
                "==",
                Object::Array(vec![Object::Integer(1), Object::Boolean(true)]),
                Ok(Object::Boolean(false)),
            ),
            (
                "==",
                Object::Array(vec![ints(&[1, 2]), ints(&[1, 2])]),
                Ok(Object::Boolean(true)),
            ),
            ("==", ints(&[1]), Err(Error::arity_error(2, 1))),
            ("!=", ints(&[1, 2]), Ok(Object::Boolean(true))),
            ("!=", ints(&[2, 2]), Ok(Object::Boolean(false))),
            (
                "!=",
                Object::Array(vec![Object::Null, Object::Null]),
                Ok(Object::Boolean(false)),
            ),
            // Chained comparisons
            ("<", ints(&[1, 2, 3]), Ok(Object::Boolean(true))),
            ("<", ints(&[1, 3, 2]), Ok(Object::Boolean(false))),
            ("<", ints(&[2, 2]), Ok(Object::Boolean(false))),
            (">", ints(&[11, 10]), Ok(Object::Boolean(true))),
            (">", ints(&[3, 2, 2]), Ok(Object::Boolean(false))),
            ("<=", ints(&[1, 1, 2]), Ok(Object::Boolean(true))),
            (">=", ints(&[3, 3, 1]), Ok(Object::Boolean(true))),
            (">=", ints(&[1, 2]), Ok(Object::Boolean(false))),
            (
                "<",
                Object::Array(vec![Object::from("a"), Object::from("b")]),
                type_err("'<' expects INTEGER, got STRING"),
            ),
            ("<", ints(&[1]), Err(Error::arity_error(2, 1))),
            // Logic
            ("!", Object::Boolean(true), Ok(Object::Boolean(false))),
            (
                "!",
                Object::Array(vec![Object::Boolean(false)]),
                Ok(Object::Boolean(true)),
            ),
            ("!", Object::Integer(1), type_err("'!' expects BOOLEAN, got INTEGER")),
            (
                "!",
                Object::Array(vec![Object::Boolean(true), Object::Boolean(true)]),
                Err(Error::arity_error(1, 2)),
            ),
            (
                "&&",
                Object::Array(vec![Object::Boolean(true), Object::Boolean(true)]),
                Ok(Object::Boolean(true)),
            ),
            (
                "&&",
                Object::Array(vec![Object::Boolean(true), Object::Boolean(false)]),
                Ok(Object::Boolean(false)),
            ),
            (
                "||",
                Object::Array(vec![Object::Boolean(false), Object::Boolean(true)]),
                Ok(Object::Boolean(true)),
            ),
            (
                "||",
                Object::Array(vec![Object::Boolean(false), Object::Integer(0)]),
                type_err("'||' expects BOOLEAN, got INTEGER"),
            ),
            // Indexing
            (
                "at",
                Object::Array(vec![ints(&[10, 20, 30]), Object::Integer(1)]),
                Ok(Object::Integer(20)),
            ),
            (
                "at",
                Object::Array(vec![ints(&[10, 20, 30]), Object::Integer(3)]),
                eval_err("index out of range: 3 (length 3)"),
            ),
            (
                "at",
                Object::Array(vec![ints(&[10]), Object::Integer(-1)]),
                eval_err("index out of range: -1 (length 1)"),
            ),
            (
                "at",
                Object::Array(vec![Object::from("héllo"), Object::Integer(1)]),
                Ok(Object::from("é")),
            ),
            (
                "at",
                Object::Array(vec![Object::Integer(5), Object::Integer(0)]),
                type_err("'at' expects ARRAY or STRING, got INTEGER"),
            ),
            (
                "at",
                Object::Array(vec![ints(&[1]), Object::from("0")]),
                type_err("'at' expects INTEGER index, got STRING"),
            ),
            ("at", ints(&[1]), Err(Error::arity_error(2, 1))),
            // Length takes the argument itself
            ("len", ints(&[1, 2, 3]), Ok(Object::Integer(3))),
            ("len", ints(&[]), Ok(Object::Integer(0))),
            ("len", Object::from("héllo"), Ok(Object::Integer(5))),
            ("len", Object::Integer(3), type_err("'len' expects ARRAY or STRING, got INTEGER")),
            ("len", Object::Null, type_err("'len' expects ARRAY or STRING, got NULL")),
            // Output
            ("print", Object::from("hello"), Ok(Object::Null)),
            ("print", ints(&[1, 2]), Ok(Object::Null)),
        ];

        for (i, (name, argument, expected)) in test_cases.into_iter().enumerate() {
            let described = format!("{name} {argument}");
            assert_eq!(
                call_builtin(name, argument),
                expected,
                "case #{}: {described}",
                i + 1
            );
        }
    }
}
