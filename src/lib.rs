//! jsop - a small Lisp whose surface syntax is JSON
//!
//! Programs are ordinary JSON values. Objects carrying a single recognised key
//! are special forms, arrays are evaluated element by element, and strings
//! starting with `$` are symbol references:
//!
//! ```json
//! [
//!     {"set": {"var": "$sum", "val": 0}},
//!     {"loop": {"for": "$i", "from": 1, "until": 4, "do": {
//!         "set": {"var": "$sum", "val": {"command": {"symbol": "+", "args": ["$sum", "$i"]}}}
//!     }}},
//!     "total: {$sum}"
//! ]
//! ```
//!
//! ## Pipeline
//!
//! Source text is turned into an [`ast::Expression`] tree by the JSON front end,
//! `defmacro` declarations are extracted and registered ([`macros::define_macros`]),
//! macro invocations are rewritten in a single bottom-up pass
//! ([`macros::expand_macros`]), and the resulting tree is evaluated against an
//! [`evaluator::Environment`] ([`evaluator::eval`]).
//!
//! ## Control flow as values
//!
//! `break`, `continue`, `return` and runtime errors never unwind the host
//! stack. They travel as [`evaluator::Signal`] values in the `Err` side of
//! [`evaluator::EvalResult`] and are consumed at fixed boundaries: loops
//! consume `Break`/`Continue`, function application consumes `Return`, and
//! errors propagate to the caller of [`evaluator::eval`].
//!
//! ## Modules
//!
//! - `ast`: expression tree and the generic bottom-up rewrite
//! - `object`: runtime values
//! - `evaluator`: environments and the tree-walking evaluator
//! - `builtinops`: the fixed builtin table
//! - `quote`: quoting with selective `unquote`
//! - `macros`: macro definition and expansion
//! - `json`: JSON text front end (feature `json`)

use thiserror::Error;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Input is not valid JSON
    InvalidSyntax,
    /// Valid JSON that has no counterpart in the language (null, floats)
    Unsupported,
    /// Two keys of one object collide once normalised
    DuplicateKey,
    /// Implementation-imposed limit exceeded (integer range)
    ImplementationLimit,
}

/// A structured error describing a parsing failure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
        }
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("parse error: {}", .0.message)]
    ParseError(ParseError),
    #[error("{0}")]
    EvalError(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("symbol not found: {0}")]
    UnboundVariable(String),
    #[error("wrong number of arguments. want={expected}, got={got}")]
    ArityError { expected: usize, got: usize },
    #[error("macro error: {0}")]
    MacroError(String),
}

impl Error {
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod macros;
pub mod object;
pub mod quote;
mod template;

#[cfg(feature = "json")]
pub mod json;

use ast::Expression;
use evaluator::{Environment, EvalResult, Signal};
use object::Object;

/// Register the macros `program` defines in `env` and expand every call.
///
/// Macro definitions are registered in `env`, so a long-lived environment (a
/// REPL session, say) keeps macros available to later programs.
pub fn expand_program(mut program: Expression, env: &Environment) -> Result<Expression, Error> {
    macros::define_macros(&mut program, env)?;
    Ok(macros::expand_macros(program, env))
}

/// Expand `program`, evaluate it in `env` and report its final object.
pub fn evaluate_program(program: Expression, env: &Environment) -> Result<Object, Error> {
    // A lone definition is stripped to an empty array, which reports null
    let top_level_array =
        matches!(program, Expression::Array(_)) || macros::is_macro_definition(&program);
    let expanded = expand_program(program, env)?;
    Ok(final_object(evaluator::eval(&expanded, env), top_level_array))
}

/// Reduce the outcome of a top-level evaluation to the object a driver reports.
///
/// When the program itself was an array, its last element is reported (`null`
/// when empty); any other program reports its value as is. A pending `return`
/// reports the value it carries, and an error signal is materialised as an
/// [`Object::Error`].
pub fn final_object(result: EvalResult, top_level_array: bool) -> Object {
    match result {
        Ok(Object::Array(mut elements)) if top_level_array => {
            elements.pop().unwrap_or(Object::Null)
        }
        Ok(object) => object,
        Err(Signal::Return(value)) => value,
        Err(Signal::Error(err)) => Object::Error(err),
        Err(Signal::Break) => Object::Error(Error::EvalError("break outside of loop".into())),
        Err(Signal::Continue) => {
            Object::Error(Error::EvalError("continue outside of loop".into()))
        }
    }
}

/// Parse, expand and evaluate `source` in a fresh global environment.
///
/// Only parse and macro-definition failures are reported as `Err`; runtime
/// failures are ordinary results and come back as [`Object::Error`].
#[cfg(feature = "json")]
pub fn run(source: &str) -> Result<Object, Error> {
    run_with_env(source, &Environment::new())
}

/// Like [`run`], but evaluates in a caller-supplied environment.
#[cfg(feature = "json")]
pub fn run_with_env(source: &str, env: &Environment) -> Result<Object, Error> {
    let program = json::parse_program(source)?;
    evaluate_program(program, env)
}
