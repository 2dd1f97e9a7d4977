//! Quoting: syntax captured as data, with selective re-evaluation.
//!
//! `{"command": {"symbol": "quote", "args": E}}` yields `Quote(E)` without
//! evaluating `E`, except for two kinds of holes:
//!
//! - `{"command": {"symbol": "unquote", "args": X}}` is replaced by the value
//!   of `X`, converted back into syntax
//! - a string `",name"` is replaced by the binding `name` in the current
//!   environment, converted the same way; an unbound name leaves the string
//!   as it is
//!
//! Holes are filled bottom-up in a single [`try_modify`] pass.

use crate::Error;
use crate::ast::{Expression, try_modify};
use crate::evaluator::{Environment, EvalResult, Signal, eval};
use crate::object::Object;

pub const UNQUOTE_SYMBOL: &str = "unquote";
pub const UNQUOTE_PREFIX: char = ',';

/// Quote `expr`, filling its unquote holes from `env`.
pub fn quote(expr: &Expression, env: &Environment) -> EvalResult {
    let filled = try_modify(expr.clone(), &mut |node| fill_hole(node, env))?;
    Ok(Object::Quote(filled))
}

fn fill_hole(node: Expression, env: &Environment) -> Result<Expression, Signal> {
    if let Some(args) = unquote_args(&node) {
        let value = eval(args, env)?;
        return Ok(into_syntax(&value)?);
    }

    if let Expression::StringLiteral(text) = &node
        && let Some(name) = text.strip_prefix(UNQUOTE_PREFIX)
        && let Some(value) = env.get(name)
    {
        return Ok(into_syntax(&value)?);
    }

    Ok(node)
}

/// The `args` of an `unquote` command; `None` for anything else, including an
/// `unquote` without arguments
fn unquote_args(node: &Expression) -> Option<&Expression> {
    let command = node.get("command")?;
    match command.get("symbol")? {
        Expression::StringLiteral(symbol) if symbol == UNQUOTE_SYMBOL => command.get("args"),
        _ => None,
    }
}

fn into_syntax(value: &Object) -> Result<Expression, Error> {
    value.to_expression().ok_or_else(|| {
        Error::TypeError(format!(
            "cannot unquote {} into syntax",
            value.type_name()
        ))
    })
}
