//! Macro definition and expansion.
//!
//! A macro is declared at the top level of a program:
//!
//! ```json
//! {"defmacro": {
//!     "name": "reverse",
//!     "keys": ["first", "second"],
//!     "body": {"command": {"symbol": "quote",
//!              "args": {"command": {"symbol": "-", "args": [",second", ",first"]}}}}
//! }}
//! ```
//!
//! and invoked as an object whose key is the macro name and whose value
//! supplies every declared key: `{"reverse": {"first": 2, "second": 3}}`.
//!
//! Expansion binds each argument, unevaluated, as a `Quote` in a scope
//! enclosed by the macro's defining environment and evaluates the body
//! there. A body that yields a `Quote` replaces the call site with the quoted
//! syntax. Anything else leaves the call site untouched.

use log::debug;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Expression, KeyValuePair, modify};
use crate::evaluator::{Environment, Fields, eval};
use crate::object::Object;

pub const DEFMACRO_KEY: &str = "defmacro";

/// Register every top-level `defmacro` in `env` and remove it from `program`.
///
/// A program that is a single `defmacro` becomes an empty array.
pub fn define_macros(program: &mut Expression, env: &Environment) -> Result<(), Error> {
    if let Expression::Array(elements) = &mut *program {
        let mut definitions = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            if let Some(definition) = macro_definition(element) {
                register_macro(definition, env)?;
                definitions.push(index);
            }
        }
        for index in definitions.into_iter().rev() {
            elements.remove(index);
        }
    } else if let Some(definition) = macro_definition(program) {
        register_macro(definition, env)?;
        *program = Expression::Array(Vec::new());
    }
    Ok(())
}

pub(crate) fn is_macro_definition(expr: &Expression) -> bool {
    macro_definition(expr).is_some()
}

/// The value of a `{"defmacro": ..}` object
fn macro_definition(expr: &Expression) -> Option<&Expression> {
    match expr {
        Expression::KeyValueObject(pairs) => match pairs.as_slice() {
            [KeyValuePair { key, value }] if key == DEFMACRO_KEY => Some(value),
            _ => None,
        },
        _ => None,
    }
}

fn register_macro(definition: &Expression, env: &Environment) -> Result<(), Error> {
    let fields = Fields::of(DEFMACRO_KEY, definition).map_err(macro_error)?;
    let name = match fields.required("name").map_err(macro_error)? {
        Expression::StringLiteral(name) if !name.is_empty() => name,
        other => {
            return Err(Error::MacroError(format!(
                "macro name must be a non-empty string, got {other}"
            )));
        }
    };
    let key = |expr: &Expression| {
        expr.as_str().map(str::to_owned).ok_or_else(|| {
            Error::MacroError(format!("macro keys must be strings, got {expr}"))
        })
    };
    let keys = match fields.optional("keys") {
        None => Vec::new(),
        Some(Expression::Array(items)) => {
            items.iter().map(key).collect::<Result<Vec<_>, _>>()?
        }
        Some(single) => vec![key(single)?],
    };
    let body = fields.required("body").map_err(macro_error)?;

    debug!("registered macro '{name}' with keys {keys:?}");
    env.define(
        name,
        Object::Macro {
            keys,
            body: Rc::new(body.clone()),
            env: env.clone(),
        },
    );
    Ok(())
}

fn macro_error(err: Error) -> Error {
    Error::MacroError(err.to_string())
}

/// Rewrite every macro invocation in `program`, innermost first.
pub fn expand_macros(program: Expression, env: &Environment) -> Expression {
    modify(program, &mut |node| match expand_call(&node, env) {
        Some(expansion) => expansion,
        None => node,
    })
}

fn expand_call(node: &Expression, env: &Environment) -> Option<Expression> {
    let Expression::KeyValueObject(pairs) = node else {
        return None;
    };
    let (call, keys, body, macro_env) = pairs.iter().find_map(|pair| match env.get(&pair.key) {
        Some(Object::Macro { keys, body, env }) => Some((pair, keys, body, env)),
        _ => None,
    })?;

    let scope = Environment::new_enclosed(&macro_env);
    for key in &keys {
        let Some(argument) = call.value.get(key) else {
            debug!("macro '{}' call lacks key '{key}'; left unexpanded", call.key);
            return None;
        };
        scope.define(key, Object::Quote(argument.clone()));
    }

    match eval(&body, &scope) {
        Ok(Object::Quote(expansion)) => {
            debug!("expanded macro '{}' to {expansion}", call.key);
            Some(expansion)
        }
        other => {
            debug!(
                "macro '{}' did not produce a quote ({other:?}); left unexpanded",
                call.key
            );
            None
        }
    }
}
