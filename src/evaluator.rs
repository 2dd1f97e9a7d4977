//! Tree-walking evaluator.
//!
//! Evaluation is a direct recursion over [`Expression`]. Non-local control
//! flow uses the `Err` side of [`EvalResult`]:
//!
//! - [`Signal::Break`] / [`Signal::Continue`] are consumed by the nearest loop
//! - [`Signal::Return`] is consumed by the nearest function application
//! - [`Signal::Error`] is never consumed; arrays turn it into a one-element
//!   array holding the error, everything else forwards it with `?`
//!
//! Special forms are key/value objects with exactly one key:
//!
//! | key | fields |
//! |---|---|
//! | `command` | `symbol`, `args?` |
//! | `if` | `cond`, `conseq`, `alt?` |
//! | `set` | `var`, `val` |
//! | `loop` | `for`, `do`, and either `from` + `until` or `in` |
//! | `lambda` | `params?`, `body` |
//! | `return` | the value expression itself |
//! | `break`, `continue` | ignored |

mod environment;

pub use environment::Environment;

use log::trace;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Expression, IntegerType, KeyValuePair, is_symbol};
use crate::builtinops::find_builtin;
use crate::object::Object;
use crate::quote::quote;
use crate::template::{Segment, has_placeholders, parse_template};

/// Non-local exits travelling up through evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Break,
    Continue,
    Return(Object),
    Error(Error),
}

impl From<Error> for Signal {
    fn from(err: Error) -> Self {
        Signal::Error(err)
    }
}

pub type EvalResult = Result<Object, Signal>;

/// Named fields of a special form, e.g. the `{"cond": .., "conseq": ..}` of `if`
pub(crate) struct Fields<'a> {
    form: &'static str,
    pairs: &'a [KeyValuePair],
}

impl<'a> Fields<'a> {
    pub(crate) fn of(form: &'static str, value: &'a Expression) -> Result<Self, Error> {
        match value {
            Expression::KeyValueObject(pairs) => Ok(Fields { form, pairs }),
            other => Err(Error::EvalError(format!(
                "{form} expects an object, got {other}"
            ))),
        }
    }

    pub(crate) fn optional(&self, key: &str) -> Option<&'a Expression> {
        self.pairs
            .iter()
            .find(|pair| pair.key == key)
            .map(|pair| &pair.value)
    }

    pub(crate) fn required(&self, key: &str) -> Result<&'a Expression, Error> {
        self.optional(key)
            .ok_or_else(|| Error::EvalError(format!("{key} key not found in {}", self.form)))
    }

    /// A required field holding a `$symbol`
    pub(crate) fn symbol(&self, key: &str) -> Result<&'a str, Error> {
        let expr = self.required(key)?;
        expr.as_symbol().ok_or_else(|| {
            Error::TypeError(format!(
                "{key} in {} must be a $symbol, got {expr}",
                self.form
            ))
        })
    }
}

/// Evaluate an expression in an environment.
pub fn eval(expr: &Expression, env: &Environment) -> EvalResult {
    match expr {
        Expression::IntegerLiteral(n) => Ok(Object::Integer(*n)),
        Expression::Boolean(b) => Ok(Object::Boolean(*b)),
        Expression::StringLiteral(text) => eval_string(text, env),
        Expression::PrefixAtom { operator, right } => {
            let right = eval(right, env)?;
            Ok(eval_prefix(operator, right)?)
        }
        Expression::Array(elements) => eval_array(elements, env),
        Expression::KeyValueObject(pairs) => eval_key_value_object(expr, pairs, env),
    }
}

fn eval_prefix(operator: &str, right: Object) -> Result<Object, Error> {
    match (operator, right) {
        ("-", Object::Integer(n)) => n
            .checked_neg()
            .map(Object::Integer)
            .ok_or_else(|| Error::EvalError("Integer overflow in negation".into())),
        ("!", Object::Boolean(b)) => Ok(Object::Boolean(!b)),
        ("-" | "!", other) => Err(Error::TypeError(format!(
            "unknown operator: {operator}{}",
            other.type_name()
        ))),
        (other, _) => Err(Error::EvalError(format!("unknown operator: {other}"))),
    }
}

/// Elements left to right; an error collapses the whole array to `[error]`
fn eval_array(elements: &[Expression], env: &Environment) -> EvalResult {
    let mut results = Vec::with_capacity(elements.len());
    for element in elements {
        match eval(element, env) {
            Ok(object) => results.push(object),
            Err(Signal::Error(err)) => return Ok(Object::Array(vec![Object::Error(err)])),
            Err(signal) => return Err(signal),
        }
    }
    Ok(Object::Array(results))
}

fn eval_string(text: &str, env: &Environment) -> EvalResult {
    if is_symbol(text) {
        return Ok(resolve_symbol(text, env)?);
    }

    let segments = parse_template(text);
    if !has_placeholders(&segments) {
        return Ok(Object::String(text.to_owned()));
    }

    let mut interpolated = String::with_capacity(text.len());
    for segment in segments {
        match segment {
            Segment::Text(literal) => interpolated.push_str(literal),
            Segment::Placeholder(name) => {
                let value = env
                    .get(name)
                    .ok_or_else(|| Error::UnboundVariable(name.to_owned()))?;
                interpolated.push_str(&value.to_string());
            }
        }
    }
    Ok(Object::String(interpolated))
}

/// Builtins first, then the environment chain.
pub fn resolve_symbol(name: &str, env: &Environment) -> Result<Object, Error> {
    if let Some(op) = find_builtin(name) {
        return Ok(Object::Builtin(op));
    }
    env.get(name)
        .ok_or_else(|| Error::UnboundVariable(name.to_owned()))
}

fn eval_key_value_object(
    expr: &Expression,
    pairs: &[KeyValuePair],
    env: &Environment,
) -> EvalResult {
    let [KeyValuePair { key, value }] = pairs else {
        return Err(Error::EvalError(format!(
            "object must carry exactly one key, got {}: {expr}",
            pairs.len()
        ))
        .into());
    };

    match key.as_str() {
        "command" => eval_command(value, env),
        "if" => eval_if(value, env),
        "set" => eval_set(value, env),
        "loop" => eval_loop(value, env),
        "lambda" => Ok(eval_lambda(value, env)?),
        "break" => Err(Signal::Break),
        "continue" => Err(Signal::Continue),
        "return" => Err(Signal::Return(eval(value, env)?)),
        "defmacro" => Err(Error::EvalError(
            "defmacro is only allowed at the top level of a program".into(),
        )
        .into()),
        other => Err(Error::EvalError(format!("unknown key for object: {other}")).into()),
    }
}

fn eval_command(value: &Expression, env: &Environment) -> EvalResult {
    let fields = Fields::of("command", value)?;
    let callee = match fields.required("symbol")? {
        Expression::StringLiteral(name) if name == "quote" => {
            return quote(fields.required("args")?, env);
        }
        Expression::StringLiteral(name) => resolve_symbol(name, env)?,
        other => eval(other, env)?,
    };
    let argument = match fields.optional("args") {
        Some(args) => eval(args, env)?,
        None => Object::Null,
    };
    apply_function(&callee, argument)
}

/// Apply a callable object to an evaluated argument.
///
/// A `return` inside a function body ends here.
pub fn apply_function(callee: &Object, argument: Object) -> EvalResult {
    match callee {
        Object::Builtin(op) => {
            trace!("calling builtin {} with {argument}", op.id);
            Ok(op.call(argument)?)
        }
        Object::Function { params, body, env } => {
            trace!("calling fn({}) with {argument}", params.join(", "));
            let scope = bind_arguments(params, env, argument)?;
            match eval(body, &scope) {
                Err(Signal::Return(value)) => Ok(value),
                other => other,
            }
        }
        other => Err(Error::TypeError(format!("not a function: {}", other.type_name())).into()),
    }
}

/// Arrays bind positionally, a scalar binds to a lone parameter, null to none.
fn bind_arguments(
    params: &[String],
    closure_env: &Environment,
    argument: Object,
) -> Result<Environment, Error> {
    let values = match argument {
        Object::Array(values) => values,
        Object::Null => Vec::new(),
        scalar @ (Object::Integer(_) | Object::Boolean(_)) => vec![scalar],
        other => {
            return Err(Error::TypeError(format!(
                "unhandled argument type: {}",
                other.type_name()
            )));
        }
    };
    if values.len() != params.len() {
        return Err(Error::arity_error(params.len(), values.len()));
    }

    let scope = Environment::new_enclosed(closure_env);
    for (param, value) in params.iter().zip(values) {
        scope.define(param, value);
    }
    Ok(scope)
}

fn eval_if(value: &Expression, env: &Environment) -> EvalResult {
    let fields = Fields::of("if", value)?;
    let condition = fields.required("cond")?;
    let consequence = fields.required("conseq")?;

    if eval(condition, env)?.is_truthy() {
        eval(consequence, env)
    } else {
        match fields.optional("alt") {
            Some(alternative) => eval(alternative, env),
            None => Ok(Object::Null),
        }
    }
}

fn eval_set(value: &Expression, env: &Environment) -> EvalResult {
    let fields = Fields::of("set", value)?;
    let name = fields.symbol("var")?;
    let value = eval(fields.required("val")?, env)?;
    Ok(env.set(name, value))
}

fn eval_loop(value: &Expression, env: &Environment) -> EvalResult {
    let fields = Fields::of("loop", value)?;
    let var = fields.symbol("for")?;
    let body = fields.required("do")?;

    match (
        fields.optional("from"),
        fields.optional("until"),
        fields.optional("in"),
    ) {
        (Some(from), Some(until), None) => {
            let from = loop_bound("from", eval(from, env)?)?;
            let until = loop_bound("until", eval(until, env)?)?;
            iterate(var, (from..until).map(|i| Ok(Object::Integer(i))), body, env)
        }
        // Inline elements are evaluated lazily, in the loop's outer scope
        (None, None, Some(Expression::Array(elements))) => {
            iterate(var, elements.iter().map(|element| eval(element, env)), body, env)
        }
        (None, None, Some(source)) => match eval(source, env)? {
            Object::Array(elements) => iterate(var, elements.into_iter().map(Ok), body, env),
            other => Err(Error::TypeError(format!(
                "loop in must be an ARRAY, got {}",
                other.type_name()
            ))
            .into()),
        },
        _ => Err(Error::EvalError("loop requires either from and until, or in".into()).into()),
    }
}

fn loop_bound(key: &str, bound: Object) -> Result<IntegerType, Error> {
    match bound {
        Object::Integer(n) => Ok(n),
        other => Err(Error::TypeError(format!(
            "loop {key} must be an INTEGER, got {}",
            other.type_name()
        ))),
    }
}

/// Shared driver for both loop forms.
///
/// One scope is created per loop and reused for every iteration. The result
/// is the value of the last iteration that completed normally.
fn iterate<I>(var: &str, items: I, body: &Expression, env: &Environment) -> EvalResult
where
    I: Iterator<Item = EvalResult>,
{
    let scope = Environment::new_enclosed(env);
    let mut result = Object::Null;
    for item in items {
        let item = item?;
        trace!("loop {var} = {item}");
        scope.define(var, item);
        match eval(body, &scope) {
            Ok(value) => result = value,
            Err(Signal::Break) => break,
            Err(Signal::Continue) => {}
            Err(signal) => return Err(signal),
        }
    }
    Ok(result)
}

fn eval_lambda(value: &Expression, env: &Environment) -> Result<Object, Error> {
    let fields = Fields::of("lambda", value)?;
    let parameter = |expr: &Expression| {
        expr.as_symbol().map(str::to_owned).ok_or_else(|| {
            Error::TypeError(format!("lambda parameter must be a $symbol, got {expr}"))
        })
    };
    let params = match fields.optional("params") {
        None => Vec::new(),
        Some(Expression::Array(items)) => {
            items.iter().map(parameter).collect::<Result<Vec<_>, _>>()?
        }
        Some(single) => vec![parameter(single)?],
    };
    for (i, param) in params.iter().enumerate() {
        if params[..i].contains(param) {
            return Err(Error::EvalError(format!("duplicate parameter name: {param}")));
        }
    }
    let body = fields.required("body")?;

    Ok(Object::Function {
        params,
        body: Rc::new(body.clone()),
        env: env.clone(),
    })
}
