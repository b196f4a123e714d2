//! Built-in functions available to every template.

use serde_json::Value;

use crate::context::Context;
use crate::error::{RenderError, Result};
use crate::fromnow;
use crate::value::{as_number, number_value, to_display_string, type_name};

pub const BUILTIN_NAMES: &[&str] = &[
    "abs", "ceil", "defined", "floor", "fromNow", "join", "len", "lowercase", "lstrip", "max",
    "min", "number", "rstrip", "split", "sqrt", "str", "strip", "typeof", "uppercase",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(RenderError::interpreter(format!(
            "{name}() expects {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn string_arg<'v>(name: &str, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| {
        RenderError::interpreter(format!(
            "{name}() expects a string, got {}",
            type_name(value)
        ))
    })
}

fn number_arg(name: &str, value: &Value) -> Result<f64> {
    as_number(value).ok_or_else(|| {
        RenderError::interpreter(format!(
            "{name}() expects a number, got {}",
            type_name(value)
        ))
    })
}

fn numeric(name: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value> {
    arity(name, args, 1)?;
    number_value(f(number_arg(name, &args[0])?))
}

fn extremum(name: &str, args: &[Value], pick: impl Fn(f64, f64) -> f64) -> Result<Value> {
    if args.is_empty() {
        return Err(RenderError::interpreter(format!(
            "{name}() needs at least one argument"
        )));
    }
    let mut best = number_arg(name, &args[0])?;
    for arg in &args[1..] {
        best = pick(best, number_arg(name, arg)?);
    }
    number_value(best)
}

/// Call the builtin `name`. `defined` is handled by the interpreter because
/// it inspects names rather than values.
pub fn call(name: &str, args: &[Value], context: &Context<'_>) -> Result<Value> {
    match name {
        "len" => {
            arity(name, args, 1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                other => {
                    return Err(RenderError::interpreter(format!(
                        "len() expects a string or array, got {}",
                        type_name(other)
                    )))
                }
            };
            Ok(Value::from(len))
        }
        "str" => {
            arity(name, args, 1)?;
            Ok(Value::String(to_display_string(&args[0])?))
        }
        "number" => {
            arity(name, args, 1)?;
            let text = string_arg(name, &args[0])?;
            let parsed: f64 = text.trim().parse().map_err(|_| {
                RenderError::interpreter(format!("number() cannot parse '{text}'"))
            })?;
            number_value(parsed)
        }
        "lowercase" => {
            arity(name, args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.to_lowercase()))
        }
        "uppercase" => {
            arity(name, args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.to_uppercase()))
        }
        "strip" => {
            arity(name, args, 1)?;
            Ok(Value::String(string_arg(name, &args[0])?.trim().to_string()))
        }
        "lstrip" => {
            arity(name, args, 1)?;
            Ok(Value::String(
                string_arg(name, &args[0])?.trim_start().to_string(),
            ))
        }
        "rstrip" => {
            arity(name, args, 1)?;
            Ok(Value::String(
                string_arg(name, &args[0])?.trim_end().to_string(),
            ))
        }
        "join" => {
            arity(name, args, 2)?;
            let Value::Array(items) = &args[0] else {
                return Err(RenderError::interpreter(format!(
                    "join() expects an array, got {}",
                    type_name(&args[0])
                )));
            };
            let separator = to_display_string(&args[1])?;
            let parts = items
                .iter()
                .map(to_display_string)
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::String(parts.join(&separator)))
        }
        "split" => {
            arity(name, args, 2)?;
            let text = string_arg(name, &args[0])?;
            let separator = to_display_string(&args[1])?;
            let parts: Vec<Value> = if separator.is_empty() {
                text.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                text.split(separator.as_str())
                    .map(|p| Value::String(p.to_string()))
                    .collect()
            };
            Ok(Value::Array(parts))
        }
        "min" => extremum(name, args, f64::min),
        "max" => extremum(name, args, f64::max),
        "abs" => numeric(name, args, f64::abs),
        "floor" => numeric(name, args, f64::floor),
        "ceil" => numeric(name, args, f64::ceil),
        "sqrt" => numeric(name, args, f64::sqrt),
        "typeof" => {
            arity(name, args, 1)?;
            Ok(Value::String(type_name(&args[0]).to_string()))
        }
        "fromNow" => {
            if args.is_empty() || args.len() > 2 {
                return Err(RenderError::interpreter(
                    "fromNow() expects an offset and an optional reference time",
                ));
            }
            let offset = string_arg(name, &args[0])?;
            let reference = match args.get(1) {
                Some(r) => Some(string_arg(name, r)?.to_string()),
                None => context
                    .lookup("now")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
            Ok(Value::String(fromnow::from_now(offset, reference.as_deref())?))
        }
        other => Err(RenderError::interpreter(format!(
            "unknown function {other}()"
        ))),
    }
}
