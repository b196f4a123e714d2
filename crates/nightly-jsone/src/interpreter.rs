//! Expression evaluation.

use serde_json::{Map, Value};

use crate::builtins;
use crate::context::{Binding, Context};
use crate::error::{RenderError, Result};
use crate::parser::{self, BinaryOp, Expr, UnaryOp};
use crate::value::{as_number, is_truthy, number_value, type_name};

/// Parse and evaluate `source` against `context`.
pub fn evaluate_str(source: &str, context: &Context<'_>) -> Result<Value> {
    let expr = parser::parse(source)?;
    evaluate(&expr, context)
}

pub fn evaluate(expr: &Expr, context: &Context<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => lookup(name, context),
        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Expr::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), evaluate(value, context)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Unary(op, operand) => unary(*op, evaluate(operand, context)?),
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let left = is_truthy(&evaluate(lhs, context)?);
            Ok(Value::Bool(left || is_truthy(&evaluate(rhs, context)?)))
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let left = is_truthy(&evaluate(lhs, context)?);
            Ok(Value::Bool(left && is_truthy(&evaluate(rhs, context)?)))
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = evaluate(lhs, context)?;
            let right = evaluate(rhs, context)?;
            binary(*op, left, right)
        }
        Expr::Property(target, name) => match evaluate(target, context)? {
            Value::Object(mut map) => map.remove(name).ok_or_else(|| {
                RenderError::interpreter(format!("object has no property '{name}'"))
            }),
            other => Err(RenderError::interpreter(format!(
                "cannot access property '{name}' of {}",
                type_name(&other)
            ))),
        },
        Expr::Index(target, index) => {
            let target = evaluate(target, context)?;
            let index = evaluate(index, context)?;
            index_value(target, &index)
        }
        Expr::Slice(target, start, end) => {
            let target = evaluate(target, context)?;
            let start = start
                .as_ref()
                .map(|e| evaluate(e, context))
                .transpose()?;
            let end = end.as_ref().map(|e| evaluate(e, context)).transpose()?;
            slice_value(target, start.as_ref(), end.as_ref())
        }
        Expr::Call(callee, args) => call(callee, args, context),
    }
}

fn lookup(name: &str, context: &Context<'_>) -> Result<Value> {
    match context.resolve(name) {
        Some(Binding::Value(value)) => Ok(value.clone()),
        Some(Binding::Helper(_)) => Err(RenderError::interpreter(format!(
            "'{name}' is a function and must be called"
        ))),
        None if builtins::is_builtin(name) => Err(RenderError::interpreter(format!(
            "'{name}' is a function and must be called"
        ))),
        None => Err(RenderError::interpreter(format!(
            "unknown context value '{name}'"
        ))),
    }
}

fn call(callee: &Expr, args: &[Expr], context: &Context<'_>) -> Result<Value> {
    let Expr::Ident(name) = callee else {
        return Err(RenderError::interpreter(
            "only named functions can be called",
        ));
    };

    let values = args
        .iter()
        .map(|arg| evaluate(arg, context))
        .collect::<Result<Vec<_>>>()?;

    match context.resolve(name) {
        Some(Binding::Helper(helper)) => helper.call(&values),
        Some(Binding::Value(value)) => Err(RenderError::interpreter(format!(
            "'{name}' is a {} and cannot be called",
            type_name(value)
        ))),
        None if name == "defined" => {
            let [Value::String(target)] = values.as_slice() else {
                return Err(RenderError::interpreter(
                    "defined() expects a single string argument",
                ));
            };
            Ok(Value::Bool(context.resolve(target).is_some()))
        }
        None => builtins::call(name, &values, context),
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!is_truthy(&operand))),
        UnaryOp::Neg | UnaryOp::Plus => {
            let n = as_number(&operand).ok_or_else(|| {
                RenderError::interpreter(format!(
                    "unary operator expects a number, got {}",
                    type_name(&operand)
                ))
            })?;
            number_value(if op == UnaryOp::Neg { -n } else { n })
        }
    }
}

/// Structural equality that treats `1` and `1.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map(|w| values_equal(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn numbers(op: BinaryOp, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(RenderError::interpreter(format!(
            "{op:?} expects numbers, got {} and {}",
            type_name(left),
            type_name(right)
        ))),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (&left, &right) {
                (Value::String(l), Value::String(r)) => l.cmp(r),
                _ => {
                    let (l, r) = numbers(op, &left, &right)?;
                    l.partial_cmp(&r).ok_or_else(|| {
                        RenderError::interpreter("cannot compare non-finite numbers")
                    })?
                }
            };
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => match (left, right) {
            (Value::String(mut l), Value::String(r)) => {
                l.push_str(&r);
                Ok(Value::String(l))
            }
            (left, right) => {
                let (l, r) = numbers(op, &left, &right)?;
                number_value(l + r)
            }
        },
        BinaryOp::Sub => {
            let (l, r) = numbers(op, &left, &right)?;
            number_value(l - r)
        }
        BinaryOp::Mul => {
            let (l, r) = numbers(op, &left, &right)?;
            number_value(l * r)
        }
        BinaryOp::Div => {
            let (l, r) = numbers(op, &left, &right)?;
            if r == 0.0 {
                return Err(RenderError::interpreter("division by zero"));
            }
            number_value(l / r)
        }
        BinaryOp::Pow => {
            let (l, r) = numbers(op, &left, &right)?;
            number_value(l.powf(r))
        }
        BinaryOp::In => match (&left, &right) {
            (Value::String(needle), Value::String(haystack)) => {
                Ok(Value::Bool(haystack.contains(needle.as_str())))
            }
            (_, Value::Array(items)) => {
                Ok(Value::Bool(items.iter().any(|i| values_equal(i, &left))))
            }
            (Value::String(key), Value::Object(map)) => Ok(Value::Bool(map.contains_key(key))),
            _ => Err(RenderError::interpreter(format!(
                "'in' cannot test {} against {}",
                type_name(&left),
                type_name(&right)
            ))),
        },
        BinaryOp::Or | BinaryOp::And => unreachable!("logical operators short-circuit"),
    }
}

fn integer_index(value: &Value, what: &str) -> Result<i64> {
    match as_number(value) {
        Some(n) if n.fract() == 0.0 => Ok(n as i64),
        _ => Err(RenderError::interpreter(format!(
            "{what} must be an integer, got {value}"
        ))),
    }
}

/// Resolve a possibly negative index against a length.
fn resolve_position(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let position = if index < 0 { len + index } else { index };
    (0..len).contains(&position).then_some(position as usize)
}

fn index_value(target: Value, index: &Value) -> Result<Value> {
    match target {
        Value::Array(mut items) => {
            let i = integer_index(index, "array index")?;
            let position = resolve_position(i, items.len()).ok_or_else(|| {
                RenderError::interpreter(format!("array index {i} out of bounds"))
            })?;
            Ok(items.swap_remove(position))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = integer_index(index, "string index")?;
            let position = resolve_position(i, chars.len()).ok_or_else(|| {
                RenderError::interpreter(format!("string index {i} out of bounds"))
            })?;
            Ok(Value::String(chars[position].to_string()))
        }
        Value::Object(mut map) => match index {
            Value::String(key) => Ok(map.remove(key).unwrap_or(Value::Null)),
            other => Err(RenderError::interpreter(format!(
                "object keys must be strings, got {}",
                type_name(other)
            ))),
        },
        other => Err(RenderError::interpreter(format!(
            "cannot index {}",
            type_name(&other)
        ))),
    }
}

/// Clamp slice bounds the way Python does.
fn slice_bounds(start: Option<&Value>, end: Option<&Value>, len: usize) -> Result<(usize, usize)> {
    let clamp = |value: Option<&Value>, default: usize| -> Result<usize> {
        let Some(value) = value else {
            return Ok(default);
        };
        let i = integer_index(value, "slice bound")?;
        let len = len as i64;
        let position = if i < 0 { (len + i).max(0) } else { i.min(len) };
        Ok(position as usize)
    };
    let start = clamp(start, 0)?;
    let end = clamp(end, len)?;
    Ok((start, end.max(start)))
}

fn slice_value(target: Value, start: Option<&Value>, end: Option<&Value>) -> Result<Value> {
    match target {
        Value::Array(items) => {
            let (s, e) = slice_bounds(start, end, items.len())?;
            Ok(Value::Array(items[s..e].to_vec()))
        }
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let (s, e) = slice_bounds(start, end, chars.len())?;
            Ok(Value::String(chars[s..e].iter().collect()))
        }
        other => Err(RenderError::interpreter(format!(
            "cannot slice {}",
            type_name(&other)
        ))),
    }
}
