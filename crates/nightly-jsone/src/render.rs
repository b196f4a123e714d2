//! Template rendering: interpolation and `$`-operators.
//!
//! Rendering a node yields `Option<Value>`; `None` means the node deleted
//! itself (for example an `$if` without a matching branch) and is dropped
//! from the enclosing array or object.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::context::Context;
use crate::error::{RenderError, Result};
use crate::fromnow;
use crate::interpreter::{evaluate, evaluate_str};
use crate::parser;
use crate::value::{is_truthy, to_display_string, type_name};

const OPERATORS: &[&str] = &[
    "$eval",
    "$flatten",
    "$flattenDeep",
    "$fromNow",
    "$if",
    "$json",
    "$let",
    "$map",
    "$match",
    "$merge",
    "$mergeDeep",
    "$reverse",
    "$sort",
    "$switch",
];

/// Render `template` against `context`. A template that deletes itself
/// renders to `null`.
pub fn render(template: &Value, context: &Context<'_>) -> Result<Value> {
    Ok(render_value(template, context)?.unwrap_or(Value::Null))
}

fn render_value(template: &Value, context: &Context<'_>) -> Result<Option<Value>> {
    match template {
        Value::String(s) => Ok(Some(Value::String(interpolate(s, context)?))),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(value) = render_value(item, context)? {
                    out.push(value);
                }
            }
            Ok(Some(Value::Array(out)))
        }
        Value::Object(map) => render_object(map, context),
        other => Ok(Some(other.clone())),
    }
}

/// Replace each `${expr}` in `source`; `$${` produces a literal `${`.
pub fn interpolate(source: &str, context: &Context<'_>) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(idx) = rest.find("${") {
        if rest[..idx].ends_with('$') {
            out.push_str(&rest[..idx - 1]);
            out.push_str("${");
            rest = &rest[idx + 2..];
            continue;
        }

        out.push_str(&rest[..idx]);
        let body = &rest[idx + 2..];
        let (expr, consumed) = parser::parse_placeholder(body)?;
        let value = evaluate(&expr, context)?;
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(RenderError::template(format!(
                "interpolation of '{}' produced an {}",
                &body[..consumed - 1],
                type_name(&value)
            )));
        }
        out.push_str(&to_display_string(&value)?);
        rest = &body[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

fn render_object(map: &Map<String, Value>, context: &Context<'_>) -> Result<Option<Value>> {
    let operators: Vec<&str> = map
        .keys()
        .filter(|k| k.starts_with('$') && !k.starts_with("$$"))
        .map(String::as_str)
        .collect();

    match operators.as_slice() {
        [] => {}
        [op] => {
            trace!(operator = %op, "Applying operator");
            return apply_operator(op, map, context);
        }
        many => {
            return Err(RenderError::template(format!(
                "only one operator allowed per object, found {}",
                many.join(", ")
            )))
        }
    }

    let mut out = Map::new();
    for (key, value) in map {
        let key = match key.strip_prefix("$$") {
            Some(escaped) => format!("${escaped}"),
            None => interpolate(key, context)?,
        };
        if let Some(rendered) = render_value(value, context)? {
            out.insert(key, rendered);
        }
    }
    Ok(Some(Value::Object(out)))
}

/// Reject keys an operator does not understand.
fn check_keys(op: &str, map: &Map<String, Value>, allowed: &[&str]) -> Result<()> {
    for key in map.keys() {
        if key != op && !allowed.contains(&key.as_str()) {
            return Err(RenderError::template(format!(
                "{op} has undefined property '{key}'"
            )));
        }
    }
    Ok(())
}

fn expression_string<'v>(op: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| RenderError::template(format!("{op} expects an expression string")))
}

fn rendered_array(op: &str, value: &Value, context: &Context<'_>) -> Result<Vec<Value>> {
    match render_value(value, context)? {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(RenderError::template(format!(
            "{op} expects an array, got {}",
            type_name(&other)
        ))),
        None => Err(RenderError::template(format!("{op} value was deleted"))),
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier pattern is valid"))
}

/// Parse a binding key such as `each(x)` or `each(x, i)`.
fn binding_key<'k>(map: &'k Map<String, Value>, prefix: &str) -> Option<(&'k str, Vec<String>)> {
    map.keys().find_map(|key| {
        let inner = key.strip_prefix(prefix)?.strip_prefix('(')?.strip_suffix(')')?;
        let names: Vec<String> = inner.split(',').map(|n| n.trim().to_string()).collect();
        names
            .iter()
            .all(|n| identifier_pattern().is_match(n))
            .then_some((key.as_str(), names))
    })
}

fn apply_operator(op: &str, map: &Map<String, Value>, context: &Context<'_>) -> Result<Option<Value>> {
    if !OPERATORS.contains(&op) {
        return Err(RenderError::template(format!("unknown operator {op}")));
    }
    let value = &map[op];

    match op {
        "$eval" => {
            check_keys(op, map, &[])?;
            evaluate_str(expression_string(op, value)?, context).map(Some)
        }
        "$if" => {
            check_keys(op, map, &["then", "else"])?;
            let condition = evaluate_str(expression_string(op, value)?, context)?;
            let branch = if is_truthy(&condition) { "then" } else { "else" };
            match map.get(branch) {
                Some(template) => render_value(template, context),
                None => Ok(None),
            }
        }
        "$json" => {
            check_keys(op, map, &[])?;
            let rendered = render(value, context)?;
            let text = serde_json::to_string(&rendered)
                .map_err(|e| RenderError::template(format!("$json: {e}")))?;
            Ok(Some(Value::String(text)))
        }
        "$let" => {
            check_keys(op, map, &["in"])?;
            let Some(body) = map.get("in") else {
                return Err(RenderError::template("$let requires an 'in' clause"));
            };
            let bindings = match render_value(value, context)? {
                Some(Value::Object(bindings)) => bindings,
                _ => {
                    return Err(RenderError::template(
                        "$let value must evaluate to an object",
                    ))
                }
            };
            if let Some(bad) = bindings.keys().find(|k| !identifier_pattern().is_match(k)) {
                return Err(RenderError::template(format!(
                    "$let binding '{bad}' is not a valid identifier"
                )));
            }
            let scope = context.child(bindings);
            render_value(body, &scope)
        }
        "$flatten" => {
            check_keys(op, map, &[])?;
            let mut out = Vec::new();
            for item in rendered_array(op, value, context)? {
                match item {
                    Value::Array(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            Ok(Some(Value::Array(out)))
        }
        "$flattenDeep" => {
            check_keys(op, map, &[])?;
            fn flatten_into(value: Value, out: &mut Vec<Value>) {
                match value {
                    Value::Array(items) => items.into_iter().for_each(|i| flatten_into(i, out)),
                    other => out.push(other),
                }
            }
            let mut out = Vec::new();
            for item in rendered_array(op, value, context)? {
                flatten_into(item, &mut out);
            }
            Ok(Some(Value::Array(out)))
        }
        "$fromNow" => {
            check_keys(op, map, &["from"])?;
            let offset = match render(value, context)? {
                Value::String(s) => s,
                other => {
                    return Err(RenderError::template(format!(
                        "$fromNow expects a string, got {}",
                        type_name(&other)
                    )))
                }
            };
            let reference = match map.get("from") {
                Some(from) => match render(from, context)? {
                    Value::String(s) => Some(s),
                    _ => return Err(RenderError::template("$fromNow 'from' must be a string")),
                },
                None => context.lookup("now").and_then(Value::as_str).map(str::to_string),
            };
            fromnow::from_now(&offset, reference.as_deref())
                .map(|t| Some(Value::String(t)))
        }
        "$map" => map_operator(map, value, context),
        "$match" => {
            check_keys(op, map, &[])?;
            let Value::Object(cases) = value else {
                return Err(RenderError::template("$match expects an object"));
            };
            let mut out = Vec::new();
            for (condition, template) in cases {
                if is_truthy(&evaluate_str(condition, context)?) {
                    if let Some(rendered) = render_value(template, context)? {
                        out.push(rendered);
                    }
                }
            }
            Ok(Some(Value::Array(out)))
        }
        "$switch" => {
            check_keys(op, map, &[])?;
            let Value::Object(cases) = value else {
                return Err(RenderError::template("$switch expects an object"));
            };
            let mut matched = Vec::new();
            for (condition, template) in cases {
                if condition == "$default" {
                    continue;
                }
                if is_truthy(&evaluate_str(condition, context)?) {
                    matched.push(template);
                }
            }
            match matched.as_slice() {
                [] => match cases.get("$default") {
                    Some(template) => render_value(template, context),
                    None => Ok(None),
                },
                [template] => render_value(template, context),
                _ => Err(RenderError::template(
                    "$switch can only have one truthy condition",
                )),
            }
        }
        "$merge" => {
            check_keys(op, map, &[])?;
            let mut out = Map::new();
            for item in rendered_array(op, value, context)? {
                match item {
                    Value::Object(obj) => out.extend(obj),
                    other => {
                        return Err(RenderError::template(format!(
                            "$merge expects an array of objects, found {}",
                            type_name(&other)
                        )))
                    }
                }
            }
            Ok(Some(Value::Object(out)))
        }
        "$mergeDeep" => {
            check_keys(op, map, &[])?;
            let mut out = Value::Object(Map::new());
            for item in rendered_array(op, value, context)? {
                if !item.is_object() {
                    return Err(RenderError::template(format!(
                        "$mergeDeep expects an array of objects, found {}",
                        type_name(&item)
                    )));
                }
                out = merge_deep(out, item);
            }
            Ok(Some(out))
        }
        "$reverse" => {
            check_keys(op, map, &[])?;
            let mut items = rendered_array(op, value, context)?;
            items.reverse();
            Ok(Some(Value::Array(items)))
        }
        "$sort" => sort_operator(map, value, context),
        _ => unreachable!("operator list and dispatch out of sync"),
    }
}

fn merge_deep(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Object(mut l), Value::Object(r)) => {
            for (key, value) in r {
                let merged = match l.remove(&key) {
                    Some(existing) => merge_deep(existing, value),
                    None => value,
                };
                l.insert(key, merged);
            }
            Value::Object(l)
        }
        (Value::Array(mut l), Value::Array(r)) => {
            l.extend(r);
            Value::Array(l)
        }
        (_, right) => right,
    }
}

fn map_operator(map: &Map<String, Value>, value: &Value, context: &Context<'_>) -> Result<Option<Value>> {
    let Some((each_key, names)) = binding_key(map, "each") else {
        return Err(RenderError::template("$map requires an each(identifier) clause"));
    };
    check_keys("$map", map, &[each_key])?;
    if names.len() > 2 {
        return Err(RenderError::template("each() takes at most two identifiers"));
    }
    let body = &map[each_key];

    match render_value(value, context)? {
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let mut bindings = Map::new();
                bindings.insert(names[0].clone(), item);
                if let Some(index_name) = names.get(1) {
                    bindings.insert(index_name.clone(), Value::from(i));
                }
                let scope = context.child(bindings);
                if let Some(rendered) = render_value(body, &scope)? {
                    out.push(rendered);
                }
            }
            Ok(Some(Value::Array(out)))
        }
        Some(Value::Object(entries)) => {
            let mut out = Map::new();
            for (key, val) in entries {
                let mut bindings = Map::new();
                match names.get(1) {
                    Some(key_name) => {
                        bindings.insert(names[0].clone(), val);
                        bindings.insert(key_name.clone(), Value::String(key));
                    }
                    None => {
                        let mut pair = Map::new();
                        pair.insert("key".into(), Value::String(key));
                        pair.insert("val".into(), val);
                        bindings.insert(names[0].clone(), Value::Object(pair));
                    }
                }
                let scope = context.child(bindings);
                match render_value(body, &scope)? {
                    Some(Value::Object(rendered)) => out.extend(rendered),
                    None => {}
                    Some(other) => {
                        return Err(RenderError::template(format!(
                            "$map on objects must produce objects, got {}",
                            type_name(&other)
                        )))
                    }
                }
            }
            Ok(Some(Value::Object(out)))
        }
        _ => Err(RenderError::template("$map value must be an array or object")),
    }
}

fn sort_operator(map: &Map<String, Value>, value: &Value, context: &Context<'_>) -> Result<Option<Value>> {
    let by = binding_key(map, "by");
    match &by {
        Some((key, names)) => {
            check_keys("$sort", map, &[*key])?;
            if names.len() != 1 {
                return Err(RenderError::template("by() takes exactly one identifier"));
            }
        }
        None => check_keys("$sort", map, &[])?,
    }

    let items = rendered_array("$sort", value, context)?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let sort_key = match &by {
            Some((key, names)) => {
                let expr = map[*key].as_str().ok_or_else(|| {
                    RenderError::template("$sort by() expects an expression string")
                })?;
                let mut bindings = Map::new();
                bindings.insert(names[0].clone(), item.clone());
                evaluate_str(expr, &context.child(bindings))?
            }
            None => item.clone(),
        };
        keyed.push((sort_key, item));
    }

    let all_numbers = keyed.iter().all(|(k, _)| k.is_number());
    let all_strings = keyed.iter().all(|(k, _)| k.is_string());
    if all_numbers {
        keyed.sort_by(|(a, _), (b, _)| {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.total_cmp(&b)
        });
    } else if all_strings {
        keyed.sort_by(|(a, _), (b, _)| a.as_str().cmp(&b.as_str()));
    } else {
        return Err(RenderError::template(
            "$sort requires all sort keys to be numbers or all to be strings",
        ));
    }

    Ok(Some(Value::Array(keyed.into_iter().map(|(_, item)| item).collect())))
}
