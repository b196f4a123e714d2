//! Nightly-JSONe: logic-less JSON-e rendering
//!
//! Evaluates a JSON-e template (typically `.taskcluster.yml`) against a
//! context of plain data plus caller-supplied helper functions. The renderer
//! only substitutes, conditionally includes and calls the helpers it is
//! given; it has no other side effects.
//!
//! ```
//! use nightly_jsone::{render, Context};
//! use serde_json::json;
//!
//! let ctx = Context::from_value(json!({"tasks_for": "cron"})).unwrap();
//! let out = render(&json!({"$if": "tasks_for == 'cron'", "then": "nightly"}), &ctx).unwrap();
//! assert_eq!(out, json!("nightly"));
//! ```

pub mod builtins;
pub mod context;
pub mod error;
pub mod fromnow;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod value;

pub use context::{Binding, Context, Helper};
pub use error::{RenderError, Result};
pub use fromnow::format_timestamp;
pub use interpreter::evaluate_str;
pub use render::render;
