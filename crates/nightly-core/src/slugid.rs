//! Taskcluster slug identifiers.
//!
//! A slugid is a v4 UUID encoded as 22 characters of URL-safe base64
//! without padding. "Nice" slugids clear the top bit of the first byte so
//! the identifier never starts with `-`, which keeps it safe on command lines.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nightly_jsone::Helper;
use serde_json::Value;
use uuid::Uuid;

/// Generate a fresh "nice" slugid.
pub fn nice() -> String {
    let mut bytes = *Uuid::new_v4().as_bytes();
    bytes[0] &= 0x7f;
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Memoizing name-to-slugid map for one render.
///
/// The same name always yields the same identifier, and different names
/// always yield different identifiers. A resolver must not outlive the
/// render it was created for.
#[derive(Debug, Default)]
pub struct SlugIdResolver {
    issued: RefCell<HashMap<String, String>>,
}

impl SlugIdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for `name`, minted on first use.
    pub fn resolve(&self, name: &str) -> String {
        let mut issued = self.issued.borrow_mut();
        if let Some(existing) = issued.get(name) {
            return existing.clone();
        }

        let taken: HashSet<&String> = issued.values().collect();
        let mut slug = nice();
        while taken.contains(&slug) {
            slug = nice();
        }
        issued.insert(name.to_string(), slug.clone());
        slug
    }

    /// Snapshot of every identifier issued so far, ordered by name.
    pub fn issued(&self) -> BTreeMap<String, String> {
        self.issued
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Helper for SlugIdResolver {
    fn call(&self, args: &[Value]) -> nightly_jsone::Result<Value> {
        match args {
            [Value::String(name)] => Ok(Value::String(self.resolve(name))),
            _ => Err(nightly_jsone::RenderError::Interpreter(
                "as_slugid expects a single string argument".to_string(),
            )),
        }
    }
}
