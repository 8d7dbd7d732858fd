//! The variable context driving template rendering.
//!
//! A context is an ordered mapping from variable name to [`Value`]. Values
//! are a small tagged variant type: scalars render as text, lists at the
//! context root act as choice lists until prompting collapses them, and
//! nested maps merge recursively. Two reserved keys exist:
//! `_copy_without_render` (glob patterns bypassing rendering) and
//! `templates` (nested-template table). Leading-underscore keys are
//! private: never prompted, but still visible to substitution.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reserved key holding copy-only glob patterns.
pub const COPY_WITHOUT_RENDER_KEY: &str = "_copy_without_render";

/// Reserved key holding the nested-template table.
pub const NESTED_TEMPLATES_KEY: &str = "templates";

/// Ordered variable context, as declared by a `kiln.json` descriptor.
pub type Context = IndexMap<String, Value>;

/// A single context value. Discriminated explicitly rather than through
/// structural probing of a generic JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Text form of a scalar, as presented in prompts and stored after
    /// top-level overrides.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Applies `overwrites` onto `context` in place.
///
/// The merge is confluent and never deletes: nested maps are merged
/// recursively, list values are appended onto any existing list, and
/// scalar overrides replace the previous value. Top-level scalar
/// overrides are coerced to text; values inside nested maps keep their
/// original type.
pub fn apply_overwrites(context: &mut Context, overwrites: &Context) {
    apply_overwrites_inner(context, overwrites, false)
}

fn apply_overwrites_inner(
    context: &mut IndexMap<String, Value>,
    overwrites: &IndexMap<String, Value>,
    in_nested_map: bool,
) {
    for (key, value) in overwrites {
        match value {
            Value::Map(nested) => {
                let entry = context
                    .entry(key.clone())
                    .or_insert_with(|| Value::Map(IndexMap::new()));
                if !matches!(entry, Value::Map(_)) {
                    *entry = Value::Map(IndexMap::new());
                }
                if let Value::Map(existing) = entry {
                    apply_overwrites_inner(existing, nested, true);
                }
            }
            Value::List(items) => {
                let entry = context
                    .entry(key.clone())
                    .or_insert_with(|| Value::List(Vec::new()));
                if !matches!(entry, Value::List(_)) {
                    *entry = Value::List(Vec::new());
                }
                if let Value::List(existing) = entry {
                    existing.extend(items.iter().cloned());
                }
            }
            scalar => {
                let stored = if in_nested_map {
                    scalar.clone()
                } else {
                    Value::String(scalar.to_text())
                };
                context.insert(key.clone(), stored);
            }
        }
    }
}

/// Builds the context for a generation attempt.
///
/// Parses the descriptor as an ordered document, then layers
/// `default_context` (user configuration) and `extra_context` (caller
/// overrides) on top via [`apply_overwrites`] — extra wins over default,
/// both win over the template's declared values.
pub fn load_context<P: AsRef<Path>>(
    context_file: P,
    default_context: Option<&Context>,
    extra_context: Option<&Context>,
) -> Result<Context> {
    let context_file = context_file.as_ref();
    log::debug!("Loading context from '{}'", context_file.display());

    let raw = std::fs::read_to_string(context_file).map_err(Error::IoError)?;
    let mut context: Context =
        serde_json::from_str(&raw).map_err(|e| Error::ContextDecoding {
            context_file: context_file.display().to_string(),
            source: e,
        })?;

    if let Some(defaults) = default_context {
        apply_overwrites(&mut context, defaults);
    }
    if let Some(extra) = extra_context {
        apply_overwrites(&mut context, extra);
    }

    log::debug!("Context generated is {context:?}");
    Ok(context)
}

/// The glob patterns declared under `_copy_without_render`, if any.
pub fn copy_without_render_patterns(context: &Context) -> Vec<String> {
    context
        .get(COPY_WITHOUT_RENDER_KEY)
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_scalar_override_coerced_to_text() {
        let mut base = ctx(&[("port", Value::Int(8000))]);
        let overrides = ctx(&[("port", Value::Int(9000))]);
        apply_overwrites(&mut base, &overrides);
        assert_eq!(base["port"], Value::String("9000".to_string()));
    }

    #[test]
    fn test_nested_scalar_kept_as_is() {
        let mut base = ctx(&[(
            "db",
            Value::Map(ctx(&[("port", Value::Int(5432))])),
        )]);
        let overrides = ctx(&[(
            "db",
            Value::Map(ctx(&[("port", Value::Int(5433))])),
        )]);
        apply_overwrites(&mut base, &overrides);
        let db = base["db"].as_map().unwrap();
        assert_eq!(db["port"], Value::Int(5433));
    }

    #[test]
    fn test_list_override_appends() {
        let mut base = ctx(&[(
            "features",
            Value::List(vec!["a".into(), "b".into()]),
        )]);
        let overrides = ctx(&[("features", Value::List(vec!["c".into()]))]);
        apply_overwrites(&mut base, &overrides);
        let features = base["features"].as_list().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[2], Value::String("c".to_string()));
    }

    #[test]
    fn test_merge_never_deletes() {
        let mut base = ctx(&[
            ("kept", Value::String("yes".to_string())),
            ("replaced", Value::String("old".to_string())),
        ]);
        let overrides = ctx(&[("replaced", Value::String("new".to_string()))]);
        apply_overwrites(&mut base, &overrides);
        assert!(base.contains_key("kept"));
        assert_eq!(base["replaced"], Value::String("new".to_string()));
    }

    #[test]
    fn test_order_preserved() {
        let raw = r#"{"z": "1", "a": "2", "m": "3"}"#;
        let parsed: Context = serde_json::from_str(raw).unwrap();
        let keys: Vec<&String> = parsed.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
