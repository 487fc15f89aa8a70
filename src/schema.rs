//! Schema engine: how individual config keys validate and merge.
//!
//! A [`Schema`] maps user key names to a [`PropertySchema`] — a
//! `{required, validate, merge}` strategy triple. The resolver folds the
//! entries matching a file through [`Schema::merge`] key by key; the
//! normalizer runs [`Schema::validate_entry`] on every flattened entry.
//!
//! Base handling for `name`, `files` and `ignores` is built in: they are
//! structural fields of the entry, they never propagate into a merged
//! result, and an extension cannot override them.
//!
//! Keys the schema does not mention follow the [`UnknownKeys`] policy —
//! `Allow` (the default) merges them with [`MergeStrategy::Replace`];
//! `Deny` turns them into validation errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::PerfigError;
use crate::types::ConfigEntry;

/// Keys handled by the built-in base strategies.
const RESERVED_KEYS: &[&str] = &["name", "files", "ignores"];

/// A custom validation function: `Err` carries the message (the key name is
/// added by the engine).
pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A custom merge function over `(base, overlay)`. Returning `None` drops
/// the key from the merged result.
pub type MergeFn = Arc<dyn Fn(Option<&Value>, Option<&Value>) -> Option<Value> + Send + Sync>;

/// How two values for the same key combine when entries are folded.
#[derive(Clone)]
pub enum MergeStrategy {
    /// The overlay value, even when absent (an absent overlay drops the key).
    Overwrite,
    /// The overlay value when present, otherwise the base value.
    Replace,
    /// Shallow object merge: overlay keys override base keys. Falls back to
    /// `Replace` when either side is not an object.
    Assign,
    Custom(MergeFn),
}

impl MergeStrategy {
    pub(crate) fn apply(&self, base: Option<&Value>, overlay: Option<&Value>) -> Option<Value> {
        match self {
            MergeStrategy::Overwrite => overlay.cloned(),
            MergeStrategy::Replace => overlay.or(base).cloned(),
            MergeStrategy::Assign => match (base, overlay) {
                (Some(Value::Object(base)), Some(Value::Object(overlay))) => {
                    let mut merged = base.clone();
                    for (key, value) in overlay {
                        merged.insert(key.clone(), value.clone());
                    }
                    Some(Value::Object(merged))
                }
                _ => overlay.or(base).cloned(),
            },
            MergeStrategy::Custom(f) => f(base, overlay),
        }
    }
}

/// What a value for a key must look like.
#[derive(Clone)]
pub enum ValidateStrategy {
    Any,
    String,
    Number,
    Boolean,
    Object,
    Array,
    Custom(ValidateFn),
}

impl ValidateStrategy {
    pub(crate) fn check(&self, value: &Value) -> Result<(), String> {
        let expected = match self {
            ValidateStrategy::Any => return Ok(()),
            ValidateStrategy::String if value.is_string() => return Ok(()),
            ValidateStrategy::Number if value.is_number() => return Ok(()),
            ValidateStrategy::Boolean if value.is_boolean() => return Ok(()),
            ValidateStrategy::Object if value.is_object() => return Ok(()),
            ValidateStrategy::Array if value.is_array() => return Ok(()),
            ValidateStrategy::Custom(f) => return f(value),
            ValidateStrategy::String => "a string",
            ValidateStrategy::Number => "a number",
            ValidateStrategy::Boolean => "a boolean",
            ValidateStrategy::Object => "an object",
            ValidateStrategy::Array => "an array",
        };
        Err(format!("Expected {expected}."))
    }
}

/// The strategy triple for one key.
#[derive(Clone)]
pub struct PropertySchema {
    pub required: bool,
    pub validate: ValidateStrategy,
    pub merge: MergeStrategy,
}

impl PropertySchema {
    pub fn new(validate: ValidateStrategy, merge: MergeStrategy) -> Self {
        PropertySchema {
            required: false,
            validate,
            merge,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Policy for keys the schema does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    /// Accept and merge with [`MergeStrategy::Replace`].
    #[default]
    Allow,
    /// Fail validation.
    Deny,
}

/// A user-extensible schema over config keys.
#[derive(Clone, Default)]
pub struct Schema {
    properties: BTreeMap<String, PropertySchema>,
    unknown_keys: UnknownKeys,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy for `key`. The base keys (`name`, `files`,
    /// `ignores`) are built in and silently keep their base behavior.
    pub fn with_property(mut self, key: impl Into<String>, property: PropertySchema) -> Self {
        let key = key.into();
        if !RESERVED_KEYS.contains(&key.as_str()) {
            self.properties.insert(key, property);
        }
        self
    }

    pub fn unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    /// Validate one flattened entry: reserved keys, required keys, per-key
    /// strategies, unknown-key policy. An empty `files` is deliberately not
    /// checked here — it surfaces as `InvalidFiles` when the entry is first
    /// consulted, so a partially built array stays usable.
    pub(crate) fn validate_entry(&self, entry: &ConfigEntry) -> Result<(), PerfigError> {
        for key in entry.values.keys() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(PerfigError::validation(
                    key,
                    "Reserved key — set it on the entry itself.",
                ));
            }
        }

        for (key, property) in &self.properties {
            if property.required && !entry.values.contains_key(key) {
                return Err(PerfigError::validation(key, "Missing required key."));
            }
        }

        for (key, value) in &entry.values {
            match self.properties.get(key) {
                Some(property) => property
                    .validate
                    .check(value)
                    .map_err(|message| PerfigError::validation(key, message))?,
                None if self.unknown_keys == UnknownKeys::Deny => {
                    return Err(PerfigError::validation(key, "Unexpected key found."));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// One fold step: merge `overlay` on top of `base`, key by key. Pure —
    /// neither input is touched. A strategy returning `None` drops the key.
    pub(crate) fn merge(
        &self,
        base: &Map<String, Value>,
        overlay: &Map<String, Value>,
    ) -> Map<String, Value> {
        let unknown_key_strategy = MergeStrategy::Replace;
        let mut merged = Map::new();
        let overlay_only = overlay.keys().filter(|key| !base.contains_key(*key));
        for key in base.keys().chain(overlay_only) {
            let strategy = self
                .properties
                .get(key)
                .map(|p| &p.merge)
                .unwrap_or(&unknown_key_strategy);
            if let Some(value) = strategy.apply(base.get(key), overlay.get(key)) {
                merged.insert(key.clone(), value);
            }
        }
        merged
    }
}
