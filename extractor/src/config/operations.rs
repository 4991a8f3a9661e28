//! Value operations for configured columns.
//!
//! Operations run in order over the raw cell. Every step works on a
//! `serde_json::Value`, so later steps see the output of earlier ones.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::num::IntErrorKind;

use crate::error::{ConfigError, DataError};

/// A single value operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Trim,
    Uppercase,
    Lowercase,

    /// Regex replacement over the whole value.
    Replace {
        pattern: Pattern,
        #[serde(default)]
        value: String,
    },

    PadStart {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    EnsurePrefix {
        value: String,
    },

    /// Lookup table. Unmatched values become `default_unmapped`, or stay as they are.
    ///
    /// An exact key always wins. Without one, a case-insensitive lookup takes the
    /// smallest matching key so the result does not depend on map order.
    Map {
        mapping: HashMap<String, String>,
        #[serde(default)]
        case_insensitive: bool,
        #[serde(default)]
        default_unmapped: Option<String>,
    },

    Split {
        #[serde(default = "default_split_separator")]
        separator: String,
    },

    ToBoolean {
        #[serde(default = "default_true_values")]
        true_values: Vec<String>,
    },

    /// Parse an integer, ignoring non-digit characters.
    ToNumber,

    DigitsOnly,

    /// Replace an empty value.
    Default {
        value: Value,
    },
}

fn default_pad_char() -> String {
    "0".to_string()
}

fn default_split_separator() -> String {
    ",".to_string()
}

fn default_true_values() -> Vec<String> {
    ["true", "1", "yes", "y"].iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Pattern
// =============================================================================

/// A regex compiled when the configuration is loaded.
///
/// Serializes as its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Regex::new(pattern)
            .map(Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Pattern::new(&text).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Operations run in order over one cell.
#[derive(Debug, Clone, Default)]
pub struct OperationChain {
    operations: Vec<Operation>,
}

impl OperationChain {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Run the chain over `raw`. `field` names the output in error messages.
    pub fn apply(&self, field: &str, raw: &str) -> Result<Value, DataError> {
        self.operations
            .iter()
            .try_fold(Value::String(raw.to_string()), |value, op| op.apply(field, &value))
    }
}

impl Operation {
    fn apply(&self, field: &str, value: &Value) -> Result<Value, DataError> {
        let out = match self {
            Operation::Trim => map_str(value, |s| Value::String(s.trim().to_string())),
            Operation::Uppercase => map_str(value, |s| Value::String(s.to_uppercase())),
            Operation::Lowercase => map_str(value, |s| Value::String(s.to_lowercase())),
            Operation::Replace {
                pattern,
                value: replacement,
            } => map_str(value, |s| {
                Value::String(pattern.0.replace_all(s, replacement.as_str()).into_owned())
            }),
            Operation::PadStart { length, char } => map_str(value, |s| {
                let count = s.chars().count();
                if count >= *length {
                    return Value::String(s.to_string());
                }
                let pad = char.chars().next().unwrap_or('0');
                let mut padded = pad.to_string().repeat(length - count);
                padded.push_str(s);
                Value::String(padded)
            }),
            Operation::EnsurePrefix { value: prefix } => map_str(value, |s| {
                if s.starts_with(prefix.as_str()) {
                    Value::String(s.to_string())
                } else {
                    Value::String(format!("{prefix}{s}"))
                }
            }),
            Operation::Map {
                mapping,
                case_insensitive,
                default_unmapped,
            } => map_str(value, |s| {
                let found = mapping.get(s).or_else(|| {
                    if !*case_insensitive {
                        return None;
                    }
                    let key = s.to_lowercase();
                    mapping
                        .iter()
                        .filter(|(k, _)| k.to_lowercase() == key)
                        .min_by(|(a, _), (b, _)| a.cmp(b))
                        .map(|(_, v)| v)
                });
                match (found, default_unmapped) {
                    (Some(v), _) => Value::String(v.clone()),
                    (None, Some(d)) => Value::String(d.clone()),
                    (None, None) => Value::String(s.to_string()),
                }
            }),
            Operation::Split { separator } => map_str(value, |s| {
                Value::Array(
                    s.split(separator.as_str())
                        .map(|part| Value::String(part.trim().to_string()))
                        .collect(),
                )
            }),
            Operation::ToBoolean { true_values } => match value {
                Value::Bool(_) => value.clone(),
                _ => {
                    let text = as_text(value).unwrap_or_default().trim().to_lowercase();
                    Value::Bool(true_values.iter().any(|t| t.to_lowercase() == text))
                }
            },
            Operation::ToNumber => to_number(field, value)?,
            Operation::DigitsOnly => map_str(value, |s| {
                Value::String(s.chars().filter(char::is_ascii_digit).collect())
            }),
            Operation::Default { value: fallback } => {
                if is_empty(value) {
                    fallback.clone()
                } else {
                    value.clone()
                }
            }
        };
        Ok(out)
    }
}

fn to_number(field: &str, value: &Value) -> Result<Value, DataError> {
    if value.is_number() {
        return Ok(value.clone());
    }
    let text = as_text(value).unwrap_or_default();
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    let signed = if text.trim_start().starts_with('-') {
        format!("-{digits}")
    } else {
        digits
    };
    signed.parse::<i64>().map(Value::from).map_err(|e| {
        let reason = match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => "is out of range",
            _ => "is not a number",
        };
        DataError::new(format!("{field}: '{text}' {reason}"))
    })
}

/// Apply `f` to string-like values; arrays, objects and nulls pass through untouched.
fn map_str(value: &Value, f: impl FnOnce(&str) -> Value) -> Value {
    match as_text(value) {
        Some(text) => f(&text),
        None => value.clone(),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
