//! Column rules.
//!
//! A [`Column`] pulls one field out of a [`BoundRow`]: it looks for one of its candidate
//! header names, optionally renames the output key and optionally runs a transform over
//! the raw cell.
//!
//! ```rust,ignore
//! use column_extractor::Column;
//! use serde_json::json;
//!
//! let column = Column::any_of(["Surname", "Last Name"])?
//!     .rename("last_name")
//!     .transform(|_row, raw| Ok(json!(raw.trim().to_uppercase())));
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ColumnResult, ConfigError, DataError};

/// Transform callback: receives the whole bound row and the raw matched cell.
pub type TransformFn = dyn Fn(&BoundRow, &str) -> ColumnResult<Value> + Send + Sync;

// =============================================================================
// Bound Row
// =============================================================================

/// A data row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundRow {
    values: HashMap<String, String>,
}

impl BoundRow {
    /// Zip header names with raw cells positionally.
    ///
    /// Callers check widths first; extra cells on either side are dropped.
    /// When a header name repeats, the later cell wins.
    pub fn bind<H, S>(header: &[H], row: &[S]) -> Self
    where
        H: AsRef<str>,
        S: AsRef<str>,
    {
        let values = header
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.as_ref().to_string(), cell.as_ref().to_string()))
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for BoundRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Column
// =============================================================================

/// Output of applying a column to a row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOutput {
    pub name: String,
    pub data: Value,
}

/// A single extraction rule.
#[derive(Clone)]
pub struct Column {
    candidates: Vec<String>,
    rename: Option<String>,
    transform: Option<Arc<TransformFn>>,
}

impl Column {
    /// Rule matching exactly one header name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            candidates: vec![name.into()],
            rename: None,
            transform: None,
        }
    }

    /// Rule matching the first present header among `names`, tried in order.
    pub fn any_of<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let candidates: Vec<String> = names.into_iter().map(Into::into).collect();
        if candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        Ok(Self {
            candidates,
            rename: None,
            transform: None,
        })
    }

    /// Use a fixed output key instead of the matched header name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    /// Replace the raw cell with the callback's result.
    pub fn transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&BoundRow, &str) -> ColumnResult<Value> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(func));
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn output_name(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Extract this column's field from `row`.
    ///
    /// Fails with a data error naming the candidates when none of them is bound.
    pub fn apply(&self, row: &BoundRow) -> ColumnResult<ColumnOutput> {
        let (matched, raw) = self
            .candidates
            .iter()
            .find_map(|name| row.get(name).map(|raw| (name, raw)))
            .ok_or_else(|| {
                DataError::new(format!("{} is not found in row", self.candidates.join(", ")))
            })?;

        let name = self.rename.clone().unwrap_or_else(|| matched.clone());
        let data = match &self.transform {
            Some(func) => func(row, raw)?,
            None => Value::String(raw.to_string()),
        };

        Ok(ColumnOutput { name, data })
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("candidates", &self.candidates)
            .field("rename", &self.rename)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}
