//! Declarative column configuration.
//!
//! Column rules can be written as JSON instead of code:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "description": "Consultant import",
//!   "columns": [
//!     { "match": ["Surname", "Last Name"], "rename": "last_name",
//!       "operations": [{ "type": "trim" }, { "type": "uppercase" }] },
//!     { "match": "Code" }
//!   ]
//! }
//! ```
//!
//! [`ExtractorConfig::build`] turns the configuration into an [`Extractor`].

pub mod operations;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::column::Column;
use crate::error::{ColumnError, ConfigResult};
use crate::extractor::Extractor;

pub use operations::{Operation, OperationChain, Pattern};

fn default_version() -> String {
    "1.0".to_string()
}

/// A complete set of column rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    pub columns: Vec<ColumnSpec>,
}

/// One column rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Candidate header names, tried in order. A single string is accepted.
    #[serde(rename = "match")]
    pub candidates: Candidates,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,
}

/// `"name"` or `["name", "alias"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Candidates {
    One(String),
    Many(Vec<String>),
}

impl Candidates {
    pub fn names(&self) -> &[String] {
        match self {
            Candidates::One(name) => std::slice::from_ref(name),
            Candidates::Many(names) => names,
        }
    }
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            candidates: Candidates::One(name.into()),
            rename: None,
            operations: Vec::new(),
        }
    }

    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: Candidates::Many(names.into_iter().map(Into::into).collect()),
            rename: None,
            operations: Vec::new(),
        }
    }

    pub fn with_rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Build the runtime column rule.
    pub fn build(&self) -> ConfigResult<Column> {
        let mut column = Column::any_of(self.candidates.names().iter().cloned())?;
        if let Some(name) = &self.rename {
            column = column.rename(name.clone());
        }

        let chain = OperationChain::new(self.operations.clone());
        if !chain.is_empty() {
            let field = self
                .rename
                .clone()
                .unwrap_or_else(|| self.candidates.names().join("|"));
            column = column.transform(move |_, raw| {
                chain.apply(&field, raw).map_err(ColumnError::from)
            });
        }
        Ok(column)
    }
}

impl ExtractorConfig {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            columns,
        }
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build an extractor with these rules, in order.
    pub fn build(&self) -> ConfigResult<Extractor> {
        let columns = self
            .columns
            .iter()
            .map(ColumnSpec::build)
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Extractor::new(columns))
    }

    /// Every candidate name referenced, sorted and deduplicated.
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .columns
            .iter()
            .flat_map(|c| c.candidates.names().iter().cloned())
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }

    /// Check a header against the rules.
    ///
    /// Returns, for each rule with no candidate in `headers`, its candidates joined by `", "`.
    pub fn validate_headers(&self, headers: &[String]) -> Result<(), Vec<String>> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !c.candidates.names().iter().any(|n| headers.contains(n)))
            .map(|c| c.candidates.names().join(", "))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}
