//! Row interpretation.
//!
//! An [`Extractor`] is fed one raw row at a time. The first row becomes the header;
//! every later row is bound to it, run through the column rules, and lands either in the
//! processed records or in the error rows.
//!
//! ```text
//!            interpret(row)                    interpret(row)
//! ┌────────────────┐  header captured  ┌────────────┐ ──▶ processed / errors
//! │ AwaitingHeader │ ────────────────▶ │ Processing │ ◀─┐
//! └────────────────┘                   └────────────┘ ──┘
//!         ▲              reset()             │
//!         └──────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use column_extractor::{Column, Extractor};
//!
//! let mut extractor = Extractor::new([Column::new("foo").rename("A"), Column::new("bar")]);
//! extractor.interpret(&["foo", "bar"])?;
//! extractor.interpret(&["1", "2"])?;
//! extractor.interpret(&["3"])?;
//!
//! assert_eq!(extractor.processed()[0]["A"], "1");
//! assert_eq!(extractor.errors()[0].row, 3);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::column::{BoundRow, Column};
use crate::error::{ColumnError, DataError, ExtractError, ExtractResult};

/// One output record: output key to transformed value, in rule order.
pub type Record = Map<String, Value>;

/// Message recorded when a data row's width differs from the header's.
pub const WIDTH_MISMATCH: &str = "Row does not have enough columns";

const BOM: char = '\u{feff}';

/// Contract for anything that consumes raw rows in file order, header first.
pub trait Interpreter {
    fn interpret<S: AsRef<str>>(&mut self, row: &[S]) -> ExtractResult<()>;
}

/// A row that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRow {
    /// Code of the offending entity, when the failing rule supplied one.
    pub data_code: Option<String>,
    /// 1-based input line; the header is line 1.
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingHeader,
    Processing,
}

/// Applies column rules to header-bound rows and collects the outcome.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    columns: Vec<Column>,
    header: Option<Vec<String>>,
    line_number: usize,
    processed: Vec<Record>,
    rows: Vec<Record>,
    errors: Vec<ErrorRow>,
}

impl Extractor {
    pub fn new<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = Column>,
    {
        let mut extractor = Self::default();
        for column in columns {
            extractor.add_column(column);
        }
        extractor
    }

    /// Append a rule. Rules run in the order they were added.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Records produced so far. Same content as [`Extractor::processed`].
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn processed(&self) -> &[Record] {
        &self.processed
    }

    pub fn errors(&self) -> &[ErrorRow] {
        &self.errors
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Number of rows interpreted since creation or the last reset.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn state(&self) -> State {
        match self.header {
            None => State::AwaitingHeader,
            Some(_) => State::Processing,
        }
    }

    /// Interpret one raw row.
    ///
    /// Data problems are recorded as error rows and return `Ok`. Only an unexpected
    /// transform fault is returned as an error.
    pub fn interpret<S: AsRef<str>>(&mut self, row: &[S]) -> ExtractResult<()> {
        self.line_number += 1;

        let Some(header) = &self.header else {
            let header: Vec<String> = row
                .iter()
                .map(|cell| strip_bom(cell.as_ref()).to_string())
                .collect();
            debug!(columns = header.len(), "captured header row");
            self.header = Some(header);
            return Ok(());
        };

        match extract_row(&self.columns, header, row) {
            Ok(record) => {
                debug!(line = self.line_number, fields = record.len(), "row processed");
                self.processed.push(record.clone());
                self.rows.push(record);
                Ok(())
            }
            Err(ColumnError::Data(err)) => {
                self.record_error(err);
                Ok(())
            }
            Err(ColumnError::NotFound(message)) => {
                self.record_error(DataError::new(message));
                Ok(())
            }
            Err(ColumnError::Fault(source)) => Err(ExtractError::Fault {
                line: self.line_number,
                source,
            }),
        }
    }

    /// Forget the header and restart line numbering.
    ///
    /// Accumulated records and error rows are kept; use [`Extractor::clear`] to drop them.
    pub fn reset(&mut self) {
        self.header = None;
        self.line_number = 0;
    }

    /// Drop accumulated records and error rows.
    pub fn clear(&mut self) {
        self.processed.clear();
        self.rows.clear();
        self.errors.clear();
    }

    pub fn summary(&self) -> String {
        format!(
            "Interpreted {} lines: {} processed, {} errors",
            self.line_number,
            self.processed.len(),
            self.errors.len()
        )
    }

    fn record_error(&mut self, err: DataError) {
        warn!(line = self.line_number, error = %err, "row rejected");
        self.errors.push(err.error_row(self.line_number));
    }
}

impl Interpreter for Extractor {
    fn interpret<S: AsRef<str>>(&mut self, row: &[S]) -> ExtractResult<()> {
        Extractor::interpret(self, row)
    }
}

/// Bind `row` to `header` and run every rule. The first failure discards the row.
fn extract_row<S: AsRef<str>>(
    columns: &[Column],
    header: &[String],
    row: &[S],
) -> Result<Record, ColumnError> {
    if header.len() != row.len() {
        return Err(DataError::new(WIDTH_MISMATCH).into());
    }

    let bound = BoundRow::bind(header, row);
    let mut record = Record::new();
    for column in columns {
        let output = column.apply(&bound)?;
        record.insert(output.name, output.data);
    }
    Ok(record)
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn foo_bar() -> Extractor {
        Extractor::new([Column::new("foo").rename("A"), Column::new("bar")])
    }

    #[test]
    fn test_header_row_emits_nothing() {
        let mut ex = foo_bar();
        ex.interpret(&["foo", "bar"]).unwrap();

        assert_eq!(ex.line_number(), 1);
        assert_eq!(ex.state(), State::Processing);
        assert!(ex.processed().is_empty());
        assert!(ex.errors().is_empty());
        assert_eq!(ex.header().unwrap(), ["foo", "bar"]);
    }

    #[test]
    fn test_renamed_and_plain_columns() {
        let mut ex = foo_bar();
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1", "2"]).unwrap();

        assert_eq!(ex.processed().len(), 1);
        assert_eq!(Value::Object(ex.processed()[0].clone()), json!({ "A": "1", "bar": "2" }));
        assert_eq!(ex.rows(), ex.processed());
    }

    #[test]
    fn test_output_keys_follow_rule_order() {
        let mut ex = Extractor::new([Column::new("zeta"), Column::new("alpha")]);
        ex.interpret(&["alpha", "zeta"]).unwrap();
        ex.interpret(&["a", "z"]).unwrap();

        let keys: Vec<&String> = ex.processed()[0].keys().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[test]
    fn test_width_mismatch_records_error() {
        let mut ex = foo_bar();
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1"]).unwrap();
        ex.interpret(&["1", "2", "3"]).unwrap();

        assert!(ex.processed().is_empty());
        assert_eq!(
            ex.errors(),
            [
                ErrorRow {
                    data_code: None,
                    row: 2,
                    error: WIDTH_MISMATCH.to_string(),
                },
                ErrorRow {
                    data_code: None,
                    row: 3,
                    error: WIDTH_MISMATCH.to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_error_row_serializes_with_expected_keys() {
        let mut ex = foo_bar();
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1"]).unwrap();

        let value = serde_json::to_value(&ex.errors()[0]).unwrap();
        assert_eq!(
            value,
            json!({ "data_code": null, "row": 2, "error": "Row does not have enough columns" })
        );
    }

    #[test]
    fn test_missing_column_discards_whole_row() {
        let mut ex = Extractor::new([Column::new("foo"), Column::new("missing")]);
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1", "2"]).unwrap();
        ex.interpret(&["3", "4"]).unwrap();

        assert!(ex.processed().is_empty());
        assert_eq!(ex.errors().len(), 2);
        assert_eq!(ex.errors()[0].row, 2);
        assert_eq!(ex.errors()[1].row, 3);
        assert_eq!(ex.errors()[0].error, "missing is not found in row");
    }

    #[test]
    fn test_good_and_bad_rows_interleave() {
        let mut ex = foo_bar();
        for row in [vec!["foo", "bar"], vec!["1", "2"], vec!["x"], vec!["3", "4"]] {
            ex.interpret(&row).unwrap();
        }

        assert_eq!(ex.processed().len(), 2);
        assert_eq!(ex.processed()[1]["A"], "3");
        assert_eq!(ex.errors().len(), 1);
        assert_eq!(ex.errors()[0].row, 3);
        assert_eq!(ex.summary(), "Interpreted 4 lines: 2 processed, 1 errors");
    }

    #[test]
    fn test_bom_stripped_from_header_only() {
        let mut ex = Extractor::new([Column::new("foo"), Column::new("bar")]);
        ex.interpret(&["\u{feff}foo", "bar"]).unwrap();
        ex.interpret(&["\u{feff}1", "2"]).unwrap();

        assert_eq!(ex.header().unwrap(), ["foo", "bar"]);
        assert_eq!(ex.processed()[0]["foo"], "\u{feff}1");
    }

    #[test]
    fn test_bom_stripped_once() {
        let mut ex = Extractor::default();
        ex.interpret(&["\u{feff}\u{feff}foo"]).unwrap();
        assert_eq!(ex.header().unwrap(), ["\u{feff}foo"]);
    }

    #[test]
    fn test_transform_result_is_stored_verbatim() {
        let mut ex = Extractor::new([Column::new("tags")
            .transform(|_, raw| Ok(json!(raw.split('|').collect::<Vec<_>>())))]);
        ex.interpret(&["tags"]).unwrap();
        ex.interpret(&["a|b"]).unwrap();

        assert_eq!(ex.processed()[0]["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_lookup_failure_becomes_error_row() {
        let mut ex = Extractor::new([Column::new("code").transform(|_, raw| {
            Err(ColumnError::not_found(format!("No consultant with code {raw}")))
        })]);
        ex.interpret(&["code"]).unwrap();
        ex.interpret(&["C9"]).unwrap();

        assert_eq!(
            ex.errors(),
            [ErrorRow {
                data_code: None,
                row: 2,
                error: "No consultant with code C9".into(),
            }]
        );
    }

    #[test]
    fn test_data_code_is_carried() {
        let mut ex = Extractor::new([Column::new("code").transform(|_, raw| {
            Err(DataError::new("inactive consultant").with_data_code(raw).into())
        })]);
        ex.interpret(&["code"]).unwrap();
        ex.interpret(&["C7"]).unwrap();

        assert_eq!(ex.errors()[0].data_code.as_deref(), Some("C7"));
    }

    #[test]
    fn test_fault_propagates() {
        let mut ex = Extractor::new([Column::new("n")
            .transform(|_, _| Err(ColumnError::fault("connection reset")))]);
        ex.interpret(&["n"]).unwrap();
        let err = ex.interpret(&["1"]).unwrap_err();

        assert!(matches!(err, ExtractError::Fault { line: 2, .. }));
        assert!(ex.processed().is_empty());
        assert!(ex.errors().is_empty());
    }

    #[test]
    fn test_reset_keeps_accumulated_results() {
        let mut ex = foo_bar();
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1", "2"]).unwrap();
        ex.interpret(&["1"]).unwrap();

        ex.reset();
        assert_eq!(ex.line_number(), 0);
        assert_eq!(ex.state(), State::AwaitingHeader);
        assert!(ex.header().is_none());

        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1", "2"]).unwrap();
        ex.interpret(&["1"]).unwrap();

        assert_eq!(ex.processed().len(), 2);
        assert_eq!(ex.processed()[0], ex.processed()[1]);
        assert_eq!(ex.rows(), ex.processed());
        assert_eq!(ex.errors().len(), 2);
        assert_eq!(ex.errors()[0], ex.errors()[1]);
    }

    #[test]
    fn test_reset_accepts_a_different_header() {
        let mut ex = Extractor::new([Column::any_of(["foo", "FOO"]).unwrap().rename("A")]);
        ex.interpret(&["foo"]).unwrap();
        ex.interpret(&["1"]).unwrap();

        ex.reset();
        ex.interpret(&["FOO", "extra"]).unwrap();
        ex.interpret(&["2", "x"]).unwrap();

        let values: Vec<&Value> = ex.processed().iter().map(|r| &r["A"]).collect();
        assert_eq!(values, [&json!("1"), &json!("2")]);
    }

    #[test]
    fn test_clear_drops_results_only() {
        let mut ex = foo_bar();
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1", "2"]).unwrap();
        ex.interpret(&["1"]).unwrap();

        ex.clear();
        assert!(ex.processed().is_empty());
        assert!(ex.rows().is_empty());
        assert!(ex.errors().is_empty());
        assert_eq!(ex.line_number(), 3);

        ex.interpret(&["5", "6"]).unwrap();
        assert_eq!(ex.processed()[0]["bar"], "6");
    }

    #[test]
    fn test_add_column_after_construction() {
        let mut ex = Extractor::new([Column::new("foo")]);
        ex.add_column(Column::new("bar").rename("B"));
        ex.interpret(&["foo", "bar"]).unwrap();
        ex.interpret(&["1", "2"]).unwrap();

        assert_eq!(ex.columns().len(), 2);
        assert_eq!(ex.processed()[0]["B"], "2");
    }

    #[test]
    fn test_driven_through_interpreter_trait() {
        fn feed<I: Interpreter>(interpreter: &mut I, rows: &[Vec<String>]) {
            for row in rows {
                interpreter.interpret(row).unwrap();
            }
        }

        let rows: Vec<Vec<String>> = vec![
            vec!["foo".into(), "bar".into()],
            vec!["1".into(), "2".into()],
        ];
        let mut ex = foo_bar();
        feed(&mut ex, &rows);

        assert_eq!(ex.processed().len(), 1);
    }
}
