//! Pipeline error and warning taxonomy.
//!
//! [`SchemaError`] is the only fatal outcome of the core: a required canonical
//! column could not be found in one of the three inputs. Everything else is a
//! [`Warning`] that is recovered locally and returned next to the result.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::columns::CanonicalColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Status,
    Traceability,
    Stock,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Status => "status",
            SourceKind::Traceability => "traceability",
            SourceKind::Stock => "stock",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{table} table is missing required column(s): {}", join_columns(.missing))]
pub struct SchemaError {
    pub table: SourceKind,
    pub missing: Vec<CanonicalColumn>,
}

impl SchemaError {
    pub fn new(table: SourceKind, missing: Vec<CanonicalColumn>) -> Self {
        Self { table, missing }
    }

    pub fn names(&self, column: CanonicalColumn) -> bool {
        self.missing.contains(&column)
    }
}

fn join_columns(columns: &[CanonicalColumn]) -> String {
    columns.iter().map(CanonicalColumn::as_str).join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataIssue {
    NotNumeric,
    MissingValue,
    MissingKey,
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIssue::NotNumeric => f.write_str("value is not numeric, using 0"),
            DataIssue::MissingValue => f.write_str("value is missing, using 0"),
            DataIssue::MissingKey => f.write_str("item key is empty, row excluded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityWarning {
    pub table: SourceKind,
    /// Source line number (header is line 1), when the issue maps to a source row.
    pub row: Option<usize>,
    pub column: CanonicalColumn,
    pub value: String,
    pub issue: DataIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    DataQuality(DataQualityWarning),
    EmptyResult,
}

impl Warning {
    pub fn data_quality(
        table: SourceKind,
        row: Option<usize>,
        column: CanonicalColumn,
        value: impl Into<String>,
        issue: DataIssue,
    ) -> Self {
        Warning::DataQuality(DataQualityWarning {
            table,
            row,
            column,
            value: value.into(),
            issue,
        })
    }

    pub fn issue(&self) -> Option<DataIssue> {
        match self {
            Warning::DataQuality(warning) => Some(warning.issue),
            Warning::EmptyResult => None,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DataQuality(w) => {
                write!(f, "{} table", w.table)?;
                if let Some(row) = w.row {
                    write!(f, ", row {row}")?;
                }
                write!(f, ", column {}", w.column)?;
                if !w.value.is_empty() {
                    write!(f, " ('{}')", w.value)?;
                }
                write!(f, ": {}", w.issue)
            }
            Warning::EmptyResult => f.write_str("reconciliation produced no report rows"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_every_missing_column() {
        let err = SchemaError::new(
            SourceKind::Status,
            vec![CanonicalColumn::Description, CanonicalColumn::UnallocatedQuantity],
        );
        assert_eq!(
            err.to_string(),
            "status table is missing required column(s): Description, UnallocatedQuantity"
        );
        assert!(err.names(CanonicalColumn::UnallocatedQuantity));
        assert!(!err.names(CanonicalColumn::Item));
    }

    #[test]
    fn data_quality_warning_renders_location() {
        let warning = Warning::data_quality(
            SourceKind::Stock,
            Some(4),
            CanonicalColumn::CurrentQuantity,
            "abc",
            DataIssue::NotNumeric,
        );
        assert_eq!(
            warning.to_string(),
            "stock table, row 4, column CurrentQuantity ('abc'): value is not numeric, using 0"
        );
        assert_eq!(warning.issue(), Some(DataIssue::NotNumeric));
    }
}
