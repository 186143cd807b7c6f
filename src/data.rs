//! Raw table model and cell coercion helpers.
//!
//! A [`RawTable`] is what the loaders hand to the pipeline: the header row as
//! written in the source file plus rows of untyped [`Cell`]s. Nothing here
//! knows about canonical columns; that is the job of [`crate::columns`].

use std::{fmt, sync::OnceLock};

use regex::Regex;

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Builds a text cell, collapsing blank strings to [`Cell::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(value) => value.is_nan(),
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Number(value) => format_number(*value),
        }
    }

    /// Trimmed display value, `None` when the cell holds nothing useful.
    pub fn as_key(&self) -> Option<String> {
        let display = self.as_display();
        let trimmed = display.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Renders whole numbers without a fractional part (`1001.0` -> `1001`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Source line of each row (header is line 1).
    lines: Vec<usize>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Convenience constructor used by tests and benches.
    pub fn from_strings(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|value| Cell::text(*value)).collect());
        }
        table
    }

    /// Appends a row on the line after the previous one.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        let line = self.lines.last().map_or(2, |last| last + 1);
        self.push_row_at(row, line);
    }

    /// Appends a row read from `line` of the source, for loaders that skip blank lines.
    pub fn push_row_at(&mut self, row: Vec<Cell>, line: usize) {
        self.rows.push(row);
        self.lines.push(line);
    }

    /// Source line number of `row`.
    pub fn line(&self, row: usize) -> usize {
        self.lines.get(row).copied().unwrap_or(row + 2)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the cell at `(row, column)`, treating short rows as padded with empties.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Outcome of coercing a quantity cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    Value(f64),
    Missing,
    Invalid,
}

impl Coercion {
    /// Numeric value with missing and invalid cells defaulted to zero.
    pub fn or_zero(self) -> f64 {
        match self {
            Coercion::Value(value) => value,
            Coercion::Missing | Coercion::Invalid => 0.0,
        }
    }
}

pub fn coerce_quantity(cell: &Cell) -> Coercion {
    match cell {
        Cell::Empty => Coercion::Missing,
        Cell::Number(value) if value.is_finite() => Coercion::Value(*value),
        Cell::Number(value) if value.is_nan() => Coercion::Missing,
        Cell::Number(_) => Coercion::Invalid,
        Cell::Text(text) if text.trim().is_empty() => Coercion::Missing,
        Cell::Text(text) => parse_decimal(text).map_or(Coercion::Invalid, Coercion::Value),
    }
}

/// Parses `1234.5`, `1234,5`, `1.234,5` and `1,234.5` style quantities.
///
/// A value made only of dot-separated groups of three digits (`1.500`,
/// `12.345.678`) is read as grouped thousands, the way pt-BR exports print
/// whole quantities. A leading zero (`0.500`) keeps it a decimal.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let compact = value
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    if compact.is_empty() {
        return None;
    }
    let normalized = if grouped_thousands().is_match(&compact) {
        compact.replace('.', "")
    } else if !compact.contains(',') {
        compact
    } else if compact.rfind('.') > compact.rfind(',') {
        compact.replace(',', "")
    } else {
        compact.replace('.', "").replace(',', ".")
    };
    let parsed = normalized.parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

fn grouped_thousands() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?[1-9][0-9]{0,2}(\.[0-9]{3})+$").expect("valid thousands pattern")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_cells_collapse_blank_strings() {
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert_eq!(Cell::text(" B0001 "), Cell::Text(" B0001 ".to_string()));
        assert_eq!(Cell::text(" B0001 ").as_key().as_deref(), Some("B0001"));
    }

    #[test]
    fn numeric_cells_render_without_trailing_zero() {
        assert_eq!(Cell::Number(1001.0).as_display(), "1001");
        assert_eq!(Cell::Number(2.5).as_display(), "2.5");
        assert_eq!(Cell::Number(1001.0).as_key().as_deref(), Some("1001"));
    }

    #[test]
    fn cell_lookup_pads_short_rows() {
        let table = RawTable::from_strings(&["Item", "Qtd"], &[&["ITEM001"]]);
        assert_eq!(table.cell(0, 1), &Cell::Empty);
        assert_eq!(table.cell(7, 0), &Cell::Empty);
    }

    #[test]
    fn parse_decimal_accepts_common_formats() {
        assert_eq!(parse_decimal("15"), Some(15.0));
        assert_eq!(parse_decimal(" 2.5 "), Some(2.5));
        assert_eq!(parse_decimal("2,5"), Some(2.5));
        assert_eq!(parse_decimal("1.234,5"), Some(1234.5));
        assert_eq!(parse_decimal("1 234"), Some(1234.0));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn rows_remember_their_source_line() {
        let mut table = RawTable::new(vec!["Item".to_string()]);
        table.push_row(vec![Cell::text("A")]);
        table.push_row_at(vec![Cell::text("B")], 5);
        table.push_row(vec![Cell::text("C")]);
        assert_eq!(
            (table.line(0), table.line(1), table.line(2)),
            (2, 5, 6)
        );
    }

    #[test]
    fn dotted_groups_of_three_are_thousands() {
        assert_eq!(parse_decimal("1.500"), Some(1500.0));
        assert_eq!(parse_decimal("12.345.678"), Some(12_345_678.0));
        assert_eq!(parse_decimal("0.500"), Some(0.5));
        assert_eq!(parse_decimal("1.5"), Some(1.5));
        assert_eq!(parse_decimal("1.2345"), Some(1.2345));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(coerce_quantity(&Cell::text("1.500")), Coercion::Value(1500.0));
    }

    #[test]
    fn coerce_quantity_distinguishes_missing_from_invalid() {
        assert_eq!(coerce_quantity(&Cell::Empty), Coercion::Missing);
        assert_eq!(coerce_quantity(&Cell::text("n/a")), Coercion::Invalid);
        assert_eq!(coerce_quantity(&Cell::Number(3.0)), Coercion::Value(3.0));
        assert_eq!(coerce_quantity(&Cell::text("n/a")).or_zero(), 0.0);
    }
}
