//! Source table preparers.
//!
//! Each preparer resolves the table's headers, fails with a [`SchemaError`]
//! when a required canonical column is absent, and otherwise extracts typed
//! records. Bad cells never abort a run: they are defaulted and reported as
//! [`Warning`]s alongside the records.

use std::collections::HashMap;

use log::debug;

use crate::{
    address::{self, AddressRecord},
    columns::{CanonicalColumn, HeaderMap, SynonymTable},
    config::AddressRules,
    data::{Coercion, RawTable, coerce_quantity},
    error::{DataIssue, SchemaError, SourceKind, Warning},
};

/// Records extracted from one source plus the warnings raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared<T> {
    pub records: Vec<T>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord {
    pub item: String,
    pub description: String,
    pub unallocated_quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub item: String,
    pub current_quantity: f64,
}

/// Order-status rows with a positive unallocated quantity.
pub fn prepare_status(
    table: &RawTable,
    synonyms: &SynonymTable,
) -> Result<Prepared<StatusRecord>, SchemaError> {
    let headers = HeaderMap::resolve(&table.headers, synonyms);
    let positions = headers.require(
        SourceKind::Status,
        &[
            CanonicalColumn::Item,
            CanonicalColumn::Description,
            CanonicalColumn::UnallocatedQuantity,
        ],
    )?;
    let (item_idx, description_idx, quantity_idx) = (positions[0], positions[1], positions[2]);

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    for row in 0..table.row_count() {
        let Some(item) = read_item(table, row, item_idx, SourceKind::Status, &mut warnings)
        else {
            continue;
        };
        let unallocated_quantity = read_quantity(
            table,
            row,
            quantity_idx,
            SourceKind::Status,
            CanonicalColumn::UnallocatedQuantity,
            &mut warnings,
        );
        if unallocated_quantity <= 0.0 {
            continue;
        }
        records.push(StatusRecord {
            item,
            description: table
                .cell(row, description_idx)
                .as_display()
                .trim()
                .to_string(),
            unallocated_quantity,
        });
    }
    debug!(
        "Status: kept {} of {} row(s) with unallocated quantity",
        records.len(),
        table.row_count()
    );
    Ok(Prepared { records, warnings })
}

/// Stock rows, one per item. A repeated item keeps its first position and its last quantity.
pub fn prepare_stock(
    table: &RawTable,
    synonyms: &SynonymTable,
) -> Result<Prepared<StockRecord>, SchemaError> {
    let headers = HeaderMap::resolve(&table.headers, synonyms);
    let positions = headers.require(
        SourceKind::Stock,
        &[CanonicalColumn::Item, CanonicalColumn::CurrentQuantity],
    )?;
    let (item_idx, quantity_idx) = (positions[0], positions[1]);

    let mut records: Vec<StockRecord> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();
    let mut duplicates = 0usize;
    for row in 0..table.row_count() {
        let Some(item) = read_item(table, row, item_idx, SourceKind::Stock, &mut warnings) else {
            continue;
        };
        let current_quantity = read_quantity(
            table,
            row,
            quantity_idx,
            SourceKind::Stock,
            CanonicalColumn::CurrentQuantity,
            &mut warnings,
        );
        match slots.get(&item) {
            Some(&slot) => {
                duplicates += 1;
                records[slot].current_quantity = current_quantity;
            }
            None => {
                slots.insert(item.clone(), records.len());
                records.push(StockRecord {
                    item,
                    current_quantity,
                });
            }
        }
    }
    if duplicates > 0 {
        debug!("Stock: {duplicates} repeated item row(s) overwrote earlier quantities");
    }
    Ok(Prepared { records, warnings })
}

/// Traceability rows reduced to one address per item.
pub fn prepare_traceability(
    table: &RawTable,
    synonyms: &SynonymTable,
    rules: &AddressRules,
) -> Result<Prepared<AddressRecord>, SchemaError> {
    address::consolidate(table, synonyms, rules)
}

fn read_item(
    table: &RawTable,
    row: usize,
    column: usize,
    source: SourceKind,
    warnings: &mut Vec<Warning>,
) -> Option<String> {
    let item = table.cell(row, column).as_key();
    if item.is_none() {
        warnings.push(Warning::data_quality(
            source,
            Some(table.line(row)),
            CanonicalColumn::Item,
            "",
            DataIssue::MissingKey,
        ));
    }
    item
}

fn read_quantity(
    table: &RawTable,
    row: usize,
    column: usize,
    source: SourceKind,
    canonical: CanonicalColumn,
    warnings: &mut Vec<Warning>,
) -> f64 {
    let cell = table.cell(row, column);
    let coercion = coerce_quantity(cell);
    let issue = match coercion {
        Coercion::Value(_) => None,
        Coercion::Missing => Some(DataIssue::MissingValue),
        Coercion::Invalid => Some(DataIssue::NotNumeric),
    };
    if let Some(issue) = issue {
        warnings.push(Warning::data_quality(
            source,
            Some(table.line(row)),
            canonical,
            cell.as_display(),
            issue,
        ));
    }
    coercion.or_zero()
}
