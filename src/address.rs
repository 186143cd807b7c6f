//! Address consolidation for the traceability table.
//!
//! Traceability exports either carry one address column or an origin and a
//! destination column per movement. The layout is detected once per table as
//! an [`AddressStrategy`]; every row then contributes its candidate addresses
//! to the item it belongs to. Per item the candidates are split, deduplicated
//! in first-seen order and stripped of staging locations (the forbidden
//! prefix). The last survivor becomes the item's address, or
//! [`SENTINEL_ADDRESS`] when none survive.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::{
    columns::{CanonicalColumn, HeaderMap, SynonymTable},
    config::{AddressRules, SENTINEL_ADDRESS},
    data::{Cell, RawTable},
    error::{DataIssue, SchemaError, SourceKind, Warning},
    prepare::Prepared,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressStrategy {
    Direct { address: usize },
    OriginDestination { origin: usize, destination: usize },
}

impl AddressStrategy {
    /// Picks the strategy from the columns present, preferring a direct address column.
    pub fn resolve(headers: &HeaderMap) -> Result<Self, SchemaError> {
        if let Some(address) = headers.position(CanonicalColumn::Address) {
            return Ok(AddressStrategy::Direct { address });
        }
        let origin = headers.position(CanonicalColumn::AddressOrigin);
        let destination = headers.position(CanonicalColumn::AddressDestination);
        match (origin, destination) {
            (Some(origin), Some(destination)) => Ok(AddressStrategy::OriginDestination {
                origin,
                destination,
            }),
            (Some(_), None) => Err(SchemaError::new(
                SourceKind::Traceability,
                vec![CanonicalColumn::AddressDestination],
            )),
            (None, Some(_)) => Err(SchemaError::new(
                SourceKind::Traceability,
                vec![CanonicalColumn::AddressOrigin],
            )),
            (None, None) => Err(SchemaError::new(
                SourceKind::Traceability,
                vec![
                    CanonicalColumn::Address,
                    CanonicalColumn::AddressOrigin,
                    CanonicalColumn::AddressDestination,
                ],
            )),
        }
    }

    fn cells<'a>(&self, table: &'a RawTable, row: usize) -> Vec<&'a Cell> {
        match *self {
            AddressStrategy::Direct { address } => vec![table.cell(row, address)],
            AddressStrategy::OriginDestination {
                origin,
                destination,
            } => vec![table.cell(row, origin), table.cell(row, destination)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub item: String,
    pub description: Option<String>,
    pub address: String,
}

impl AddressRecord {
    pub fn is_traceable(&self) -> bool {
        self.address != SENTINEL_ADDRESS
    }
}

struct ItemAddresses {
    item: String,
    description: Option<String>,
    candidates: Vec<String>,
}

pub fn consolidate(
    table: &RawTable,
    synonyms: &SynonymTable,
    rules: &AddressRules,
) -> Result<Prepared<AddressRecord>, SchemaError> {
    let headers = HeaderMap::resolve(&table.headers, synonyms);
    let item_idx = headers.require(SourceKind::Traceability, &[CanonicalColumn::Item])?[0];
    let strategy = AddressStrategy::resolve(&headers)?;
    let description_idx = headers.position(CanonicalColumn::Description);
    debug!("Traceability addresses read with {strategy:?}");

    let mut groups: Vec<ItemAddresses> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for row in 0..table.row_count() {
        let Some(item) = table.cell(row, item_idx).as_key() else {
            warnings.push(Warning::data_quality(
                SourceKind::Traceability,
                Some(table.line(row)),
                CanonicalColumn::Item,
                "",
                DataIssue::MissingKey,
            ));
            continue;
        };
        let slot = *slots.entry(item.clone()).or_insert_with(|| {
            groups.push(ItemAddresses {
                item,
                description: None,
                candidates: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        if group.description.is_none() {
            group.description = description_idx.and_then(|idx| table.cell(row, idx).as_key());
        }
        for cell in strategy.cells(table, row) {
            group
                .candidates
                .extend(split_addresses(&cell.as_display(), rules));
        }
    }

    let records = groups
        .into_iter()
        .map(|group| AddressRecord {
            address: select_address(&group.candidates, rules),
            item: group.item,
            description: group.description,
        })
        .collect::<Vec<_>>();
    debug!(
        "Consolidated {} traceability row(s) into {} item address(es)",
        table.row_count(),
        records.len()
    );
    Ok(Prepared { records, warnings })
}

/// Splits a cell that may hold several addresses into trimmed tokens.
pub fn split_addresses(raw: &str, rules: &AddressRules) -> Vec<String> {
    raw.split(|c: char| rules.is_separator(c))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Candidates that remain after deduplication and prefix exclusion, in first-seen order.
pub fn surviving_addresses(candidates: &[String], rules: &AddressRules) -> Vec<String> {
    candidates
        .iter()
        .unique()
        .filter(|address| !rules.is_excluded(address))
        .cloned()
        .collect()
}

/// The representative address: last survivor, or the sentinel when none survive.
pub fn select_address(candidates: &[String], rules: &AddressRules) -> String {
    surviving_addresses(candidates, rules)
        .pop()
        .unwrap_or_else(|| SENTINEL_ADDRESS.to_string())
}
