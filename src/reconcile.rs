//! Reconciliation engine.
//!
//! Status records are the base: every one of them yields exactly one report
//! row. Addresses and stock are indexed by item (one entry per item, so the
//! joins cannot fan out) and left-joined in that order. Items with no
//! address get [`SENTINEL_ADDRESS`]; items with no stock get a current
//! quantity of zero.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    address::AddressRecord,
    columns::CanonicalColumn,
    config::{SENTINEL_ADDRESS, StatusLabels},
    data::format_number,
    error::{DataIssue, SourceKind, Warning},
    prepare::{StatusRecord, StockRecord},
};

/// Output header, in output order.
pub const REPORT_HEADERS: [&str; 7] = [
    "Item",
    "Descrição do Item",
    "Endereço",
    "Chave1",
    "Não Alocado",
    "Qnt endereço",
    "Status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StockStatus {
    /// No current stock for an unallocated item.
    #[serde(rename = "VIDA")]
    Vida,
    Sufficient,
    Insufficient,
}

impl StockStatus {
    pub fn classify(unallocated_quantity: f64, current_quantity: f64) -> Self {
        if current_quantity == 0.0 {
            StockStatus::Vida
        } else if current_quantity >= unallocated_quantity {
            StockStatus::Sufficient
        } else {
            StockStatus::Insufficient
        }
    }

    pub fn label<'a>(&self, labels: &'a StatusLabels) -> &'a str {
        match self {
            StockStatus::Vida => &labels.vida,
            StockStatus::Sufficient => &labels.sufficient,
            StockStatus::Insufficient => &labels.insufficient,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub item: String,
    pub description: String,
    pub address: String,
    /// Item immediately followed by address (`Chave1`).
    pub key: String,
    pub unallocated_quantity: f64,
    pub current_quantity: f64,
    pub status: StockStatus,
}

impl ReportRecord {
    pub fn has_address(&self) -> bool {
        self.address != SENTINEL_ADDRESS
    }

    /// Cells in [`REPORT_HEADERS`] order.
    pub fn to_row(&self, labels: &StatusLabels) -> Vec<String> {
        vec![
            self.item.clone(),
            self.description.clone(),
            self.address.clone(),
            self.key.clone(),
            format_number(self.unallocated_quantity),
            format_number(self.current_quantity),
            self.status.label(labels).to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciled {
    pub records: Vec<ReportRecord>,
    pub warnings: Vec<Warning>,
}

pub fn reconcile(
    status: &[StatusRecord],
    addresses: &[AddressRecord],
    stock: &[StockRecord],
) -> Reconciled {
    let address_index = addresses
        .iter()
        .map(|record| (record.item.as_str(), record))
        .collect::<HashMap<_, _>>();
    let stock_index = stock
        .iter()
        .map(|record| (record.item.as_str(), record.current_quantity))
        .collect::<HashMap<_, _>>();

    let mut reconciled = Reconciled::default();
    for (idx, base) in status.iter().enumerate() {
        let item = base.item.trim();
        if item.is_empty() {
            reconciled.warnings.push(Warning::data_quality(
                SourceKind::Status,
                None,
                CanonicalColumn::Item,
                format!("record {}", idx + 1),
                DataIssue::MissingKey,
            ));
            continue;
        }
        let traced = address_index.get(item);
        let address = traced
            .map(|record| record.address.clone())
            .unwrap_or_else(|| SENTINEL_ADDRESS.to_string());
        let description = if base.description.is_empty() {
            traced
                .and_then(|record| record.description.clone())
                .unwrap_or_default()
        } else {
            base.description.clone()
        };
        let current_quantity = stock_index.get(item).copied().unwrap_or(0.0);
        reconciled.records.push(ReportRecord {
            item: item.to_string(),
            key: format!("{item}{address}"),
            description,
            address,
            unallocated_quantity: base.unallocated_quantity,
            current_quantity,
            status: StockStatus::classify(base.unallocated_quantity, current_quantity),
        });
    }
    reconciled
}
