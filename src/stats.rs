use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::{
    data::format_number,
    reconcile::{ReportRecord, StockStatus},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub vida_count: usize,
    /// Rows with a positive unallocated quantity; equals `total` by construction.
    pub allocated_count: usize,
    /// Distinct addresses, not counting the sentinel.
    pub unique_address_count: usize,
    pub with_quantity_count: usize,
    pub status_counts: BTreeMap<StockStatus, usize>,
    pub unallocated_total: String,
}

pub fn summarize(records: &[ReportRecord]) -> Stats {
    let mut status_counts = BTreeMap::new();
    for record in records {
        *status_counts.entry(record.status).or_insert(0) += 1;
    }
    let unique_address_count = records
        .iter()
        .filter(|record| record.has_address())
        .map(|record| record.address.as_str())
        .collect::<HashSet<_>>()
        .len();
    Stats {
        total: records.len(),
        vida_count: status_counts
            .get(&StockStatus::Vida)
            .copied()
            .unwrap_or_default(),
        allocated_count: records
            .iter()
            .filter(|record| record.unallocated_quantity > 0.0)
            .count(),
        unique_address_count,
        with_quantity_count: records
            .iter()
            .filter(|record| record.current_quantity > 0.0)
            .count(),
        status_counts,
        unallocated_total: format_number(
            records
                .iter()
                .map(|record| record.unallocated_quantity)
                .sum::<f64>(),
        ),
    }
}

impl Stats {
    /// `(metric, value)` rows for tabular display.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["total".to_string(), self.total.to_string()],
            vec!["vida".to_string(), self.vida_count.to_string()],
            vec!["allocated".to_string(), self.allocated_count.to_string()],
            vec![
                "unique_addresses".to_string(),
                self.unique_address_count.to_string(),
            ],
            vec![
                "with_quantity".to_string(),
                self.with_quantity_count.to_string(),
            ],
            vec![
                "unallocated_total".to_string(),
                self.unallocated_total.clone(),
            ],
        ];
        for (status, count) in &self.status_counts {
            rows.push(vec![
                format!("status:{}", status_name(*status)),
                count.to_string(),
            ]);
        }
        rows
    }
}

fn status_name(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Vida => "vida",
        StockStatus::Sufficient => "sufficient",
        StockStatus::Insufficient => "insufficient",
    }
}
