//! End-to-end reconciliation over three already-decoded tables.
//!
//! All three inputs are prepared before anything is joined, so a
//! [`SchemaError`] in any of them aborts the run without producing a report.

use log::{debug, info, warn};

use crate::{
    columns::SynonymTable,
    config::{AddressRules, ReportConfig},
    data::RawTable,
    error::{SchemaError, Warning},
    prepare,
    reconcile::{self, ReportRecord},
    stats::{self, Stats},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTables {
    pub status: RawTable,
    pub traceability: RawTable,
    pub stock: RawTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub records: Vec<ReportRecord>,
    pub stats: Stats,
    pub warnings: Vec<Warning>,
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    synonyms: SynonymTable,
    rules: AddressRules,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(SynonymTable::builtin().clone(), AddressRules::default())
    }
}

impl Pipeline {
    pub fn new(synonyms: SynonymTable, rules: AddressRules) -> Self {
        Self { synonyms, rules }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.synonyms(), config.address_rules())
    }

    pub fn run(&self, tables: &SourceTables) -> Result<PipelineOutput, SchemaError> {
        let status = prepare::prepare_status(&tables.status, &self.synonyms)?;
        let addresses =
            prepare::prepare_traceability(&tables.traceability, &self.synonyms, &self.rules)?;
        let stock = prepare::prepare_stock(&tables.stock, &self.synonyms)?;
        info!(
            "Prepared {} status, {} traceability and {} stock record(s)",
            status.records.len(),
            addresses.records.len(),
            stock.records.len()
        );

        let mut warnings = status.warnings;
        warnings.extend(addresses.warnings);
        warnings.extend(stock.warnings);

        let reconciled =
            reconcile::reconcile(&status.records, &addresses.records, &stock.records);
        warnings.extend(reconciled.warnings);
        let records = reconciled.records;
        if records.is_empty() {
            warn!("Reconciliation produced no report rows");
            warnings.push(Warning::EmptyResult);
        }
        debug!("Reconciliation finished with {} warning(s)", warnings.len());

        let stats = stats::summarize(&records);
        Ok(PipelineOutput {
            records,
            stats,
            warnings,
        })
    }
}
