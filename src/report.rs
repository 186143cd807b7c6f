use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    cache::{MemoryTableCache, TableCache},
    cli::ReportArgs,
    config::ReportConfig,
    data::RawTable,
    error::Warning,
    io_utils::{self, ReadOptions, WriteOptions},
    pipeline::{Pipeline, PipelineOutput, SourceTables},
    reconcile::REPORT_HEADERS,
    stats::Stats,
    table,
};

const MAX_LOGGED_WARNINGS: usize = 20;

pub fn execute(args: &ReportArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let inputs = [
        ("traceability", &args.traceability),
        ("status", &args.status),
        ("stock", &args.stock),
    ];
    for (name, path) in inputs {
        io_utils::validate_input_file(path, &config)
            .with_context(|| format!("Validating {name} file"))?;
    }
    info!("Input files validated");
    if args.validate_only {
        info!("Validation only requested; skipping processing");
        return Ok(());
    }

    let read_options = ReadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    if let Some(delimiter) = args.delimiter {
        debug!(
            "Reading CSV inputs with delimiter '{}'",
            crate::printable_delimiter(delimiter)
        );
    }
    let mut cache = MemoryTableCache::new();
    let tables = SourceTables {
        status: load_source("status", &args.status, &read_options, &config, &mut cache)?,
        traceability: load_source(
            "traceability",
            &args.traceability,
            &read_options,
            &config,
            &mut cache,
        )?,
        stock: load_source("stock", &args.stock, &read_options, &config, &mut cache)?,
    };

    info!("Reconciling sources");
    let output = Pipeline::from_config(&config)
        .run(&tables)
        .context("Reconciling inputs")?;
    log_warnings(&output.warnings);

    let mut output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.default_output));
    if args.timestamp {
        output_path = io_utils::timestamped_path(&output_path);
    }
    let write_options = WriteOptions {
        delimiter: args.output_delimiter,
        encoding: io_utils::resolve_encoding(args.output_encoding.as_deref())?,
    };
    io_utils::write_report(
        &output_path,
        &output.records,
        &config.status_labels,
        &write_options,
    )?;

    log_stats(&output.stats);
    if let Some(rows) = args.preview {
        print_preview(&output, rows, &config);
    }
    if let Some(path) = &args.stats_json {
        let json = serde_json::to_string_pretty(&output.stats).context("Serializing stats")?;
        fs::write(path, json).with_context(|| format!("Writing stats to {path:?}"))?;
        info!("Statistics written to {path:?}");
    }
    info!(
        "Report with {} row(s) written to {:?}",
        output.records.len(),
        output_path
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig> {
    match path {
        Some(path) => {
            let config = ReportConfig::load(path)?;
            info!("Loaded configuration from {path:?}");
            Ok(config)
        }
        None => Ok(ReportConfig::default()),
    }
}

fn load_source(
    name: &str,
    path: &Path,
    options: &ReadOptions,
    config: &ReportConfig,
    cache: &mut dyn TableCache,
) -> Result<RawTable> {
    let table = io_utils::read_table(path, options, cache)
        .with_context(|| format!("Loading {name} file"))?;
    if table.row_count() > config.max_rows_warning {
        warn!(
            "{name} file has {} rows; consider splitting it into smaller files",
            table.row_count()
        );
    }
    debug!("{name} columns: {:?}", table.headers);
    Ok(table)
}

fn log_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    for warning in warnings.iter().take(MAX_LOGGED_WARNINGS) {
        warn!("{warning}");
    }
    if warnings.len() > MAX_LOGGED_WARNINGS {
        let by_issue = warnings
            .iter()
            .filter_map(Warning::issue)
            .counts()
            .into_iter()
            .sorted()
            .map(|(issue, count)| format!("{count} x {issue}"))
            .join("; ");
        warn!(
            "{} more warning(s) not shown ({} in total: {by_issue})",
            warnings.len() - MAX_LOGGED_WARNINGS,
            warnings.len()
        );
    }
}

fn log_stats(stats: &Stats) {
    info!("=== Report statistics ===");
    for row in stats.render_rows() {
        info!("{:<20} {}", row[0], row[1]);
    }
}

fn print_preview(output: &PipelineOutput, rows: usize, config: &ReportConfig) {
    let headers = REPORT_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let preview = output
        .records
        .iter()
        .take(rows)
        .map(|record| record.to_row(&config.status_labels))
        .collect::<Vec<_>>();
    table::print_table(&headers, &preview);
}
