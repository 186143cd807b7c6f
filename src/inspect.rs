use anyhow::{Context, Result};
use log::info;

use crate::{
    cache::NoCache,
    cli::ColumnsArgs,
    columns::{ColumnName, HeaderMap},
    config::ReportConfig,
    io_utils::{self, ReadOptions},
    table,
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    let options = ReadOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let raw = io_utils::read_table(&args.input, &options, &mut NoCache)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let headers = HeaderMap::resolve(&raw.headers, &config.synonyms());

    let rows = mapping_rows(&raw.headers, &headers);
    let header_row = ["#", "raw", "normalized", "canonical"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    table::print_table(&header_row, &rows);
    let recognized = rows.iter().filter(|row| row[3] == "yes").count();
    info!(
        "{recognized} of {} column(s) in {:?} map to canonical names",
        raw.headers.len(),
        args.input
    );
    Ok(())
}

/// One row per header: position, raw text, normalized name, and whether it is
/// the column used for its canonical name.
pub fn mapping_rows(raw_headers: &[String], headers: &HeaderMap) -> Vec<Vec<String>> {
    raw_headers
        .iter()
        .zip(headers.names())
        .enumerate()
        .map(|(idx, (raw, name))| {
            let used = match name {
                ColumnName::Canonical(column) if headers.position(*column) == Some(idx) => "yes",
                ColumnName::Canonical(_) => "duplicate",
                ColumnName::Other(_) => "",
            };
            vec![
                (idx + 1).to_string(),
                raw.clone(),
                name.to_string(),
                used.to_string(),
            ]
        })
        .collect()
}
