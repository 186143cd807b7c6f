//! File collaborators around the pipeline: loading raw tables and writing reports.
//!
//! - **Formats**: `.csv`/`.tsv` (and other text) through `csv`, Excel and
//!   OpenDocument workbooks through `calamine`; the first worksheet is read.
//! - **Delimiters**: explicit flag, else `.tsv` → tab, else `.csv` sniffed from
//!   the header line between comma, semicolon and tab.
//! - **Encoding**: inputs decoded with `encoding_rs` (BOM aware, UTF-8 default);
//!   CSV reports re-encoded when another output encoding is requested.
//! - **Reports**: `.xlsx` through `rust_xlsxwriter`, anything else as CSV with
//!   every field quoted.

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::{
    cache::{TableCache, cache_key},
    config::{ReportConfig, StatusLabels},
    data::{Cell, RawTable},
    reconcile::{REPORT_HEADERS, ReportRecord},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const REPORT_SHEET_NAME: &str = "Relatorio";

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const SNIFF_CANDIDATES: &[u8] = b",;\t";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited(u8),
    Spreadsheet,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_spreadsheet(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.as_str()))
}

/// Checks that an input exists, has a supported extension and is within the size limit.
pub fn validate_input_file(path: &Path, config: &ReportConfig) -> Result<()> {
    let metadata = fs::metadata(path).with_context(|| format!("Input file not found: {path:?}"))?;
    if !metadata.is_file() {
        bail!("Input path {path:?} is not a file");
    }
    let ext = extension(path).unwrap_or_default();
    if !config.supports_extension(&ext) {
        bail!(
            "Unsupported file format '{ext}' for {path:?} (supported: {})",
            config.supported_formats.join(", ")
        );
    }
    if metadata.len() > config.max_file_size {
        bail!(
            "Input file {path:?} is too large ({:.1} MB, limit {:.1} MB)",
            metadata.len() as f64 / (1024.0 * 1024.0),
            config.max_file_size as f64 / (1024.0 * 1024.0)
        );
    }
    Ok(())
}

pub fn resolve_input_format(path: &Path, provided: Option<u8>, head: &str) -> InputFormat {
    if is_spreadsheet(path) {
        return InputFormat::Spreadsheet;
    }
    if let Some(delimiter) = provided {
        return InputFormat::Delimited(delimiter);
    }
    match extension(path).as_deref() {
        Some("tsv") => InputFormat::Delimited(DEFAULT_TSV_DELIMITER),
        _ => InputFormat::Delimited(sniff_delimiter(head)),
    }
}

/// Picks the candidate delimiter that occurs most often in the first line.
pub fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    SNIFF_CANDIDATES
        .iter()
        .copied()
        .map(|candidate| {
            let count = first_line.bytes().filter(|b| *b == candidate).count();
            (candidate, count)
        })
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(candidate, count)| (*count, *candidate == DEFAULT_CSV_DELIMITER))
        .map(|(candidate, _)| candidate)
        .unwrap_or(DEFAULT_CSV_DELIMITER)
}

/// Loads `path` into a [`RawTable`], consulting `cache` by content digest first.
pub fn read_table(
    path: &Path,
    options: &ReadOptions,
    cache: &mut dyn TableCache,
) -> Result<RawTable> {
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    let head = if is_spreadsheet(path) {
        String::new()
    } else {
        decode_text(&bytes, options.encoding)?
    };
    let format = resolve_input_format(path, options.delimiter, &head);
    let variant = match format {
        InputFormat::Delimited(delimiter) => {
            format!("delimited:{delimiter}:{}", options.encoding.name())
        }
        InputFormat::Spreadsheet => "spreadsheet".to_string(),
    };
    let key = cache_key(&bytes, &variant);
    if let Some(table) = cache.get(&key) {
        debug!("Reusing decoded table for {path:?}");
        return Ok(table);
    }

    let table = match format {
        InputFormat::Delimited(delimiter) => parse_delimited(&head, delimiter),
        InputFormat::Spreadsheet => parse_spreadsheet(bytes),
    }
    .with_context(|| format!("Parsing {path:?}"))?;
    if table.is_empty() {
        bail!("Input file {path:?} has no data rows");
    }
    info!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        table.row_count(),
        table.headers.len(),
        path
    );
    cache.put(key, table.clone());
    Ok(table)
}

pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        bail!("Failed to decode text with encoding {}", used.name());
    }
    Ok(text.into_owned())
}

/// Parses delimited text with a header row. Blank lines are skipped.
pub fn parse_delimited(text: &str, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .context("Reading header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let mut table = RawTable::new(headers);
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let line = record
            .position()
            .map_or(row_idx + 2, |position| position.line() as usize);
        let row = record.iter().map(Cell::text).collect::<Vec<_>>();
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row_at(row, line);
    }
    Ok(table)
}

/// Reads the first worksheet of a workbook; its first row is the header.
pub fn parse_spreadsheet(bytes: Vec<u8>) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| anyhow!("Failed to open workbook: {err}"))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook contains no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|err| anyhow!("Failed to read sheet '{sheet}': {err}"))?;
    let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        bail!("Sheet '{sheet}' is empty");
    };
    let headers = header
        .iter()
        .map(|data| spreadsheet_cell(data).as_display().trim().to_string())
        .collect::<Vec<_>>();
    let mut table = RawTable::new(headers);
    for (offset, row) in rows.enumerate() {
        let cells = row.iter().map(spreadsheet_cell).collect::<Vec<_>>();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row_at(cells, first_line + offset + 1);
    }
    debug!("Read sheet '{sheet}' with {} data row(s)", table.row_count());
    Ok(table)
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(text) => Cell::text(text.as_str()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::text(if *value { "TRUE" } else { "FALSE" }),
        other => Cell::text(other.to_string()),
    }
}

/// Writes the report as `.xlsx` or delimited text depending on the extension.
pub fn write_report(
    path: &Path,
    records: &[ReportRecord],
    labels: &StatusLabels,
    options: &WriteOptions,
) -> Result<()> {
    let written = match extension(path).as_deref() {
        Some("xlsx") => write_xlsx(path, records, labels),
        Some("tsv") => write_delimited(
            path,
            records,
            labels,
            options.delimiter.unwrap_or(DEFAULT_TSV_DELIMITER),
            options.encoding,
        ),
        Some(ext) if is_spreadsheet(path) => {
            bail!("Reports can be written as .xlsx, .csv or .tsv, not .{ext}")
        }
        _ => write_delimited(
            path,
            records,
            labels,
            options.delimiter.unwrap_or(DEFAULT_CSV_DELIMITER),
            options.encoding,
        ),
    };
    written.with_context(|| format!("Writing report to {path:?}"))
}

fn write_delimited(
    path: &Path,
    records: &[ReportRecord],
    labels: &StatusLabels,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(Vec::new());
    writer
        .write_record(REPORT_HEADERS)
        .context("Writing report headers")?;
    for record in records {
        writer
            .write_record(record.to_row(labels))
            .context("Writing report row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing report: {}", err.error()))?;
    fs::write(path, encode_output(bytes, encoding)?)
        .with_context(|| format!("Creating output file {path:?}"))?;
    Ok(())
}

fn encode_output(bytes: Vec<u8>, encoding: &'static Encoding) -> Result<Vec<u8>> {
    if encoding == UTF_8 {
        return Ok(bytes);
    }
    let text = String::from_utf8(bytes).context("Report is not valid UTF-8")?;
    let (encoded, _, had_errors) = encoding.encode(&text);
    if had_errors {
        bail!("Report contains characters that {} cannot encode", encoding.name());
    }
    Ok(encoded.into_owned())
}

fn write_xlsx(path: &Path, records: &[ReportRecord], labels: &StatusLabels) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET_NAME).map_err(xlsx_error)?;
    let header_format = Format::new().set_bold();
    for (col, header) in REPORT_HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(xlsx_error)?;
    }
    for (idx, record) in records.iter().enumerate() {
        let row = u32::try_from(idx + 1).context("Report exceeds the worksheet row limit")?;
        worksheet.write_string(row, 0, &record.item).map_err(xlsx_error)?;
        worksheet
            .write_string(row, 1, &record.description)
            .map_err(xlsx_error)?;
        worksheet
            .write_string(row, 2, &record.address)
            .map_err(xlsx_error)?;
        worksheet.write_string(row, 3, &record.key).map_err(xlsx_error)?;
        worksheet
            .write_number(row, 4, record.unallocated_quantity)
            .map_err(xlsx_error)?;
        worksheet
            .write_number(row, 5, record.current_quantity)
            .map_err(xlsx_error)?;
        worksheet
            .write_string(row, 6, record.status.label(labels))
            .map_err(xlsx_error)?;
    }
    worksheet.autofit();
    workbook.save(path).map_err(xlsx_error)?;
    Ok(())
}

fn xlsx_error(err: XlsxError) -> anyhow::Error {
    anyhow!("Excel writer error: {err}")
}

/// `report.xlsx` → `report_20240131_154500.xlsx`, using local time.
pub fn timestamped_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Relatorio_Rastreabilidade");
    let file_name = match extension(path) {
        Some(ext) => format!("{stem}_{stamp}.{ext}"),
        None => format!("{stem}_{stamp}"),
    };
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_prefers_the_most_frequent_candidate() {
        assert_eq!(sniff_delimiter("Item;Descrição;Qtd Atual\nX;y;1"), b';');
        assert_eq!(sniff_delimiter("Item,Description\n"), b',');
        assert_eq!(sniff_delimiter("Item\tQtd\n"), b'\t');
        assert_eq!(sniff_delimiter("Item\n"), b',');
    }

    #[test]
    fn format_resolution_follows_extension_then_flag() {
        assert_eq!(
            resolve_input_format(Path::new("a.xlsx"), Some(b';'), ""),
            InputFormat::Spreadsheet
        );
        assert_eq!(
            resolve_input_format(Path::new("a.tsv"), None, "a,b"),
            InputFormat::Delimited(b'\t')
        );
        assert_eq!(
            resolve_input_format(Path::new("a.csv"), Some(b'|'), "a;b"),
            InputFormat::Delimited(b'|')
        );
    }

    #[test]
    fn parse_delimited_trims_headers_and_skips_blank_lines() {
        let table = parse_delimited(" Item ;Qtd Atual\nX;1\n;\nY;\n", b';').unwrap();
        assert_eq!(table.headers, vec!["Item", "Qtd Atual"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1), &Cell::Empty);
        assert_eq!((table.line(0), table.line(1)), (2, 4));
    }

    #[test]
    fn decode_text_strips_utf8_bom() {
        let text = decode_text(b"\xEF\xBB\xBFItem\n", UTF_8).unwrap();
        assert_eq!(text, "Item\n");
    }

    #[test]
    fn timestamped_path_keeps_directory_and_extension() {
        let path = timestamped_path(Path::new("out/report.csv"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("report_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(path.parent(), Some(Path::new("out")));
    }

    #[test]
    fn non_utf8_output_encoding_is_applied() {
        let encoded = encode_output("Endereço".as_bytes().to_vec(), encoding_rs::WINDOWS_1252)
            .unwrap();
        assert_eq!(encoded, b"Endere\xE7o".to_vec());
    }
}
