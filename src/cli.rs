use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile traceability, order-status and stock spreadsheets",
    long_about = None
)]
pub struct Cli {
    /// Log debug details (RUST_LOG still takes precedence)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    /// Log level (off, error, warn, info, debug, trace); overrides -v and RUST_LOG
    #[arg(long = "log-level", global = true, value_parser = parse_log_level)]
    pub log_level: Option<LevelFilter>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the consolidated traceability report from the three source files
    Report(ReportArgs),
    /// Show how the headers of a file map onto canonical columns
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Traceability export (CSV or Excel)
    #[arg(short = 'r', long = "traceability")]
    pub traceability: PathBuf,
    /// Order-status export (CSV or Excel)
    #[arg(short = 's', long = "status")]
    pub status: PathBuf,
    /// Stock inquiry export (CSV or Excel)
    #[arg(short = 'e', long = "stock")]
    pub stock: PathBuf,
    /// Report destination (.xlsx, .csv or .tsv); defaults to the configured name
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// YAML file overriding prefixes, labels, limits and synonyms
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Delimiter for CSV inputs (supports ',', 'tab', ';', '|'); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter for a CSV report (defaults to ',' or tab for .tsv)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of CSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding of a CSV report (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Also write the summary statistics as JSON to this path
    #[arg(long = "stats-json")]
    pub stats_json: Option<PathBuf>,
    /// Print the first N report rows as a table
    #[arg(long, value_name = "ROWS")]
    pub preview: Option<usize>,
    /// Only validate the input files, without processing them
    #[arg(long = "validate-only")]
    pub validate_only: bool,
    /// Append a timestamp to the report file name
    #[arg(long)]
    pub timestamp: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// File whose header row should be inspected
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML config providing extra synonyms
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Delimiter for CSV input; sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    value
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| format!("Unknown log level '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_symbols() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn log_level_is_global_and_case_insensitive() {
        let cli = Cli::try_parse_from([
            "trace-recon",
            "columns",
            "-i",
            "status.csv",
            "--log-level",
            "WARN",
        ])
        .expect("parse");
        assert_eq!(cli.log_level, Some(LevelFilter::Warn));
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn report_args_parse_short_flags() {
        let cli = Cli::try_parse_from([
            "trace-recon",
            "report",
            "-r",
            "trace.csv",
            "-s",
            "status.xlsx",
            "-e",
            "stock.xlsx",
            "--preview",
            "5",
        ])
        .expect("parse");
        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.traceability, PathBuf::from("trace.csv"));
                assert_eq!(args.preview, Some(5));
                assert!(!args.validate_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
