pub mod address;
pub mod cache;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod inspect;
pub mod io_utils;
pub mod pipeline;
pub mod prepare;
pub mod reconcile;
pub mod report;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    error::{SchemaError, Warning},
    pipeline::{Pipeline, PipelineOutput, SourceTables},
};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Level for this crate's logs when neither `--log-level` nor `RUST_LOG` decides it.
fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn init_logging(verbose: bool, log_level: Option<LevelFilter>) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        match log_level {
            Some(level) => {
                builder.filter_module("trace_recon", level);
            }
            None if env::var("RUST_LOG").is_err() => {
                builder.filter_module("trace_recon", default_level(verbose));
            }
            None => {}
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_level);
    match cli.command {
        Commands::Report(args) => report::execute(&args),
        Commands::Columns(args) => inspect::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
