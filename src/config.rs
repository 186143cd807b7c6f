//! Report configuration.
//!
//! Every knob has a default matching the spreadsheets the tool was built for,
//! so a config file is optional. When given, it is YAML and may set any subset
//! of the fields:
//!
//! ```yaml
//! forbidden_prefix: A0
//! status_labels:
//!   vida: VIDA
//!   insufficient: FALTA
//! extra_synonyms:
//!   CurrentQuantity: [Saldo]
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::columns::{CanonicalColumn, SynonymTable};

/// Placeholder address for items with no usable traceability address.
pub const SENTINEL_ADDRESS: &str = "Sem Rastreabilidade";
pub const DEFAULT_FORBIDDEN_PREFIX: &str = "A0";
pub const DEFAULT_OUTPUT_NAME: &str = "Relatorio_Rastreabilidade_Final.xlsx";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;
pub const DEFAULT_MAX_ROWS_WARNING: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusLabels {
    /// Unallocated item with no current stock.
    pub vida: String,
    /// Current stock covers the unallocated quantity.
    pub sufficient: String,
    /// Current stock is positive but below the unallocated quantity.
    pub insufficient: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            vida: "VIDA".to_string(),
            sufficient: String::new(),
            insufficient: String::new(),
        }
    }
}

/// Rules the address consolidator applies to every candidate address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRules {
    pub forbidden_prefix: String,
    pub separators: Vec<char>,
    pub split_on_whitespace: bool,
}

impl AddressRules {
    pub fn is_separator(&self, c: char) -> bool {
        self.separators.contains(&c) || (self.split_on_whitespace && c.is_whitespace())
    }

    pub fn is_excluded(&self, address: &str) -> bool {
        address.starts_with(&self.forbidden_prefix)
    }
}

impl Default for AddressRules {
    fn default() -> Self {
        ReportConfig::default().address_rules()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub forbidden_prefix: String,
    pub status_labels: StatusLabels,
    /// Characters that separate several addresses packed into one cell.
    pub address_separators: String,
    pub split_on_whitespace: bool,
    pub supported_formats: Vec<String>,
    pub max_file_size: u64,
    pub max_rows_warning: usize,
    pub default_output: String,
    pub extra_synonyms: BTreeMap<CanonicalColumn, Vec<String>>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            forbidden_prefix: DEFAULT_FORBIDDEN_PREFIX.to_string(),
            status_labels: StatusLabels::default(),
            address_separators: ";,|/".to_string(),
            split_on_whitespace: false,
            supported_formats: ["csv", "tsv", "xlsx", "xls", "ods"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_rows_warning: DEFAULT_MAX_ROWS_WARNING,
            default_output: DEFAULT_OUTPUT_NAME.to_string(),
            extra_synonyms: BTreeMap::new(),
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Reading config {path:?}"))?;
        let config = Self::from_yaml(&contents).with_context(|| format!("Parsing {path:?}"))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: ReportConfig = if contents.trim().is_empty() {
            ReportConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.forbidden_prefix.is_empty() {
            bail!("forbidden_prefix cannot be empty: it would exclude every address");
        }
        if self.supported_formats.is_empty() {
            bail!("supported_formats must list at least one file extension");
        }
        Ok(())
    }

    pub fn address_rules(&self) -> AddressRules {
        AddressRules {
            forbidden_prefix: self.forbidden_prefix.clone(),
            separators: self.address_separators.chars().collect(),
            split_on_whitespace: self.split_on_whitespace,
        }
    }

    pub fn synonyms(&self) -> SynonymTable {
        SynonymTable::with_extra(&self.extra_synonyms)
    }

    pub fn supports_extension(&self, extension: &str) -> bool {
        self.supported_formats
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
