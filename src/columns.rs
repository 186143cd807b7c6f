//! Column-name normalization.
//!
//! Source spreadsheets spell the same field many ways ("Descrição do Item",
//! "descricao", "Description"). [`SynonymTable`] maps every known spelling to a
//! [`CanonicalColumn`]; anything it does not know passes through as
//! [`ColumnName::Other`] with whitespace and casing tidied up. A header row is
//! resolved once into a [`HeaderMap`] so rows never re-run the matching.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::OnceLock,
};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SourceKind};

/// Bumped whenever [`SYNONYMS`] gains or loses an entry.
pub const SYNONYM_TABLE_VERSION: u32 = 1;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CanonicalColumn {
    Item,
    Description,
    AddressOrigin,
    AddressDestination,
    Address,
    UnallocatedQuantity,
    CurrentQuantity,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 7] = [
        CanonicalColumn::Item,
        CanonicalColumn::Description,
        CanonicalColumn::AddressOrigin,
        CanonicalColumn::AddressDestination,
        CanonicalColumn::Address,
        CanonicalColumn::UnallocatedQuantity,
        CanonicalColumn::CurrentQuantity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalColumn::Item => "Item",
            CanonicalColumn::Description => "Description",
            CanonicalColumn::AddressOrigin => "AddressOrigin",
            CanonicalColumn::AddressDestination => "AddressDestination",
            CanonicalColumn::Address => "Address",
            CanonicalColumn::UnallocatedQuantity => "UnallocatedQuantity",
            CanonicalColumn::CurrentQuantity => "CurrentQuantity",
        }
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known spellings per canonical column, written in match-key form
/// (lowercase, no accents, single spaces).
pub const SYNONYMS: &[(CanonicalColumn, &[&str])] = &[
    (
        CanonicalColumn::Item,
        &[
            "item",
            "itens",
            "cod item",
            "codigo item",
            "codigo do item",
            "item code",
            "item number",
        ],
    ),
    (
        CanonicalColumn::Description,
        &[
            "description",
            "descricao",
            "descricao do item",
            "item description",
            "desc",
        ],
    ),
    (
        CanonicalColumn::AddressOrigin,
        &[
            "endereco origem",
            "endereco de origem",
            "origem",
            "address origin",
            "origin address",
        ],
    ),
    (
        CanonicalColumn::AddressDestination,
        &[
            "endereco destino",
            "endereco de destino",
            "destino",
            "address destination",
            "destination address",
        ],
    ),
    (
        CanonicalColumn::Address,
        &["endereco", "enderecos", "address", "localizacao", "location"],
    ),
    (
        CanonicalColumn::UnallocatedQuantity,
        &[
            "quantidade nao alocada",
            "qtd nao alocada",
            "qtde nao alocada",
            "qnt nao alocada",
            "nao alocado",
            "unallocated quantity",
            "unallocated qty",
        ],
    ),
    (
        CanonicalColumn::CurrentQuantity,
        &[
            "qtd atual",
            "qtde atual",
            "qnt atual",
            "quantidade atual",
            "qnt endereco",
            "current quantity",
            "current qty",
        ],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnName {
    Canonical(CanonicalColumn),
    Other(String),
}

impl ColumnName {
    pub fn canonical(&self) -> Option<CanonicalColumn> {
        match self {
            ColumnName::Canonical(column) => Some(*column),
            ColumnName::Other(_) => None,
        }
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnName::Canonical(column) => f.write_str(column.as_str()),
            ColumnName::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    entries: HashMap<String, CanonicalColumn>,
}

impl SynonymTable {
    /// The built-in table, shared across calls.
    pub fn builtin() -> &'static SynonymTable {
        static BUILTIN: OnceLock<SynonymTable> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let entries = SYNONYMS
                .iter()
                .flat_map(|(column, spellings)| {
                    spellings
                        .iter()
                        .map(move |spelling| (match_key(spelling), *column))
                })
                .collect();
            SynonymTable { entries }
        })
    }

    /// Built-in table extended with caller-supplied spellings. Built-in
    /// spellings keep their meaning when an extra one collides with them.
    pub fn with_extra(extra: &BTreeMap<CanonicalColumn, Vec<String>>) -> SynonymTable {
        let mut table = Self::builtin().clone();
        for (column, spellings) in extra {
            for spelling in spellings {
                let key = match_key(spelling);
                if key.is_empty() {
                    continue;
                }
                match table.entries.get(&key) {
                    Some(existing) if existing != column => {
                        debug!(
                            "Ignoring extra synonym '{spelling}' for {column}: already maps to {existing}"
                        );
                    }
                    _ => {
                        table.entries.insert(key, *column);
                    }
                }
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, raw: &str) -> Option<CanonicalColumn> {
        self.entries.get(&match_key(raw)).copied()
    }

    pub fn normalize(&self, raw: &str) -> ColumnName {
        match self.lookup(raw) {
            Some(column) => ColumnName::Canonical(column),
            None => ColumnName::Other(title_case(raw)),
        }
    }
}

/// Normalizes a raw header against the built-in synonym table.
pub fn normalize(raw: &str) -> ColumnName {
    SynonymTable::builtin().normalize(raw)
}

/// Key used for synonym lookup: lowercase, accents folded, `_ - . /` read as
/// spaces, whitespace collapsed.
pub fn match_key(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .map(|c| match c {
            '_' | '-' | '.' | '/' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Collapses whitespace and title-cases each word, keeping accents.
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// A header row resolved to column names, with the position of each canonical
/// column. When two headers resolve to the same canonical column the first wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    names: Vec<ColumnName>,
    positions: HashMap<CanonicalColumn, usize>,
}

impl HeaderMap {
    pub fn resolve(headers: &[String], synonyms: &SynonymTable) -> Self {
        let names = headers
            .iter()
            .map(|header| synonyms.normalize(header))
            .collect::<Vec<_>>();
        let mut positions = HashMap::new();
        for (idx, name) in names.iter().enumerate() {
            let Some(column) = name.canonical() else {
                continue;
            };
            if let Some(first) = positions.get(&column) {
                debug!(
                    "Header '{}' also maps to {column}; keeping column {}",
                    headers[idx],
                    first + 1
                );
                continue;
            }
            positions.insert(column, idx);
        }
        Self { names, positions }
    }

    pub fn names(&self) -> &[ColumnName] {
        &self.names
    }

    pub fn position(&self, column: CanonicalColumn) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn contains(&self, column: CanonicalColumn) -> bool {
        self.positions.contains_key(&column)
    }

    /// Positions of `columns`, in order, or a [`SchemaError`] naming every absent one.
    pub fn require(
        &self,
        table: SourceKind,
        columns: &[CanonicalColumn],
    ) -> Result<Vec<usize>, SchemaError> {
        let missing = columns
            .iter()
            .filter(|column| !self.contains(**column))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(SchemaError::new(table, missing));
        }
        Ok(columns
            .iter()
            .filter_map(|column| self.position(*column))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_accented_and_plain_spellings_together() {
        for raw in ["Descrição do Item", "descricao do item", "  DESCRIÇÃO ", "Description"] {
            assert_eq!(
                normalize(raw),
                ColumnName::Canonical(CanonicalColumn::Description),
                "{raw}"
            );
        }
        assert_eq!(
            normalize("Quantidade Não Alocada"),
            ColumnName::Canonical(CanonicalColumn::UnallocatedQuantity)
        );
        assert_eq!(
            normalize("Endereço_Origem"),
            ColumnName::Canonical(CanonicalColumn::AddressOrigin)
        );
    }

    #[test]
    fn unknown_columns_pass_through_title_cased() {
        assert_eq!(
            normalize("  lote   de  FABRICAÇÃO "),
            ColumnName::Other("Lote De Fabricação".to_string())
        );
    }

    #[test]
    fn every_synonym_is_already_in_match_key_form() {
        for (_, spellings) in SYNONYMS {
            for spelling in *spellings {
                assert_eq!(&match_key(spelling), spelling);
            }
        }
    }

    #[test]
    fn synonyms_do_not_overlap_between_columns() {
        let total = SYNONYMS.iter().map(|(_, s)| s.len()).sum::<usize>();
        assert_eq!(SynonymTable::builtin().len(), total);
    }

    #[test]
    fn extra_synonyms_extend_without_overriding_builtins() {
        let mut extra = BTreeMap::new();
        extra.insert(
            CanonicalColumn::CurrentQuantity,
            vec!["Saldo".to_string(), "Item".to_string()],
        );
        let table = SynonymTable::with_extra(&extra);
        assert_eq!(table.lookup("SALDO"), Some(CanonicalColumn::CurrentQuantity));
        assert_eq!(table.lookup("item"), Some(CanonicalColumn::Item));
    }

    #[test]
    fn header_map_keeps_first_duplicate_and_reports_missing() {
        let headers = vec![
            "Item".to_string(),
            "Descrição".to_string(),
            "Descrição do Item".to_string(),
        ];
        let map = HeaderMap::resolve(&headers, SynonymTable::builtin());
        assert_eq!(map.position(CanonicalColumn::Description), Some(1));
        let err = map
            .require(
                SourceKind::Status,
                &[CanonicalColumn::Item, CanonicalColumn::UnallocatedQuantity],
            )
            .unwrap_err();
        assert_eq!(err.missing, vec![CanonicalColumn::UnallocatedQuantity]);
        assert_eq!(
            map.require(SourceKind::Status, &[CanonicalColumn::Description, CanonicalColumn::Item])
                .unwrap(),
            vec![1, 0]
        );
    }
}
