#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use trace_recon::{SourceTables, data::RawTable};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("write temp file bytes");
        path
    }
}

pub fn status_table(rows: &[&[&str]]) -> RawTable {
    RawTable::from_strings(&["Item", "Description", "Quantidade Não Alocada"], rows)
}

pub fn origin_destination_table(rows: &[&[&str]]) -> RawTable {
    RawTable::from_strings(&["Item", "Endereço Origem", "Endereço Destino"], rows)
}

pub fn stock_table(rows: &[&[&str]]) -> RawTable {
    RawTable::from_strings(&["Item", "Qtd Atual"], rows)
}

pub fn sources(status: RawTable, traceability: RawTable, stock: RawTable) -> SourceTables {
    SourceTables {
        status,
        traceability,
        stock,
    }
}
