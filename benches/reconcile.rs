use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use encoding_rs::UTF_8;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use trace_recon::{
    Pipeline, SourceTables,
    cache::{MemoryTableCache, NoCache},
    data::RawTable,
    io_utils::{self, ReadOptions},
};

fn generate_tables(items: usize) -> SourceTables {
    let mut status = Vec::with_capacity(items);
    let mut traceability = Vec::with_capacity(items * 3);
    let mut stock = Vec::with_capacity(items);
    for i in 0..items {
        let item = format!("ITEM{i:06}");
        status.push(vec![item.clone(), format!("Part {i}"), ((i % 17) + 1).to_string()]);
        for hop in 0..3 {
            let origin = if hop == 0 {
                format!("A0{i:04}")
            } else {
                format!("B{hop}{i:04}")
            };
            traceability.push(vec![item.clone(), origin, format!("C{hop}{i:04}; D{hop}{i:04}")]);
        }
        stock.push(vec![item, (i % 23).to_string()]);
    }
    SourceTables {
        status: owned_table(&["Item", "Descrição", "Quantidade Não Alocada"], status),
        traceability: owned_table(&["Item", "Endereço Origem", "Endereço Destino"], traceability),
        stock: owned_table(&["Item", "Qtd Atual"], stock),
    }
}

fn owned_table(headers: &[&str], rows: Vec<Vec<String>>) -> RawTable {
    let mut table = RawTable::new(headers.iter().map(|h| h.to_string()).collect());
    for row in rows {
        table.push_row(row.into_iter().map(Into::into).collect());
    }
    table
}

fn write_stock_csv(items: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("estoque.csv");
    let mut file = File::create(&path).expect("create csv");
    writeln!(file, "Item;Descrição;Endereço;Qtd Atual").expect("header");
    for i in 0..items {
        writeln!(file, "ITEM{i:06};Part {i};B{i:05};{}", i % 23).expect("row");
    }
    (temp_dir, path)
}

fn bench_pipeline(c: &mut Criterion) {
    let tables = generate_tables(10_000);
    let pipeline = Pipeline::default();
    c.bench_function("reconcile_10k_items", |b| {
        b.iter(|| pipeline.run(&tables).expect("pipeline"))
    });
}

fn bench_loading(c: &mut Criterion) {
    let (_dir, path) = write_stock_csv(50_000);
    let options = ReadOptions {
        delimiter: None,
        encoding: UTF_8,
    };
    let mut group = c.benchmark_group("load_stock_50k");
    group.bench_function("uncached", |b| {
        b.iter(|| io_utils::read_table(&path, &options, &mut NoCache).expect("read"))
    });
    group.bench_function("cached", |b| {
        b.iter_batched(
            || {
                let mut cache = MemoryTableCache::new();
                io_utils::read_table(&path, &options, &mut cache).expect("warm cache");
                cache
            },
            |mut cache| io_utils::read_table(&path, &options, &mut cache).expect("read"),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_loading);
criterion_main!(benches);
