//! Performance benchmarks for the extension host.
//!
//! Run with: cargo bench
//!
//! Target performance:
//! - Static metadata scan: < 50µs per unit
//! - Key dispatch across 20 extensions: < 100µs

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scc::cli::headless::HeadlessHost;
use scc::extensions::metadata;
use scc::extensions::{
    Extension, ExtensionContext, ExtensionHostConfig, ExtensionManager, FactoryRegistry, KeyEvent,
    KeyOutcome,
};

const UNIT: &str = r#"
name = "File Backup"
version = "1.1.0"
description = "Auto-saves a .bak copy on every save. Skips if content unchanged."
author = "SCC Team"
icon = "💾"
category = "Tools"
tags = ["backup", "save", "safety"]
entry = "file-backup"

[settings]
backup_dir = ""
max_backups = 5
"#;

/// Benchmark the regex metadata scan used by the marketplace.
fn bench_metadata_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata_scan");

    group.bench_function("full_unit", |b| {
        b.iter(|| black_box(metadata::scan("file_backup", black_box(UNIT))))
    });

    // Worst case: nothing declared, every pattern misses.
    let filler = "// nothing to see here\n".repeat(200);
    group.bench_function("no_declarations", |b| {
        b.iter(|| black_box(metadata::scan("filler", black_box(&filler))))
    });

    group.finish();
}

struct Counter;

impl Extension for Counter {
    fn activate(&mut self, _cx: &mut ExtensionContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_key(&mut self, cx: &mut ExtensionContext<'_>, _event: &KeyEvent) -> anyhow::Result<KeyOutcome> {
        black_box(cx.id());
        Ok(KeyOutcome::Pass)
    }
}

/// Benchmark key dispatch fan-out for growing extension counts.
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_key");

    for count in [1usize, 5, 20] {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = ExtensionHostConfig::new(temp.path().join("ext"), temp.path().join("market"));
        fs::create_dir_all(&config.install_dir).expect("install dir");
        for i in 0..count {
            fs::write(config.install_dir.join(format!("ext{i:02}.ext")), "entry = \"counter\"\n")
                .expect("write unit");
        }

        let mut registry = FactoryRegistry::new();
        registry.register("counter", |_| Ok(Box::new(Counter) as Box<dyn Extension>));
        let mut manager = ExtensionManager::initialize(HeadlessHost::quiet(), config, registry);
        let event = KeyEvent::new("a");

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(manager.dispatch_key(black_box(&event))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_metadata_scan, bench_dispatch);

criterion_main!(benches);
