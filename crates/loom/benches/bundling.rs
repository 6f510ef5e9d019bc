//! Bundling throughput benchmark, gated behind the `bench` feature the way
//! `cribo`'s own `[[bench]]` targets are (`Cargo.toml`'s
//! `required-features = ["bench"]`).

use criterion::{criterion_group, criterion_main, Criterion};
use loom::{Bundler, Config};
use std::fs;
use tempfile::TempDir;

/// A synthetic fan-in: one shared `base` module, `width` leaf modules that
/// each import it and export a function, and an entry that imports every
/// leaf — representative of a mid-sized project's import graph without
/// needing any fixture files checked into the repo.
fn write_fixture(width: usize) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("base.lua"),
        "export local function identity(x)\n  return x\nend",
    )
    .expect("write base");

    let mut entry = String::new();
    for i in 0..width {
        let leaf = format!(
            "import identity from \"./base\"\nexport local function leaf{i}(x)\n  return identity(x) + {i}\nend"
        );
        fs::write(dir.path().join(format!("leaf{i}.lua")), leaf).expect("write leaf");
        entry.push_str(&format!("import leaf{i} from \"./leaf{i}\"\n"));
    }
    for i in 0..width {
        entry.push_str(&format!("print(leaf{i}({i}))\n"));
    }
    fs::write(dir.path().join("main.lua"), entry).expect("write entry");
    dir
}

fn bench_bundling(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundling");
    for width in [8, 32, 128] {
        let dir = write_fixture(width);
        let entry = dir.path().join("main.lua");
        group.bench_function(format!("fan_in_{width}_modules"), |b| {
            b.iter(|| {
                Bundler::new(Config::default())
                    .bundle(&entry)
                    .expect("bundle succeeds")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bundling);
criterion_main!(benches);
