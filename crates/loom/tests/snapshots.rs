//! Snapshot tests for representative bundles, the way `cribo` snapshots its
//! own bundled output via `insta`.

use std::fs;
use std::path::Path;

use insta::assert_snapshot;
use loom::{Bundler, Config};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write fixture");
}

#[test]
fn single_module_beautified_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "main.lua", "local x = 1\nreturn x");

    let out = Bundler::new(Config::default())
        .bundle(&dir.path().join("main.lua"))
        .expect("bundle succeeds");

    assert_snapshot!(out, @r###"
local x = 1
return x
"###);
}

#[test]
fn single_module_minified_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "main.lua", "local x = 1\nreturn x");

    let mut config = Config::default();
    config.minify = true;
    let out = Bundler::new(config)
        .bundle(&dir.path().join("main.lua"))
        .expect("bundle succeeds");

    assert_snapshot!(out, @"local x = 1;return x;");
}

#[test]
fn multi_module_bundle_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "math.lua", "export local function add(a, b)\n  return a + b\nend");
    write(dir.path(), "main.lua", "import add from \"./math\"\nprint(add(2, 3))");

    let out = Bundler::new(Config::default())
        .bundle(&dir.path().join("main.lua"))
        .expect("bundle succeeds");

    assert_snapshot!(out, @r###"
local function add(a, b)
  return a + b
end
print(add(2, 3))
"###);
}
