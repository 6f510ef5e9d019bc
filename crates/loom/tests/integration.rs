//! End-to-end bundling scenarios (`spec.md` §8) run against a real
//! filesystem fixture per test, the way `cribo`'s own integration suite
//! drives `BundleOrchestrator` over `tempfile::TempDir` fixtures rather
//! than in-memory strings.

use std::fs;
use std::path::Path;

use loom::{Bundler, Config};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    if let Some(parent) = Path::new(name).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(dir.join(parent)).expect("create fixture subdir");
        }
    }
    fs::write(dir.join(name), contents).expect("write fixture");
}

fn bundle(dir: &Path, entry: &str) -> String {
    Bundler::new(Config::default())
        .bundle(&dir.join(entry))
        .expect("bundle succeeds")
}

/// S1 — basic import: exactly one declaration of the imported name, called
/// directly from the entry body.
#[test]
fn s1_basic_import() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "math.lua", "export local function add(a, b)\n  return a + b\nend");
    write(dir.path(), "main.lua", "import add from \"./math\"\nprint(add(2, 3))");

    let out = bundle(dir.path(), "main.lua");
    assert_eq!(out.matches("function add").count(), 1, "exactly one declaration of `add`:\n{out}");
    assert!(out.contains("print(add(2, 3))"));
}

/// S2 — alias rename: the imported binding keeps the exporter's spelling,
/// not the importer's local alias, and the alias is rewritten at every use.
#[test]
fn s2_alias_rename() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "u.lua", "export local veryLongName = 1");
    write(dir.path(), "main.lua", "import veryLongName as v from \"./u\"\nprint(v)");

    let out = bundle(dir.path(), "main.lua");
    assert_eq!(out.matches("local veryLongName = 1").count(), 1);
    assert!(out.contains("print(veryLongName)"));
    assert!(!out.contains("print(v)"));
}

/// S3 — conflict cascade: an export colliding with an unrelated module's
/// free identifier is renamed; the untouched module's binding is left alone.
#[test]
fn s3_conflict_cascade() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "a.lua", "export local config = {a = 1}");
    write(
        dir.path(),
        "b.lua",
        "local config = {b = 2}\nexport local function show()\n  return config\nend",
    );
    write(
        dir.path(),
        "main.lua",
        "import config as a_config from \"./a\"\nimport show from \"./b\"\nprint(a_config)\nprint(show())",
    );

    let out = bundle(dir.path(), "main.lua");

    let a_name = declared_name_before(&out, " = {a = 1}");
    let b_name = declared_name_before(&out, " = {b = 2}");
    assert_ne!(a_name, b_name, "the two `config` bindings must not collide:\n{out}");
    assert!(
        out.contains(&format!("return {b_name}")),
        "`show` must still read its own module's binding:\n{out}"
    );
    assert_eq!(out.matches("function show").count(), 1);
}

/// Find the identifier immediately preceding `suffix` in a `local NAME ...`
/// declaration, e.g. `declared_name_before(out, " = {a = 1}")` on
/// `"local config3 = {a = 1}"` returns `"config3"`.
fn declared_name_before(out: &str, suffix: &str) -> String {
    let before = out.find(suffix).map(|idx| &out[..idx]).expect("suffix present");
    let line_start = before.rfind(['\n', ' ']).map_or(0, |idx| idx + 1);
    before[line_start..].to_string()
}

/// S4 — metatable ordering: a module's own statement order is preserved
/// even when one of its later statements is referenced from elsewhere.
#[test]
fn s4_metatable_ordering() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "m.lua",
        "export local T = {}\nT.__index = T\nexport local function make()\n  return setmetatable({}, T)\nend",
    );
    write(dir.path(), "main.lua", "import { T, make } from \"./m\"\nprint(make())");

    let out = bundle(dir.path(), "main.lua");
    let index_pos = out.find("__index = T").expect("__index assignment present");
    let call_pos = out.find("setmetatable").expect("setmetatable call present");
    assert!(index_pos < call_pos, "declaration order within a module must be preserved:\n{out}");
}

/// S5 — circular import: each module exports a function that calls the
/// other at run time (a genuine bidirectional runtime cycle, not just a
/// file-level import cycle), and both declarations are emitted exactly
/// once.
#[test]
fn s5_circular_import() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "a.lua",
        "import { pong } from \"./b\"\nexport local function ping()\n  return pong()\nend",
    );
    write(
        dir.path(),
        "b.lua",
        "import { ping } from \"./a\"\nexport local function pong()\n  return ping() + 1\nend",
    );
    write(dir.path(), "main.lua", "import { ping } from \"./a\"\nprint(ping())");

    let out = bundle(dir.path(), "main.lua");
    assert_eq!(out.matches("function ping").count(), 1);
    assert_eq!(out.matches("function pong").count(), 1);
}

/// S6 — directory/index resolution: `@/lib` resolves to `lib/init.<ext>`.
#[test]
fn s6_directory_index_resolution() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "lib/init.lua", "export local function utils()\n  return 1\nend");
    write(dir.path(), "main.lua", "import utils from \"@/lib\"\nprint(utils())");

    let out = bundle(dir.path(), "main.lua");
    assert_eq!(out.matches("function utils").count(), 1);
}

/// P1 — uniqueness: no two top-level declared names collide in the output,
/// exercised via the same fixture as S3.
#[test]
fn p1_uniqueness_of_top_level_names() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "a.lua", "export local config = {a = 1}");
    write(
        dir.path(),
        "b.lua",
        "local config = {b = 2}\nexport local function show()\n  return config\nend",
    );
    write(
        dir.path(),
        "main.lua",
        "import config as a_config from \"./a\"\nimport show from \"./b\"\nprint(a_config)\nprint(show())",
    );

    let out = bundle(dir.path(), "main.lua");
    let a_name = declared_name_before(&out, " = {a = 1}");
    let b_name = declared_name_before(&out, " = {b = 2}");
    assert_ne!(a_name, b_name);
    assert_eq!(out.matches(&format!("local {a_name} = {{a = 1}}")).count(), 1);
    assert_eq!(out.matches(&format!("local {b_name} = {{b = 2}}")).count(), 1);
}

/// P4 — entry order preservation: the entry module's own statements keep
/// their relative order regardless of import placement.
#[test]
fn p4_entry_order_preserved() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "m.lua", "export local function noop()\nend");
    write(
        dir.path(),
        "main.lua",
        "import noop from \"./m\"\nlocal first = 1\nlocal second = 2\nnoop()",
    );

    let out = bundle(dir.path(), "main.lua");
    let first_pos = out.find("local first = 1").expect("first present");
    let second_pos = out.find("local second = 2").expect("second present");
    assert!(first_pos < second_pos);
}

/// P6 — stability: bundling the same inputs twice produces byte-identical
/// output.
#[test]
fn p6_stable_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "math.lua", "export local function add(a, b)\n  return a + b\nend");
    write(dir.path(), "main.lua", "import add from \"./math\"\nprint(add(2, 3))");

    let first = bundle(dir.path(), "main.lua");
    let second = bundle(dir.path(), "main.lua");
    assert_eq!(first, second);
}

/// P7 — no spurious renames: an identifier that is neither re-declared
/// elsewhere nor imported keeps its original spelling.
#[test]
fn p7_no_spurious_renames() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "main.lua", "local onlyHere = 42\nprint(onlyHere)");

    let out = bundle(dir.path(), "main.lua");
    assert!(out.contains("local onlyHere = 42"));
    assert!(out.contains("print(onlyHere)"));
}

/// Mangle mode shortens bundle-internal names when explicitly requested.
#[test]
fn mangle_mode_is_applied_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "main.lua", "local someVeryDescriptiveName = 1\nprint(someVeryDescriptiveName)");

    let mut config = Config::default();
    config.mangle = loom::config::MangleMode::Mangle;
    let out = Bundler::new(config)
        .bundle(&dir.path().join("main.lua"))
        .expect("bundle succeeds");
    assert!(!out.contains("someVeryDescriptiveName"));
}

/// `auto` only engages mangling once minification is also requested.
#[test]
fn automangle_without_minify_leaves_names_untouched() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "main.lua", "local someVeryDescriptiveName = 1\nprint(someVeryDescriptiveName)");

    let mut config = Config::default();
    config.mangle = loom::config::MangleMode::Auto;
    let out = Bundler::new(config)
        .bundle(&dir.path().join("main.lua"))
        .expect("bundle succeeds");
    assert!(out.contains("someVeryDescriptiveName"));
}
