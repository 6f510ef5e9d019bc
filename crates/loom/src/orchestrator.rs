//! Bundling orchestrator (`spec.md` §6, "Bundler entry point").
//!
//! `Bundler::bundle` threads an entry file through every component in order
//! (C1 → C2 → C3/C4 → C5 → C6 → mangler/printer), the same facade role
//! `cribo`'s `BundleOrchestrator` plays over its own pipeline.

use std::path::Path;

use indexmap::IndexMap;
use log::info;

use crate::allocator;
use crate::config::Config;
use crate::error::BundleError;
use crate::mangler;
use crate::module_graph::ModuleGraphBuilder;
use crate::orderer;
use crate::parser;
use crate::printer;
use crate::resolver::PathResolver;
use crate::rewriter;

pub struct Bundler {
    config: Config,
}

impl Bundler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bundle `entry_path` into a single flattened source string.
    pub fn bundle(&self, entry_path: &Path) -> Result<String, BundleError> {
        let root = self.config.effective_root(entry_path);
        let resolver = PathResolver::new(root, &self.config);
        let modules = ModuleGraphBuilder::new(&resolver, &self.config).build(entry_path)?;
        info!("discovered {} module(s)", modules.len());

        let allocation = allocator::allocate(&modules)?;

        let mut rewritten = IndexMap::new();
        for module in &modules {
            let default_rewrite = allocator::ModuleRewrite::default();
            let rewrite = allocation.module_rewrites.get(&module.key).unwrap_or(&default_rewrite);
            let body = rewriter::rewrite_module(module, rewrite, &allocation.global_rename);
            rewritten.insert(module.key.clone(), body);
        }

        let ordered = orderer::order(&modules, &allocation, &rewritten);

        // A bundler bug in the rewriter or orderer should surface as a
        // bundling error, not as invalid source silently handed to the
        // caller — re-parse the canonical (unmangled, unminified) rendering
        // before producing the requested output shape.
        let beautified = printer::format_beautiful(&ordered);
        parser::parse(&beautified).map_err(|e| BundleError::ReparseError {
            message: e.to_string(),
        })?;

        let mangled = mangler::apply(ordered, self.config.mangle, self.config.minify);
        let output = if self.config.minify {
            printer::format_mini(&mangled)
        } else {
            printer::format_beautiful(&mangled)
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write fixture");
    }

    #[test]
    fn bundles_a_single_file_with_no_imports() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "main.lua", "local x = 1\nreturn x");
        let bundler = Bundler::new(Config::default());
        let out = bundler.bundle(&dir.path().join("main.lua")).expect("bundle succeeds");
        assert!(out.contains("local x = 1"));
    }

    #[test]
    fn bundles_an_import_before_the_entry_that_uses_it() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "helper.lua",
            "export local function add(a, b)\n  return a + b\nend",
        );
        write(
            dir.path(),
            "main.lua",
            "import { add } from \"./helper\"\nreturn add(1, 2)",
        );
        let bundler = Bundler::new(Config::default());
        let out = bundler.bundle(&dir.path().join("main.lua")).expect("bundle succeeds");
        let add_pos = out.find("function").expect("helper function present");
        let call_pos = out.find("(1, 2)").expect("call site present");
        assert!(add_pos < call_pos, "helper declaration must precede its call site");
    }

    #[test]
    fn same_module_out_of_order_declaration_is_brought_forward() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "helper.lua",
            "export local function useFirst()\n  return helper()\nend\nlocal function helper()\n  return 1\nend",
        );
        write(dir.path(), "main.lua", "import useFirst from \"./helper\"\nreturn useFirst()");
        let bundler = Bundler::new(Config::default());
        let out = bundler.bundle(&dir.path().join("main.lua")).expect("bundle succeeds");
        let helper_pos = out.find("function helper").expect("helper declaration present");
        let use_first_pos = out.find("function useFirst").expect("useFirst declaration present");
        assert!(
            helper_pos < use_first_pos,
            "a same-module dependency declared later in the file must be emitted first:\n{out}"
        );
    }

    #[test]
    fn colliding_names_across_modules_are_renamed_not_dropped() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "a.lua", "export local function run()\n  return 1\nend");
        write(dir.path(), "b.lua", "export local function run()\n  return 2\nend");
        write(
            dir.path(),
            "main.lua",
            "import { run as runA } from \"./a\"\nimport { run as runB } from \"./b\"\nreturn runA() + runB()",
        );
        let bundler = Bundler::new(Config::default());
        let out = bundler.bundle(&dir.path().join("main.lua")).expect("bundle succeeds");
        assert!(out.contains("run"));
        assert!(out.contains("run2"));
    }
}
