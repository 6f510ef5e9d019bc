//! Module graph builder (`spec.md` §4.2, component C2).
//!
//! Discovers every module reachable from the entry file by a depth-first
//! walk over import specifiers, the way `cribo`'s own discovery phase walks
//! Python `import`/`from ... import` statements — except here the edges are
//! already explicit `ImportDecl`s handed to us by
//! [`crate::import_export::extract`], so there is no stdlib/third-party
//! branching to do.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::debug;

use crate::ast::Stmt;
use crate::config::Config;
use crate::error::BundleError;
use crate::import_export::{self, ExportDecl, ImportDecl};
use crate::parser;
use crate::resolver::PathResolver;

/// One discovered source file (`spec.md` §3, "Module").
#[derive(Debug, Clone)]
pub struct Module {
    pub key: String,
    pub display_name: String,
    pub directory: PathBuf,
    pub imports: Vec<ImportDecl>,
    /// The module key each entry in `imports` resolves to, same order and
    /// length as `imports` — computed once here by C1 so downstream
    /// consumers (the allocator's alias binding step) never need to re-run
    /// filesystem resolution.
    pub resolved_imports: Vec<String>,
    pub exports: Vec<ExportDecl>,
    pub ast_body: Vec<Stmt>,
    pub is_entry: bool,
    /// Monotonically increasing index assigned at discovery time; the entry
    /// module is always `file_seq == 1`.
    pub file_seq: usize,
}

/// Builds the module set by depth-first discovery from an entry file.
pub struct ModuleGraphBuilder<'a> {
    resolver: &'a PathResolver,
    config: &'a Config,
    visited: IndexSet<String>,
    modules: Vec<Module>,
}

impl<'a> ModuleGraphBuilder<'a> {
    pub fn new(resolver: &'a PathResolver, config: &'a Config) -> Self {
        Self {
            resolver,
            config,
            visited: IndexSet::new(),
            modules: Vec::new(),
        }
    }

    /// Discover the entry module and everything it transitively imports,
    /// returning the modules in discovery order (`file_seq` order).
    pub fn build(mut self, entry_path: &Path) -> Result<Vec<Module>, BundleError> {
        let entry_key = crate::resolver::canonicalize_key(entry_path);
        self.discover(&entry_key, entry_path, true)?;
        Ok(self.modules)
    }

    fn discover(
        &mut self,
        key: &str,
        path: &Path,
        is_entry: bool,
    ) -> Result<(), BundleError> {
        if self.visited.contains(key) {
            return Ok(());
        }
        self.visited.insert(key.to_string());
        debug!("discovering module `{key}` at {path:?}");

        let raw = std::fs::read_to_string(path).map_err(|e| BundleError::ReadFailure {
            path: path.to_path_buf(),
            source: e,
        })?;
        let raw = if is_entry { strip_shebang(&raw) } else { raw };
        let substituted = apply_defines(&raw, &self.config.define);

        let extracted = import_export::extract(&substituted).map_err(|e| BundleError::ExtractError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let ast_body = parser::parse(&extracted.cleaned_src).map_err(|e| BundleError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.to_string());

        let mut children = Vec::new();
        for import in &extracted.imports {
            let (child_key, child_path) = self
                .resolver
                .resolve(&import.source_specifier, &directory)?;
            children.push((child_key, child_path));
        }

        let resolved_imports = children.iter().map(|(k, _)| k.clone()).collect();

        self.modules.push(Module {
            key: key.to_string(),
            display_name,
            directory,
            imports: extracted.imports,
            resolved_imports,
            exports: extracted.exports,
            ast_body,
            is_entry,
            file_seq: self.modules.len() + 1,
        });

        for (child_key, child_path) in children {
            self.discover(&child_key, &child_path, false)?;
        }
        Ok(())
    }
}

fn strip_shebang(src: &str) -> String {
    if let Some(rest) = src.strip_prefix("#!") {
        if let Some(idx) = rest.find('\n') {
            return rest[idx + 1..].to_string();
        }
        return String::new();
    }
    src.to_string()
}

/// Literal `name -> replacement` textual substitution, applied before any
/// parsing (`spec.md` §6). Order of `define` keys must not matter in
/// correct usage; we apply the longest names first so that one replacement
/// can never truncate another's match.
fn apply_defines(src: &str, define: &indexmap::IndexMap<String, String>) -> String {
    if define.is_empty() {
        return src.to_string();
    }
    let mut names: Vec<&String> = define.keys().collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    let mut out = src.to_string();
    for name in names {
        out = out.replace(name.as_str(), &define[name]);
    }
    out
}
