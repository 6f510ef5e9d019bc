//! Bundler configuration (`spec.md` §6, "Bundler entry point").
//!
//! Mirrors `cribo`'s `Config`: a plain, `Default`-able, `serde`-deserialisable
//! struct loadable from a project-local TOML file and overridable by CLI
//! flags, with CLI values always winning.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

/// Identifier-mangling strategy forwarded to [`crate::mangler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MangleMode {
    #[default]
    None,
    Mangle,
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the entry module's specifiers beginning with `@/` resolve
    /// against. Auto-populated from the entry file's parent if unset.
    pub root: Option<PathBuf>,
    /// Primary source extension tried by the path resolver (C1).
    pub primary_ext: String,
    /// Secondary source extension, tried after the primary one.
    pub secondary_ext: String,
    /// Textual `name -> replacement` substitutions applied before parsing.
    pub define: IndexMap<String, String>,
    pub minify: bool,
    pub mangle: MangleMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            primary_ext: "lua".to_string(),
            secondary_ext: "luau".to_string(),
            define: IndexMap::new(),
            minify: false,
            mangle: MangleMode::None,
        }
    }
}

impl Config {
    /// Load `loom.toml` from `dir` if present, layering it on top of
    /// [`Config::default`]. Absence of the file is not an error.
    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let candidate = dir.join("loom.toml");
        if !candidate.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&candidate)
            .map_err(|e| anyhow::anyhow!("{}: failed to read config: {e}", candidate.display()))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("{}: invalid config: {e}", candidate.display()))?;
        Ok(config)
    }

    pub fn effective_root(&self, entry: &Path) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
