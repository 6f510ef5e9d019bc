//! Path resolver (`spec.md` §4.1, component C1).
//!
//! Maps an import specifier plus the importing module's directory to a
//! canonical module key on disk, the way `cribo`'s [`resolver`] maps Python
//! import statements onto first-party/stdlib/third-party files — except this
//! dialect's specifiers are always path-like, so there is no stdlib/
//! third-party classification step.

use std::path::{Path, PathBuf};

use cow_utils::CowUtils;
use log::debug;

use crate::config::Config;
use crate::error::BundleError;

#[derive(Debug)]
pub struct PathResolver {
    root: PathBuf,
    primary_ext: String,
    secondary_ext: String,
}

impl PathResolver {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        Self {
            root,
            primary_ext: config.primary_ext.clone(),
            secondary_ext: config.secondary_ext.clone(),
        }
    }

    /// Resolve `specifier`, imported from a module living in `importer_dir`,
    /// to a canonical module key and the file it was found at.
    pub fn resolve(
        &self,
        specifier: &str,
        importer_dir: &Path,
    ) -> Result<(String, PathBuf), BundleError> {
        let base = if let Some(rest) = specifier.strip_prefix("@/") {
            self.root.join(rest)
        } else if let Some(rest) = specifier.strip_prefix("./") {
            importer_dir.join(rest)
        } else if let Some(rest) = specifier.strip_prefix("../") {
            importer_dir.join(format!("../{rest}"))
        } else {
            importer_dir.join(specifier)
        };

        for candidate in self.candidates(&base) {
            debug!("trying candidate {candidate:?} for specifier `{specifier}`");
            if candidate.is_file() {
                let key = canonicalize_key(&candidate);
                return Ok((key, candidate));
            }
        }

        Err(BundleError::UnresolvedImport {
            specifier: specifier.to_string(),
            importer: importer_dir.to_path_buf(),
        })
    }

    fn candidates(&self, base: &Path) -> Vec<PathBuf> {
        let base_str = base.to_string_lossy().into_owned();
        vec![
            base.to_path_buf(),
            PathBuf::from(format!("{base_str}.{}", self.primary_ext)),
            PathBuf::from(format!("{base_str}.{}", self.secondary_ext)),
            base.join(format!("init.{}", self.primary_ext)),
            base.join(format!("init.{}", self.secondary_ext)),
        ]
    }
}

/// Normalise a filesystem path into the canonical module key used as the
/// primary identifier for a [`crate::module_graph::Module`] (`spec.md` §4.1).
pub fn canonicalize_key(path: &Path) -> String {
    let raw = path.to_string_lossy().cow_replace('\\', "/").into_owned();
    let mut out: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    if raw.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_doubled_separators_and_dotdot() {
        assert_eq!(canonicalize_key(Path::new("a//b/../c")), "a/c");
        assert_eq!(
            canonicalize_key(Path::new("a\\b\\c")),
            canonicalize_key(Path::new("a/b/c"))
        );
    }

    #[test]
    fn is_idempotent() {
        // P5: normalise(normalise(p)) == normalise(p)
        let once = canonicalize_key(Path::new("a/./b/../c/d"));
        let twice = canonicalize_key(Path::new(&once));
        assert_eq!(once, twice);
    }
}
