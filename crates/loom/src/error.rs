//! Bundler error kinds (`spec.md` §7).
//!
//! Every kind is fatal to the bundling operation; there is no recovery or
//! partial output. All of them carry the offending file path so the caller
//! (the orchestrator, and ultimately `main`) can report `path: message`
//! without re-deriving context, the way `cribo`'s errors are always
//! propagated with `.context(file)` attached at the point of failure.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BundleError {
    /// C1 found no candidate file for an import specifier.
    UnresolvedImport { specifier: String, importer: PathBuf },
    /// A module file could not be opened or read.
    ReadFailure { path: PathBuf, source: std::io::Error },
    /// The import/export extractor rejected a module's surface syntax.
    ExtractError { path: PathBuf, message: String },
    /// The base-language parser rejected a module's cleaned source.
    ParseError { path: PathBuf, message: String },
    /// Re-parsing beautified output during the minify pipeline failed —
    /// this indicates an internal bug in the rewriter, not a user error.
    ReparseError { message: String },
    /// The conflict-cascade rename loop (C4) could not reach a fixed point
    /// within its guarded iteration budget (`spec.md` §9, open question).
    NameExhaustion { name: String },
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::UnresolvedImport { specifier, importer } => write!(
                f,
                "{}: could not resolve import `{specifier}`",
                importer.display()
            ),
            BundleError::ReadFailure { path, source } => {
                write!(f, "{}: failed to read module: {source}", path.display())
            }
            BundleError::ExtractError { path, message } => {
                write!(f, "{}: {message}", path.display())
            }
            BundleError::ParseError { path, message } => {
                write!(f, "{}: {message}", path.display())
            }
            BundleError::ReparseError { message } => {
                write!(f, "internal error: re-parse of beautified output failed: {message}")
            }
            BundleError::NameExhaustion { name } => write!(
                f,
                "could not find a unique rename for `{name}` within the retry budget"
            ),
        }
    }
}

impl std::error::Error for BundleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BundleError::ReadFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}
