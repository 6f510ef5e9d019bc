//! Import/export surface extractor.
//!
//! Implements the `extract(src) -> (ok, { imports, exports, cleaned_src })`
//! collaborator contract of `spec.md` §6. The surface grammar is line-
//! oriented and regular, so this is a dedicated scanner independent of the
//! full statement parser — mirroring how `cribo`'s own import syntax (a
//! regular, line-anchored extension of Python's `import`) is handled by a
//! lightweight pass ahead of the real parser.

use std::fmt;

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub source_specifier: String,
    pub bindings: Vec<ImportBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportDecl {
    pub names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Extracted {
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
    pub cleaned_src: String,
}

#[derive(Debug)]
pub struct ExtractError {
    pub message: String,
    pub line: usize,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ExtractError {}

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?P<bindings>[^;]+?)\s+from\s+"(?P<spec>[^"]+)"\s*;?\s*$"#)
        .expect("static import regex is valid")
});

static EXPORT_LOCAL_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*)export\s+(local\s+function\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*\(.*)$"#)
        .expect("static export-function regex is valid")
});

static EXPORT_LOCAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\s*)export\s+(local\s+(?P<names>[A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)\b.*)$"#,
    )
    .expect("static export-local regex is valid")
});

static EXPORT_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*export\b").expect("static regex is valid"));

static EXPORT_LOCAL_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*export\s+local\b").expect("static regex is valid"));

/// Scan `src` line by line, pulling out `import`/`export` declarations and
/// producing the cleaned source the real parser consumes.
pub fn extract(src: &str) -> Result<Extracted, ExtractError> {
    let mut imports = Vec::new();
    let mut exports = Vec::new();
    let mut cleaned_lines = Vec::with_capacity(src.lines().count());

    for (idx, line) in src.lines().enumerate() {
        let lineno = idx + 1;

        if EXPORT_KEYWORD_RE.is_match(line) && !EXPORT_LOCAL_KEYWORD_RE.is_match(line) {
            return Err(ExtractError {
                message: "`export` must be followed by `local` (exports without `local` are not \
                          permitted)"
                    .to_string(),
                line: lineno,
            });
        }

        if let Some(caps) = IMPORT_RE.captures(line) {
            let spec = caps["spec"].to_string();
            let bindings = parse_bindings(&caps["bindings"], lineno)?;
            imports.push(ImportDecl {
                source_specifier: spec,
                bindings,
            });
            // Drop the whole line but keep the line count stable so that
            // diagnostics from the downstream parser still line up.
            cleaned_lines.push(String::new());
            continue;
        }

        if let Some(caps) = EXPORT_LOCAL_FUNCTION_RE.captures(line) {
            let name = caps["name"].to_string();
            exports.push(ExportDecl { names: vec![name] });
            let indent = &caps[1];
            cleaned_lines.push(format!("{indent}{}", &caps[2]));
            continue;
        }

        if let Some(caps) = EXPORT_LOCAL_RE.captures(line) {
            let names: Vec<String> = caps["names"]
                .split(',')
                .map(|n| n.trim().to_string())
                .collect();
            exports.push(ExportDecl { names });
            let indent = &caps[1];
            cleaned_lines.push(format!("{indent}{}", &caps[2]));
            continue;
        }

        cleaned_lines.push(line.to_string());
    }

    Ok(Extracted {
        imports,
        exports,
        cleaned_src: cleaned_lines.join("\n"),
    })
}

fn parse_bindings(raw: &str, line: usize) -> Result<Vec<ImportBinding>, ExtractError> {
    let raw = raw.trim();
    let inner = if let Some(stripped) = raw.strip_prefix('{') {
        stripped.strip_suffix('}').unwrap_or(stripped)
    } else {
        raw
    };
    let mut bindings = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut words = part.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| ExtractError {
                message: "expected a binding name".to_string(),
                line,
            })?
            .to_string();
        let alias = match words.next() {
            Some("as") => words
                .next()
                .ok_or_else(|| ExtractError {
                    message: format!("expected alias after `as` for `{name}`"),
                    line,
                })?
                .to_string(),
            Some(other) => {
                return Err(ExtractError {
                    message: format!("unexpected token `{other}` in import binding"),
                    line,
                });
            }
            None => name.clone(),
        };
        bindings.push(ImportBinding { name, alias });
    }
    if bindings.is_empty() {
        return Err(ExtractError {
            message: "import declares no bindings".to_string(),
            line,
        });
    }
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_import() {
        let out = extract("import add from \"./math\"\nprint(add(2,3))").unwrap();
        assert_eq!(out.imports.len(), 1);
        assert_eq!(out.imports[0].source_specifier, "./math");
        assert_eq!(out.imports[0].bindings[0].name, "add");
        assert_eq!(out.imports[0].bindings[0].alias, "add");
        assert!(out.cleaned_src.starts_with('\n'));
    }

    #[test]
    fn extracts_aliased_import() {
        let out = extract("import veryLongName as v from \"./u\"").unwrap();
        assert_eq!(out.imports[0].bindings[0].name, "veryLongName");
        assert_eq!(out.imports[0].bindings[0].alias, "v");
    }

    #[test]
    fn extracts_export_local_function() {
        let out = extract("export local function add(a, b)\n  return a + b\nend").unwrap();
        assert_eq!(out.exports[0].names, vec!["add".to_string()]);
        assert!(out.cleaned_src.starts_with("local function add(a, b)"));
    }

    #[test]
    fn extracts_export_local_binding() {
        let out = extract("export local config = {a = 1}").unwrap();
        assert_eq!(out.exports[0].names, vec!["config".to_string()]);
        assert_eq!(out.cleaned_src, "local config = {a = 1}");
    }

    #[test]
    fn export_without_local_is_an_error() {
        assert!(extract("export function foo() end").is_err());
    }

    #[test]
    fn multiple_import_bindings() {
        let out = extract("import { a, b as c } from \"./mod\"").unwrap();
        assert_eq!(out.imports[0].bindings.len(), 2);
        assert_eq!(out.imports[0].bindings[1].alias, "c");
    }
}
