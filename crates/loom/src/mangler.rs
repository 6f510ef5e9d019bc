//! Identifier mangler (`spec.md` §6, "Bundler entry point" mangle modes).
//!
//! Runs after the emission orderer (C6) has produced one flat top-level
//! statement list, where every binding is already globally unique (`I1`).
//! Mangling is therefore a single renaming pass keyed off that one flat
//! scope rather than the allocator's per-module tables — the same
//! short-name-generation idea terser/esbuild apply as a last minification
//! step, kept separate from the cross-module linking rename C4/C5 perform.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;

use crate::ast::{dotted_path_of, DottedPath, Expr, FunctionBody, ItemKind, Stmt, TableField};
use crate::config::MangleMode;
use crate::lexer::KEYWORDS;

/// Lua/Luau standard-library globals a mangled name must never shadow.
const RESERVED_GLOBALS: &[&str] = &[
    "_G", "_VERSION", "assert", "collectgarbage", "dofile", "error", "getmetatable", "ipairs",
    "load", "loadstring", "next", "pairs", "pcall", "print", "rawequal", "rawget", "rawlen",
    "rawset", "require", "select", "setmetatable", "tonumber", "tostring", "type", "unpack",
    "xpcall", "coroutine", "debug", "io", "math", "os", "package", "string", "table", "utf8",
    "self",
];

const FIRST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
const REST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_0123456789";

/// Apply `mode` to the bundle's final flat statement list. `None` is a
/// no-op; `Mangle` always shortens every bundle-internal binding; `Auto`
/// only does so when `minify` was also requested, since a mangled name is
/// only worth its illegibility once whitespace is being stripped too
/// (`spec.md` §6).
pub fn apply(stmts: Vec<Stmt>, mode: MangleMode, minify: bool) -> Vec<Stmt> {
    match mode {
        MangleMode::None => stmts,
        MangleMode::Mangle => mangle_all(stmts),
        MangleMode::Auto => {
            if minify {
                mangle_all(stmts)
            } else {
                stmts
            }
        }
    }
}

fn mangle_all(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut declared: IndexSet<String> = IndexSet::new();
    for stmt in &stmts {
        match stmt.classify() {
            ItemKind::Function(name) => {
                declared.insert(name);
            }
            ItemKind::LocalBinding(names) => {
                declared.extend(names);
            }
            ItemKind::Method(_) | ItemKind::MemberAssignment(_) | ItemKind::Statement => {}
        }
    }

    let rename = generate_short_names(&declared);
    let mut ctx = MangleCtx {
        rename: &rename,
        shadow: Vec::new(),
    };
    stmts.iter().map(|s| ctx.rewrite_stmt(s, true)).collect()
}

fn generate_short_names(declared: &IndexSet<String>) -> IndexMap<String, String> {
    let reserved: FxHashSet<&str> = KEYWORDS.iter().chain(RESERVED_GLOBALS).copied().collect();
    let mut used: FxHashSet<String> = FxHashSet::default();
    let mut rename = IndexMap::new();
    let mut next_index = 0usize;
    for name in declared {
        let short = loop {
            let candidate = short_name(next_index);
            next_index += 1;
            if !reserved.contains(candidate.as_str()) && !used.contains(&candidate) {
                break candidate;
            }
        };
        used.insert(short.clone());
        rename.insert(name.clone(), short);
    }
    rename
}

/// Bijective base-N short name generator: `0 -> "a"`, ..., `51 -> "_"`,
/// `52 -> "aa"`, and so on, restricted to identifier-legal characters.
fn short_name(mut index: usize) -> String {
    let first_len = FIRST_CHARS.len();
    let mut chars = vec![FIRST_CHARS[index % first_len] as char];
    index /= first_len;
    let rest_len = REST_CHARS.len();
    while index > 0 {
        index -= 1;
        chars.push(REST_CHARS[index % rest_len] as char);
        index /= rest_len;
    }
    chars.into_iter().collect()
}

struct MangleCtx<'a> {
    rename: &'a IndexMap<String, String>,
    shadow: Vec<FxHashSet<String>>,
}

impl MangleCtx<'_> {
    fn resolve(&self, name: &str) -> String {
        if self.shadow.iter().rev().any(|frame| frame.contains(name)) {
            return name.to_string();
        }
        self.rename.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    fn rewrite_stmt(&mut self, stmt: &Stmt, top_level: bool) -> Stmt {
        match stmt {
            Stmt::Local { names, values } => {
                let new_values = values.iter().map(|v| self.rewrite_expr(v)).collect();
                if top_level {
                    Stmt::Local {
                        names: names.iter().map(|n| self.resolve(n)).collect(),
                        values: new_values,
                    }
                } else {
                    if let Some(frame) = self.shadow.last_mut() {
                        frame.extend(names.iter().cloned());
                    }
                    Stmt::Local {
                        names: names.clone(),
                        values: new_values,
                    }
                }
            }
            Stmt::FunctionDecl {
                path,
                is_local,
                is_method,
                body,
            } => {
                let new_path = if path.is_simple() {
                    if top_level {
                        DottedPath::simple(self.resolve(&path.base))
                    } else {
                        if *is_local {
                            if let Some(frame) = self.shadow.last_mut() {
                                frame.insert(path.base.clone());
                            }
                        }
                        path.clone()
                    }
                } else {
                    DottedPath {
                        base: self.resolve(&path.base),
                        segments: path.segments.clone(),
                    }
                };
                let new_body = self.rewrite_function_body(body);
                Stmt::FunctionDecl {
                    path: new_path,
                    is_local: *is_local,
                    is_method: *is_method,
                    body: new_body,
                }
            }
            Stmt::Assign { targets, values } => Stmt::Assign {
                targets: targets.iter().map(|t| self.rewrite_target(t)).collect(),
                values: values.iter().map(|v| self.rewrite_expr(v)).collect(),
            },
            Stmt::ExprStat(expr) => Stmt::ExprStat(self.rewrite_expr(expr)),
            Stmt::Return(values) => Stmt::Return(values.iter().map(|v| self.rewrite_expr(v)).collect()),
            Stmt::Break => Stmt::Break,
            Stmt::Do(body) => Stmt::Do(self.rewrite_nested(body)),
            Stmt::While { cond, body } => Stmt::While {
                cond: self.rewrite_expr(cond),
                body: self.rewrite_nested(body),
            },
            Stmt::Repeat { body, cond } => {
                self.shadow.push(FxHashSet::default());
                let new_body = self.rewrite_in_scope(body);
                let new_cond = self.rewrite_expr(cond);
                self.shadow.pop();
                Stmt::Repeat {
                    body: new_body,
                    cond: new_cond,
                }
            }
            Stmt::If { arms, else_branch } => Stmt::If {
                arms: arms
                    .iter()
                    .map(|(cond, body)| (self.rewrite_expr(cond), self.rewrite_nested(body)))
                    .collect(),
                else_branch: else_branch.as_ref().map(|body| self.rewrite_nested(body)),
            },
            Stmt::NumericFor {
                var,
                start,
                stop,
                step,
                body,
            } => {
                let new_start = self.rewrite_expr(start);
                let new_stop = self.rewrite_expr(stop);
                let new_step = step.as_ref().map(|s| self.rewrite_expr(s));
                self.shadow.push(std::iter::once(var.clone()).collect());
                let new_body = self.rewrite_in_scope(body);
                self.shadow.pop();
                Stmt::NumericFor {
                    var: var.clone(),
                    start: new_start,
                    stop: new_stop,
                    step: new_step,
                    body: new_body,
                }
            }
            Stmt::GenericFor { vars, exprs, body } => {
                let new_exprs = exprs.iter().map(|e| self.rewrite_expr(e)).collect();
                self.shadow.push(vars.iter().cloned().collect());
                let new_body = self.rewrite_in_scope(body);
                self.shadow.pop();
                Stmt::GenericFor {
                    vars: vars.clone(),
                    exprs: new_exprs,
                    body: new_body,
                }
            }
        }
    }

    fn rewrite_target(&mut self, target: &Expr) -> Expr {
        if dotted_path_of(target).is_some() {
            self.rewrite_dotted_chain(target)
        } else {
            self.rewrite_expr(target)
        }
    }

    fn rewrite_dotted_chain(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Ident(name) => Expr::Ident(self.resolve(name)),
            Expr::Member { base, name } => Expr::Member {
                base: Box::new(self.rewrite_dotted_chain(base)),
                name: name.clone(),
            },
            Expr::Index { base, index } => Expr::Index {
                base: Box::new(self.rewrite_dotted_chain(base)),
                index: index.clone(),
            },
            other => self.rewrite_expr(other),
        }
    }

    fn rewrite_expr(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Nil | Expr::True | Expr::False | Expr::Vararg | Expr::Number(_) | Expr::Str(_) => expr.clone(),
            Expr::Ident(name) => Expr::Ident(self.resolve(name)),
            Expr::Paren(inner) => Expr::Paren(Box::new(self.rewrite_expr(inner))),
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(self.rewrite_expr(lhs)),
                rhs: Box::new(self.rewrite_expr(rhs)),
            },
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: Box::new(self.rewrite_expr(expr)),
            },
            Expr::Member { base, name } => {
                if dotted_path_of(expr).is_some() {
                    self.rewrite_dotted_chain(expr)
                } else {
                    Expr::Member {
                        base: Box::new(self.rewrite_expr(base)),
                        name: name.clone(),
                    }
                }
            }
            Expr::Index { base, index } => {
                if dotted_path_of(expr).is_some() {
                    self.rewrite_dotted_chain(expr)
                } else {
                    Expr::Index {
                        base: Box::new(self.rewrite_expr(base)),
                        index: Box::new(self.rewrite_expr(index)),
                    }
                }
            }
            Expr::Call { callee, args } => {
                let new_callee = if dotted_path_of(callee).is_some() {
                    self.rewrite_dotted_chain(callee)
                } else {
                    self.rewrite_expr(callee)
                };
                Expr::Call {
                    callee: Box::new(new_callee),
                    args: args.iter().map(|a| self.rewrite_expr(a)).collect(),
                }
            }
            Expr::MethodCall { base, method, args } => {
                let new_base = if dotted_path_of(base).is_some() {
                    self.rewrite_dotted_chain(base)
                } else {
                    self.rewrite_expr(base)
                };
                Expr::MethodCall {
                    base: Box::new(new_base),
                    method: method.clone(),
                    args: args.iter().map(|a| self.rewrite_expr(a)).collect(),
                }
            }
            Expr::Function(body) => Expr::Function(self.rewrite_function_body(body)),
            Expr::Table(fields) => Expr::Table(
                fields
                    .iter()
                    .map(|f| match f {
                        TableField::Positional(v) => TableField::Positional(self.rewrite_expr(v)),
                        TableField::Named { name, value } => TableField::Named {
                            name: name.clone(),
                            value: self.rewrite_expr(value),
                        },
                        TableField::Indexed { key, value } => TableField::Indexed {
                            key: self.rewrite_expr(key),
                            value: self.rewrite_expr(value),
                        },
                    })
                    .collect(),
            ),
        }
    }

    fn rewrite_function_body(&mut self, body: &FunctionBody) -> FunctionBody {
        self.shadow.push(body.params.iter().cloned().collect());
        let new_body = self.rewrite_in_scope(&body.body);
        self.shadow.pop();
        FunctionBody {
            params: body.params.clone(),
            is_vararg: body.is_vararg,
            body: new_body,
        }
    }

    fn rewrite_in_scope(&mut self, block: &[Stmt]) -> Vec<Stmt> {
        block.iter().map(|s| self.rewrite_stmt(s, false)).collect()
    }

    fn rewrite_nested(&mut self, block: &[Stmt]) -> Vec<Stmt> {
        self.shadow.push(FxHashSet::default());
        let out = self.rewrite_in_scope(block);
        self.shadow.pop();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::printer::format_mini;

    #[test]
    fn none_mode_is_a_no_op() {
        let stmts = parse("local config = 1").unwrap();
        let out = apply(stmts.clone(), MangleMode::None, false);
        assert_eq!(format_mini(&out), format_mini(&stmts));
    }

    #[test]
    fn mangle_mode_shortens_top_level_bindings() {
        let stmts = parse("local reallyLongConfigurationName = 1\nreturn reallyLongConfigurationName").unwrap();
        let out = apply(stmts, MangleMode::Mangle, false);
        let rendered = format_mini(&out);
        assert!(!rendered.contains("reallyLongConfigurationName"));
    }

    #[test]
    fn auto_mode_only_mangles_when_minifying() {
        let stmts = parse("local reallyLongConfigurationName = 1\nreturn reallyLongConfigurationName").unwrap();
        let unminified = apply(stmts.clone(), MangleMode::Auto, false);
        assert!(format_mini(&unminified).contains("reallyLongConfigurationName"));
        let minified = apply(stmts, MangleMode::Auto, true);
        assert!(!format_mini(&minified).contains("reallyLongConfigurationName"));
    }

    #[test]
    fn mangle_never_shadows_reserved_globals() {
        // With only one binding to rename the first generated name is "a",
        // never one of the reserved globals, so this just pins that no
        // reserved word leaks out as a replacement identifier.
        let names = generate_short_names(&IndexSet::from(["widget".to_string()]));
        let mangled = &names["widget"];
        assert!(!RESERVED_GLOBALS.contains(&mangled.as_str()));
        assert!(!KEYWORDS.contains(&mangled.as_str()));
    }

    #[test]
    fn nested_local_is_not_captured_by_mangled_name() {
        let stmts = parse("function outer()\n  local x = 1\n  return x\nend").unwrap();
        let out = apply(stmts, MangleMode::Mangle, false);
        let rendered = format_mini(&out);
        assert!(rendered.contains("local x"));
    }
}
