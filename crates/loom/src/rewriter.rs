//! AST rewriter (`spec.md` §4.5, component C5).
//!
//! Applies the rename plan the allocator (C4) produced to every identifier
//! reference in a module's statement tree, cloning [`crate::ast::Stmt`]
//! nodes into their bundled form. This is the second of the two visitors
//! over the tagged-sum AST, mirroring the split `cribo`'s
//! `code_generator` draws from its dependency-collecting visitors.
//!
//! Only names declared in a module's outermost block participate in the
//! flat global namespace (`spec.md` §4.4's Item model only classifies
//! `module.ast_body` statements). A `local`/`function` declared inside a
//! nested block — an `if`, `while`, `do`, or function body — stays lexically
//! scoped to that block exactly as it would in un-bundled Lua, so this
//! rewriter tracks those as shadowing entries rather than looking them up in
//! the rename tables: a reference to a name a nested scope has shadowed is
//! left untouched even if some unrelated top-level binding shares its
//! spelling.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::allocator::ModuleRewrite;
use crate::ast::{dotted_path_of, DottedPath, Expr, FunctionBody, Stmt, TableField};
use crate::module_graph::Module;

/// Rewrite every statement in `module`'s outermost block, returning a new
/// tree with every identifier reference resolved per the four-tier rule:
/// alias, then this module's own top-level bindings, then the process-wide
/// fallback table, then left unchanged.
pub fn rewrite_module(
    module: &Module,
    rewrite: &ModuleRewrite,
    global_rename: &IndexMap<String, String>,
) -> Vec<Stmt> {
    let mut ctx = RewriteCtx {
        alias_map: &rewrite.alias_map,
        local_rewrite_map: &rewrite.local_rewrite_map,
        global_rename,
        shadow: Vec::new(),
    };
    module.ast_body.iter().map(|s| ctx.rewrite_stmt(s, true)).collect()
}

struct RewriteCtx<'a> {
    alias_map: &'a IndexMap<String, String>,
    local_rewrite_map: &'a IndexMap<String, String>,
    global_rename: &'a IndexMap<String, String>,
    /// Stack of nested-scope bindings (function params, nested locals, loop
    /// variables) that shadow the module's top-level rename tables.
    shadow: Vec<FxHashSet<String>>,
}

impl RewriteCtx<'_> {
    fn resolve(&self, name: &str) -> String {
        if self.shadow.iter().rev().any(|frame| frame.contains(name)) {
            return name.to_string();
        }
        self.alias_map
            .get(name)
            .or_else(|| self.local_rewrite_map.get(name))
            .or_else(|| self.global_rename.get(name))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn rewrite_stmt(&mut self, stmt: &Stmt, top_level: bool) -> Stmt {
        match stmt {
            Stmt::Local { names, values } => {
                let new_values = values.iter().map(|v| self.rewrite_expr(v)).collect();
                if top_level {
                    let new_names = names.iter().map(|n| self.rename_declared(n)).collect();
                    Stmt::Local {
                        names: new_names,
                        values: new_values,
                    }
                } else {
                    self.shadow_current(names.iter().cloned());
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
                        DottedPath::simple(self.rename_declared(&path.base))
                    } else if *is_local {
                        self.shadow_current(std::iter::once(path.base.clone()));
                        path.clone()
                    } else {
                        // A nested, non-local function declaration assigns to
                        // a global, so it must resolve through the same
                        // alias/local/global-rename chain as any other
                        // reference to that name — not keep the stale
                        // pre-cascade spelling.
                        DottedPath::simple(self.resolve(&path.base))
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
                targets: targets.iter().map(|t| self.rewrite_assign_target(t)).collect(),
                values: values.iter().map(|v| self.rewrite_expr(v)).collect(),
            },
            Stmt::ExprStat(expr) => Stmt::ExprStat(self.rewrite_expr(expr)),
            Stmt::Return(values) => Stmt::Return(values.iter().map(|v| self.rewrite_expr(v)).collect()),
            Stmt::Break => Stmt::Break,
            Stmt::Do(body) => Stmt::Do(self.rewrite_nested_block(body)),
            Stmt::While { cond, body } => Stmt::While {
                cond: self.rewrite_expr(cond),
                body: self.rewrite_nested_block(body),
            },
            Stmt::Repeat { body, cond } => {
                // `until` sees the loop body's own locals in Lua, so the
                // condition is resolved in the same scope frame as the body
                // rather than the enclosing one.
                self.shadow.push(FxHashSet::default());
                let new_body = self.rewrite_stmts(body);
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
                    .map(|(cond, body)| (self.rewrite_expr(cond), self.rewrite_nested_block(body)))
                    .collect(),
                else_branch: else_branch.as_ref().map(|body| self.rewrite_nested_block(body)),
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
                let new_body = self.rewrite_stmts(body);
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
                let new_body = self.rewrite_stmts(body);
                self.shadow.pop();
                Stmt::GenericFor {
                    vars: vars.clone(),
                    exprs: new_exprs,
                    body: new_body,
                }
            }
        }
    }

    /// Look up a top-level declaration's final name. Every name `classify`
    /// reports as declared at module scope was claimed by the allocator, so
    /// an entry is always present; falling back to the original spelling
    /// only guards against a future Item kind the allocator doesn't yet
    /// populate `local_rewrite_map` for.
    fn rename_declared(&self, name: &str) -> String {
        self.local_rewrite_map.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    fn shadow_current<I: IntoIterator<Item = String>>(&mut self, names: I) {
        if let Some(frame) = self.shadow.last_mut() {
            frame.extend(names);
        }
    }

    fn rewrite_assign_target(&mut self, target: &Expr) -> Expr {
        if dotted_path_of(target).is_some() {
            self.rewrite_dotted_chain(target)
        } else {
            self.rewrite_expr(target)
        }
    }

    /// Rewrite only the identifier at the root of a `Member`/`Index` chain,
    /// preserving the original mix of `.field` and `["field"]` syntax.
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
            Expr::Nil => Expr::Nil,
            Expr::True => Expr::True,
            Expr::False => Expr::False,
            Expr::Vararg => Expr::Vararg,
            Expr::Number(n) => Expr::Number(*n),
            Expr::Str(s) => Expr::Str(s.clone()),
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
            Expr::Table(fields) => Expr::Table(fields.iter().map(|f| self.rewrite_table_field(f)).collect()),
        }
    }

    fn rewrite_table_field(&mut self, field: &TableField) -> TableField {
        match field {
            TableField::Positional(value) => TableField::Positional(self.rewrite_expr(value)),
            TableField::Named { name, value } => TableField::Named {
                name: name.clone(),
                value: self.rewrite_expr(value),
            },
            TableField::Indexed { key, value } => TableField::Indexed {
                key: self.rewrite_expr(key),
                value: self.rewrite_expr(value),
            },
        }
    }

    fn rewrite_function_body(&mut self, body: &FunctionBody) -> FunctionBody {
        self.shadow.push(body.params.iter().cloned().collect());
        let new_body = self.rewrite_stmts(&body.body);
        self.shadow.pop();
        FunctionBody {
            params: body.params.clone(),
            is_vararg: body.is_vararg,
            body: new_body,
        }
    }

    fn rewrite_stmts(&mut self, block: &[Stmt]) -> Vec<Stmt> {
        block.iter().map(|s| self.rewrite_stmt(s, false)).collect()
    }

    fn rewrite_nested_block(&mut self, block: &[Stmt]) -> Vec<Stmt> {
        self.shadow.push(FxHashSet::default());
        let out = self.rewrite_stmts(block);
        self.shadow.pop();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::printer::format_beautiful;

    fn rewrite_src(src: &str, local_rewrite_map: &[(&str, &str)], alias_map: &[(&str, &str)]) -> Vec<Stmt> {
        let body = parse(src).expect("fixture parses");
        let rewrite = ModuleRewrite {
            alias_map: alias_map.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            alias_set: alias_map.iter().map(|(k, _)| k.to_string()).collect(),
            local_rewrite_map: local_rewrite_map
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            alias_owner: IndexMap::new(),
        };
        let global_rename = IndexMap::new();
        let mut ctx = RewriteCtx {
            alias_map: &rewrite.alias_map,
            local_rewrite_map: &rewrite.local_rewrite_map,
            global_rename: &global_rename,
            shadow: Vec::new(),
        };
        body.iter().map(|s| ctx.rewrite_stmt(s, true)).collect()
    }

    #[test]
    fn renames_top_level_local_declaration_and_its_references() {
        let out = rewrite_src("local config = 1\nreturn config", &[("config", "config2")], &[]);
        let rendered = format_beautiful(&out);
        assert!(rendered.contains("config2"));
        assert!(!rendered.contains("config ="));
    }

    #[test]
    fn nested_local_shadows_the_rename_table() {
        let out = rewrite_src(
            "function outer()\n  local config = 2\n  return config\nend",
            &[("config", "config2")],
            &[],
        );
        let rendered = format_beautiful(&out);
        assert!(rendered.contains("local config"));
        assert!(!rendered.contains("config2"));
    }

    #[test]
    fn alias_takes_priority_over_local_rewrite_map() {
        let out = rewrite_src("return helper", &[("helper", "helper_local")], &[("helper", "helper_from_other_module")]);
        let rendered = format_beautiful(&out);
        assert!(rendered.contains("helper_from_other_module"));
    }

    #[test]
    fn nested_non_local_function_decl_resolves_against_global_rename() {
        let out = rewrite_src(
            "function outer()\n  function helper()\n  end\nend",
            &[("helper", "helper2")],
            &[],
        );
        let rendered = format_beautiful(&out);
        assert!(rendered.contains("function helper2"));
        assert!(!rendered.contains("function helper()"));
    }

    #[test]
    fn dotted_member_target_only_rewrites_base() {
        let out = rewrite_src("T.__index = T", &[("T", "T2")], &[]);
        let rendered = format_beautiful(&out);
        assert!(rendered.contains("T2.__index"));
        assert!(!rendered.contains("T2.__index2"));
    }
}
