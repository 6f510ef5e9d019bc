//! Identifier extractor (`spec.md` §4.3, component C3).
//!
//! A single recursive traversal of a statement's AST subtree computing the
//! set of free top-level identifiers and qualified member paths it depends
//! on. This and [`crate::rewriter`] are the two visitors over
//! [`crate::ast`]'s tagged sum, the same split `cribo` draws between its
//! `visitors::` dependency collectors and its `code_generator` rewriter.

use rustc_hash::FxHashSet;

use crate::ast::{dotted_path_of, Expr, FunctionBody, Stmt, TableField};

/// Compute the set of dependency keys (plain identifiers and dotted paths)
/// a single top-level statement references.
pub fn extract_deps(stmt: &Stmt) -> FxHashSet<String> {
    let mut deps = FxHashSet::default();
    visit_stmt(stmt, &mut deps);
    deps
}

fn visit_block(block: &[Stmt], deps: &mut FxHashSet<String>) {
    for stmt in block {
        visit_stmt(stmt, deps);
    }
}

fn visit_function_body(body: &FunctionBody, deps: &mut FxHashSet<String>) {
    visit_block(&body.body, deps);
}

fn visit_stmt(stmt: &Stmt, deps: &mut FxHashSet<String>) {
    match stmt {
        Stmt::Local { values, .. } => {
            for value in values {
                visit_expr(value, deps);
            }
        }
        Stmt::FunctionDecl { path, body, .. } => {
            if !path.is_simple() {
                // `function T:make()` / `function T.make()` reads `T` to
                // attach the method; the declared path itself is not a dep.
                deps.insert(path.base.clone());
            }
            visit_function_body(body, deps);
        }
        Stmt::Assign { targets, values } => {
            for target in targets {
                visit_assign_target(target, deps);
            }
            for value in values {
                visit_expr(value, deps);
            }
        }
        Stmt::ExprStat(expr) => visit_expr(expr, deps),
        Stmt::Return(values) => {
            for value in values {
                visit_expr(value, deps);
            }
        }
        Stmt::Break => {}
        Stmt::Do(body) => visit_block(body, deps),
        Stmt::While { cond, body } => {
            visit_expr(cond, deps);
            visit_block(body, deps);
        }
        Stmt::Repeat { body, cond } => {
            visit_block(body, deps);
            visit_expr(cond, deps);
        }
        Stmt::If { arms, else_branch } => {
            for (cond, body) in arms {
                visit_expr(cond, deps);
                visit_block(body, deps);
            }
            if let Some(body) = else_branch {
                visit_block(body, deps);
            }
        }
        Stmt::NumericFor {
            start,
            stop,
            step,
            body,
            ..
        } => {
            visit_expr(start, deps);
            visit_expr(stop, deps);
            if let Some(step) = step {
                visit_expr(step, deps);
            }
            visit_block(body, deps);
        }
        Stmt::GenericFor { exprs, body, .. } => {
            for expr in exprs {
                visit_expr(expr, deps);
            }
            visit_block(body, deps);
        }
    }
}

/// An assignment target only contributes its *base* identifier as a
/// dependency (the table being mutated must already exist); the full
/// dotted path is what this statement declares, not what it reads.
fn visit_assign_target(target: &Expr, deps: &mut FxHashSet<String>) {
    match target {
        Expr::Ident(_) => {}
        Expr::Member { base, .. } | Expr::Index { base, .. } => {
            if let Some(path) = dotted_path_of(target) {
                deps.insert(path.base);
            } else {
                visit_expr(base, deps);
                if let Expr::Index { index, .. } = target {
                    visit_expr(index, deps);
                }
            }
        }
        _ => visit_expr(target, deps),
    }
}

fn visit_expr(expr: &Expr, deps: &mut FxHashSet<String>) {
    match expr {
        Expr::Nil | Expr::True | Expr::False | Expr::Vararg | Expr::Number(_) | Expr::Str(_) => {}
        Expr::Ident(name) => {
            deps.insert(name.clone());
        }
        Expr::Paren(inner) => visit_expr(inner, deps),
        Expr::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, deps);
            visit_expr(rhs, deps);
        }
        Expr::Unary { expr, .. } => visit_expr(expr, deps),
        Expr::Member { base, .. } => {
            if let Some(path) = dotted_path_of(expr) {
                deps.insert(path.base.clone());
                deps.insert(path.joined());
            } else {
                visit_expr(base, deps);
            }
        }
        Expr::Index { base, index } => {
            if let Some(path) = dotted_path_of(expr) {
                deps.insert(path.base.clone());
                deps.insert(path.joined());
            } else {
                visit_expr(base, deps);
                visit_expr(index, deps);
            }
        }
        Expr::Call { callee, args } => {
            // The callee's own dotted path is recorded once here; we do not
            // additionally fall into the generic `Member`/`Index` case for
            // it (that would double-count the same path).
            if let Some(path) = dotted_path_of(callee) {
                deps.insert(path.base.clone());
                deps.insert(path.joined());
            } else {
                visit_expr(callee, deps);
            }
            for arg in args {
                visit_expr(arg, deps);
            }
        }
        Expr::MethodCall { base, method, args } => {
            if let Some(path) = dotted_path_of(base) {
                deps.insert(path.base.clone());
                deps.insert(format!("{}.{method}", path.joined()));
            } else {
                visit_expr(base, deps);
            }
            for arg in args {
                visit_expr(arg, deps);
            }
        }
        Expr::Function(body) => visit_function_body(body, deps),
        Expr::Table(fields) => {
            for field in fields {
                match field {
                    TableField::Positional(value) => visit_expr(value, deps),
                    TableField::Named { value, .. } => visit_expr(value, deps),
                    TableField::Indexed { key, value } => {
                        visit_expr(key, deps);
                        visit_expr(value, deps);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn deps_of(src: &str) -> FxHashSet<String> {
        let stmts = parse(src).expect("fixture parses");
        assert_eq!(stmts.len(), 1, "fixture must be a single top-level statement");
        extract_deps(&stmts[0])
    }

    #[test]
    fn member_assignment_depends_on_base_not_full_path() {
        let deps = deps_of("T.__index = T");
        assert!(deps.contains("T"));
        assert!(!deps.contains("T.__index"));
    }

    #[test]
    fn call_records_dotted_path_once() {
        let deps = deps_of("setmetatable({}, T)");
        assert!(deps.contains("T"));
    }

    #[test]
    fn method_call_records_base_and_joined_path() {
        let deps = deps_of("local x = T:make()");
        assert!(deps.contains("T"));
        assert!(deps.contains("T.make"));
    }

    #[test]
    fn dotted_function_decl_depends_on_base() {
        let stmts = parse("function T:make() return setmetatable({}, T) end").unwrap();
        let deps = extract_deps(&stmts[0]);
        assert!(deps.contains("T"));
    }
}
