//! Pretty-printer (`spec.md` §6, "Pretty-printer contract").
//!
//! Renders a statement list back to source text in one of two modes:
//! [`format_beautiful`] (indented, newline-per-statement, the default
//! bundler output) and [`format_mini`] (single line, `;`-separated, no
//! incidental whitespace). Both share one recursive-descent writer — the
//! two modes only disagree on how statements are separated and indented,
//! never on how an expression renders, since parenthesisation is carried
//! explicitly by [`Expr::Paren`] rather than re-derived from precedence.

use crate::ast::{BinOp, Expr, FunctionBody, Stmt, TableField, UnOp};

pub fn format_beautiful(stmts: &[Stmt]) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
        minify: false,
    };
    printer.print_block(stmts);
    printer.out
}

pub fn format_mini(stmts: &[Stmt]) -> String {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
        minify: true,
    };
    printer.print_block(stmts);
    printer.out
}

struct Printer {
    out: String,
    indent: usize,
    minify: bool,
}

impl Printer {
    fn write_indent(&mut self) {
        if !self.minify {
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
        }
    }

    fn end_stmt(&mut self) {
        if self.minify {
            self.out.push(';');
        } else {
            self.out.push('\n');
        }
    }

    fn print_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.write_indent();
            self.print_stmt(stmt);
            self.end_stmt();
        }
    }

    fn print_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local { names, values } => {
                self.out.push_str("local ");
                self.print_name_list(names);
                if !values.is_empty() {
                    self.out.push_str(" = ");
                    self.print_expr_list(values);
                }
            }
            Stmt::FunctionDecl {
                path,
                is_local,
                is_method,
                body,
            } => {
                if *is_local {
                    self.out.push_str("local ");
                }
                self.out.push_str("function ");
                self.out.push_str(&path.base);
                let method_name = if *is_method { path.segments.split_last() } else { None };
                let dotted = method_name.map(|(_, rest)| rest).unwrap_or(&path.segments);
                for segment in dotted {
                    self.out.push('.');
                    self.out.push_str(segment);
                }
                if let Some((name, _)) = method_name {
                    self.out.push(':');
                    self.out.push_str(name);
                }
                self.print_function_params(body);
                self.indent += 1;
                self.print_block(&body.body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Stmt::Assign { targets, values } => {
                self.print_expr_list(targets);
                self.out.push_str(" = ");
                self.print_expr_list(values);
            }
            Stmt::ExprStat(expr) => self.print_expr(expr),
            Stmt::Return(values) => {
                self.out.push_str("return");
                if !values.is_empty() {
                    self.out.push(' ');
                    self.print_expr_list(values);
                }
            }
            Stmt::Break => self.out.push_str("break"),
            Stmt::Do(body) => {
                self.out.push_str("do");
                self.end_stmt();
                self.indent += 1;
                self.print_block(body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Stmt::While { cond, body } => {
                self.out.push_str("while ");
                self.print_expr(cond);
                self.out.push_str(" do");
                self.end_stmt();
                self.indent += 1;
                self.print_block(body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Stmt::Repeat { body, cond } => {
                self.out.push_str("repeat");
                self.end_stmt();
                self.indent += 1;
                self.print_block(body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("until ");
                self.print_expr(cond);
            }
            Stmt::If { arms, else_branch } => {
                for (i, (cond, body)) in arms.iter().enumerate() {
                    if i == 0 {
                        self.out.push_str("if ");
                    } else {
                        self.write_indent();
                        self.out.push_str("elseif ");
                    }
                    self.print_expr(cond);
                    self.out.push_str(" then");
                    self.end_stmt();
                    self.indent += 1;
                    self.print_block(body);
                    self.indent -= 1;
                }
                if let Some(body) = else_branch {
                    self.write_indent();
                    self.out.push_str("else");
                    self.end_stmt();
                    self.indent += 1;
                    self.print_block(body);
                    self.indent -= 1;
                }
                self.write_indent();
                self.out.push_str("end");
            }
            Stmt::NumericFor {
                var,
                start,
                stop,
                step,
                body,
            } => {
                self.out.push_str("for ");
                self.out.push_str(var);
                self.out.push_str(" = ");
                self.print_expr(start);
                self.out.push_str(", ");
                self.print_expr(stop);
                if let Some(step) = step {
                    self.out.push_str(", ");
                    self.print_expr(step);
                }
                self.out.push_str(" do");
                self.end_stmt();
                self.indent += 1;
                self.print_block(body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Stmt::GenericFor { vars, exprs, body } => {
                self.out.push_str("for ");
                self.print_name_list(vars);
                self.out.push_str(" in ");
                self.print_expr_list(exprs);
                self.out.push_str(" do");
                self.end_stmt();
                self.indent += 1;
                self.print_block(body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
        }
    }

    fn print_name_list(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(name);
        }
    }

    fn print_expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.print_expr(expr);
        }
    }

    fn print_function_params(&mut self, body: &FunctionBody) {
        self.out.push('(');
        for (i, param) in body.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(param);
        }
        if body.is_vararg {
            if !body.params.is_empty() {
                self.out.push_str(", ");
            }
            self.out.push_str("...");
        }
        self.out.push(')');
    }

    fn print_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Nil => self.out.push_str("nil"),
            Expr::True => self.out.push_str("true"),
            Expr::False => self.out.push_str("false"),
            Expr::Vararg => self.out.push_str("..."),
            Expr::Number(n) => self.out.push_str(&format_number(*n)),
            Expr::Str(s) => {
                self.out.push('"');
                self.out.push_str(&escape_str(s));
                self.out.push('"');
            }
            Expr::Ident(name) => self.out.push_str(name),
            Expr::Paren(inner) => {
                self.out.push('(');
                self.print_expr(inner);
                self.out.push(')');
            }
            Expr::Binary { op, lhs, rhs } => {
                self.print_expr(lhs);
                self.out.push(' ');
                self.out.push_str(binop_str(*op));
                self.out.push(' ');
                self.print_expr(rhs);
            }
            Expr::Unary { op, expr } => {
                self.out.push_str(unop_str(*op));
                if matches!(op, UnOp::Not) {
                    self.out.push(' ');
                }
                self.print_expr(expr);
            }
            Expr::Index { base, index } => {
                self.print_expr(base);
                self.out.push('[');
                self.print_expr(index);
                self.out.push(']');
            }
            Expr::Member { base, name } => {
                self.print_expr(base);
                self.out.push('.');
                self.out.push_str(name);
            }
            Expr::Call { callee, args } => {
                self.print_expr(callee);
                self.out.push('(');
                self.print_expr_list(args);
                self.out.push(')');
            }
            Expr::MethodCall { base, method, args } => {
                self.print_expr(base);
                self.out.push(':');
                self.out.push_str(method);
                self.out.push('(');
                self.print_expr_list(args);
                self.out.push(')');
            }
            Expr::Function(body) => {
                self.out.push_str("function");
                self.print_function_params(body);
                self.indent += 1;
                self.print_block(&body.body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Expr::Table(fields) => self.print_table(fields),
        }
    }

    fn print_table(&mut self, fields: &[TableField]) {
        self.out.push('{');
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            match field {
                TableField::Positional(value) => self.print_expr(value),
                TableField::Named { name, value } => {
                    self.out.push_str(name);
                    self.out.push_str(" = ");
                    self.print_expr(value);
                }
                TableField::Indexed { key, value } => {
                    self.out.push('[');
                    self.print_expr(key);
                    self.out.push_str("] = ");
                    self.print_expr(value);
                }
            }
        }
        self.out.push('}');
    }
}

fn binop_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "^",
        BinOp::Concat => "..",
        BinOp::Eq => "==",
        BinOp::Ne => "~=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "and",
        BinOp::Or => "or",
    }
}

fn unop_str(op: UnOp) -> &'static str {
    match op {
        UnOp::Neg => "-",
        UnOp::Not => "not",
        UnOp::Len => "#",
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn beautiful_indents_nested_blocks() {
        let stmts = parse("if x then\n  local y = 1\nend").unwrap();
        let rendered = format_beautiful(&stmts);
        assert!(rendered.contains("  local y = 1"));
    }

    #[test]
    fn mini_has_no_newlines() {
        let stmts = parse("local x = 1\nlocal y = 2").unwrap();
        let rendered = format_mini(&stmts);
        assert!(!rendered.contains('\n'));
        assert!(rendered.contains(';'));
    }

    #[test]
    fn preserves_explicit_parens() {
        let stmts = parse("local x = (1 + 2) * 3").unwrap();
        let rendered = format_beautiful(&stmts);
        assert!(rendered.contains("(1 + 2) * 3"));
    }

    #[test]
    fn dotted_method_declaration_round_trips() {
        let stmts = parse("function T:make()\n  return 1\nend").unwrap();
        let rendered = format_beautiful(&stmts);
        assert!(rendered.starts_with("function T:make()"));
    }
}
