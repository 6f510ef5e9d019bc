//! Recursive-descent parser over the [`lexer`](crate::lexer) token stream.
//!
//! Implements the `parse(src) -> Result<Vec<Stmt>>` collaborator contract of
//! `spec.md` §6. Operator precedence for expressions follows a standard
//! precedence-climbing table; statement parsing is a direct transcription of
//! the dialect's block grammar.

use crate::ast::{BinOp, Expr, FunctionBody, Stmt, TableField, UnOp};
use crate::lexer::{Lexer, Span, Token, TokenKind};
use std::fmt;

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, col {}: {}",
            self.span.line, self.span.col, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse a module's cleaned source (import/export syntax already stripped
/// by [`crate::import_export::extract`]) into its top-level statement list.
pub fn parse(src: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = Lexer::new(src).tokenize().map_err(|e| ParseError {
        message: e.message,
        span: e.span,
    })?;
    let mut parser = Parser { tokens, pos: 0 };
    let block = parser.block()?;
    parser.expect_symbol_or_eof()?;
    Ok(block)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            span: self.peek().span,
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn is_symbol(&self, sym: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Symbol(s) if *s == sym)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        if self.is_symbol(sym) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> PResult<()> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{kw}`")))
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> PResult<()> {
        if self.eat_symbol(sym) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{sym}`")))
        }
    }

    fn expect_symbol_or_eof(&mut self) -> PResult<()> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.advance().kind {
            TokenKind::Ident(name) => Ok(name),
            other => Err(ParseError {
                message: format!("expected identifier, found {other:?}"),
                span: self.peek().span,
            }),
        }
    }

    fn block_end(&self) -> bool {
        self.is_eof()
            || self.is_keyword("end")
            || self.is_keyword("else")
            || self.is_keyword("elseif")
            || self.is_keyword("until")
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.block_end() {
            if self.eat_symbol(";") {
                continue;
            }
            if self.is_keyword("return") {
                stmts.push(self.return_stat()?);
                break;
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    fn return_stat(&mut self) -> PResult<Stmt> {
        self.advance();
        let values = if self.block_end() || self.is_symbol(";") {
            Vec::new()
        } else {
            self.expr_list()?
        };
        self.eat_symbol(";");
        Ok(Stmt::Return(values))
    }

    fn statement(&mut self) -> PResult<Stmt> {
        if self.eat_keyword("break") {
            return Ok(Stmt::Break);
        }
        if self.eat_keyword("do") {
            let body = self.block()?;
            self.expect_keyword("end")?;
            return Ok(Stmt::Do(body));
        }
        if self.eat_keyword("while") {
            let cond = self.expr()?;
            self.expect_keyword("do")?;
            let body = self.block()?;
            self.expect_keyword("end")?;
            return Ok(Stmt::While { cond, body });
        }
        if self.eat_keyword("repeat") {
            let body = self.block()?;
            self.expect_keyword("until")?;
            let cond = self.expr()?;
            return Ok(Stmt::Repeat { body, cond });
        }
        if self.eat_keyword("if") {
            return self.if_stat();
        }
        if self.eat_keyword("for") {
            return self.for_stat();
        }
        if self.eat_keyword("function") {
            return self.function_stat(false);
        }
        if self.eat_keyword("local") {
            if self.eat_keyword("function") {
                return self.function_stat(true);
            }
            return self.local_stat();
        }
        self.expr_stat()
    }

    fn if_stat(&mut self) -> PResult<Stmt> {
        let mut arms = Vec::new();
        let cond = self.expr()?;
        self.expect_keyword("then")?;
        let body = self.block()?;
        arms.push((cond, body));
        loop {
            if self.eat_keyword("elseif") {
                let cond = self.expr()?;
                self.expect_keyword("then")?;
                let body = self.block()?;
                arms.push((cond, body));
                continue;
            }
            break;
        }
        let else_branch = if self.eat_keyword("else") {
            Some(self.block()?)
        } else {
            None
        };
        self.expect_keyword("end")?;
        Ok(Stmt::If { arms, else_branch })
    }

    fn for_stat(&mut self) -> PResult<Stmt> {
        let first = self.expect_ident()?;
        if self.eat_symbol("=") {
            let start = self.expr()?;
            self.expect_symbol(",")?;
            let stop = self.expr()?;
            let step = if self.eat_symbol(",") {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect_keyword("do")?;
            let body = self.block()?;
            self.expect_keyword("end")?;
            return Ok(Stmt::NumericFor {
                var: first,
                start,
                stop,
                step,
                body,
            });
        }
        let mut vars = vec![first];
        while self.eat_symbol(",") {
            vars.push(self.expect_ident()?);
        }
        self.expect_keyword("in")?;
        let exprs = self.expr_list()?;
        self.expect_keyword("do")?;
        let body = self.block()?;
        self.expect_keyword("end")?;
        Ok(Stmt::GenericFor { vars, exprs, body })
    }

    fn function_stat(&mut self, is_local: bool) -> PResult<Stmt> {
        let base = self.expect_ident()?;
        let mut segments = Vec::new();
        let mut is_method = false;
        if !is_local {
            while self.eat_symbol(".") {
                segments.push(self.expect_ident()?);
            }
            if self.eat_symbol(":") {
                segments.push(self.expect_ident()?);
                is_method = true;
            }
        }
        let body = self.func_body(is_method)?;
        Ok(Stmt::FunctionDecl {
            path: crate::ast::DottedPath { base, segments },
            is_local,
            is_method,
            body,
        })
    }

    fn func_body(&mut self, is_method: bool) -> PResult<FunctionBody> {
        self.expect_symbol("(")?;
        let mut params = Vec::new();
        if is_method {
            params.push("self".to_string());
        }
        let mut is_vararg = false;
        if !self.is_symbol(")") {
            loop {
                if self.eat_symbol("...") {
                    is_vararg = true;
                    break;
                }
                params.push(self.expect_ident()?);
                if !self.eat_symbol(",") {
                    break;
                }
            }
        }
        self.expect_symbol(")")?;
        let body = self.block()?;
        self.expect_keyword("end")?;
        Ok(FunctionBody {
            params,
            is_vararg,
            body,
        })
    }

    fn local_stat(&mut self) -> PResult<Stmt> {
        let mut names = vec![self.expect_ident()?];
        while self.eat_symbol(",") {
            names.push(self.expect_ident()?);
        }
        let values = if self.eat_symbol("=") {
            self.expr_list()?
        } else {
            Vec::new()
        };
        Ok(Stmt::Local { names, values })
    }

    fn expr_stat(&mut self) -> PResult<Stmt> {
        let first = self.suffixed_expr()?;
        if self.is_symbol("=") || self.is_symbol(",") {
            let mut targets = vec![first];
            while self.eat_symbol(",") {
                targets.push(self.suffixed_expr()?);
            }
            self.expect_symbol("=")?;
            let values = self.expr_list()?;
            return Ok(Stmt::Assign { targets, values });
        }
        match &first {
            Expr::Call { .. } | Expr::MethodCall { .. } => Ok(Stmt::ExprStat(first)),
            _ => Err(self.error("syntax error: expression statement must be a function call")),
        }
    }

    fn expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.eat_symbol(",") {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    // --- expressions (precedence climbing) ---

    fn expr(&mut self) -> PResult<Expr> {
        self.binary_expr(0)
    }

    fn binary_expr(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.unary_expr()?;
        loop {
            let Some((op, lbp, rbp)) = self.peek_binop() else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.binary_expr(rbp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn peek_binop(&self) -> Option<(BinOp, u8, u8)> {
        let op = match &self.peek().kind {
            TokenKind::Keyword("or") => BinOp::Or,
            TokenKind::Keyword("and") => BinOp::And,
            TokenKind::Symbol("<") => BinOp::Lt,
            TokenKind::Symbol(">") => BinOp::Gt,
            TokenKind::Symbol("<=") => BinOp::Le,
            TokenKind::Symbol(">=") => BinOp::Ge,
            TokenKind::Symbol("~=") => BinOp::Ne,
            TokenKind::Symbol("==") => BinOp::Eq,
            TokenKind::Symbol("..") => BinOp::Concat,
            TokenKind::Symbol("+") => BinOp::Add,
            TokenKind::Symbol("-") => BinOp::Sub,
            TokenKind::Symbol("*") => BinOp::Mul,
            TokenKind::Symbol("/") => BinOp::Div,
            TokenKind::Symbol("%") => BinOp::Mod,
            TokenKind::Symbol("^") => BinOp::Pow,
            _ => return None,
        };
        // Left/right binding power; `..` and `^` are right-associative.
        Some(match op {
            BinOp::Or => (1, 1, 2),
            BinOp::And => (2, 3, 4),
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Ne | BinOp::Eq => (3, 5, 6),
            BinOp::Concat => (4, 9, 8),
            BinOp::Add | BinOp::Sub => (5, 10, 11),
            BinOp::Mul | BinOp::Div | BinOp::Mod => (6, 12, 13),
            BinOp::Pow => (8, 17, 16),
            BinOp::FloorDiv => unreachable!("floor-div has no surface token"),
        })
        .map(|(_, lbp, rbp)| (op, lbp, rbp))
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        let op = match &self.peek().kind {
            TokenKind::Keyword("not") => Some(UnOp::Not),
            TokenKind::Symbol("-") => Some(UnOp::Neg),
            TokenKind::Symbol("#") => Some(UnOp::Len),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let expr = self.binary_expr(15)?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.pow_expr()
    }

    fn pow_expr(&mut self) -> PResult<Expr> {
        self.suffixed_expr()
    }

    fn suffixed_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.primary_expr()?;
        loop {
            if self.eat_symbol(".") {
                let name = self.expect_ident()?;
                expr = Expr::Member {
                    base: Box::new(expr),
                    name,
                };
            } else if self.eat_symbol("[") {
                let index = self.expr()?;
                self.expect_symbol("]")?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_symbol(":") {
                let method = self.expect_ident()?;
                let args = self.call_args()?;
                expr = Expr::MethodCall {
                    base: Box::new(expr),
                    method,
                    args,
                };
            } else if self.is_symbol("(") || self.is_symbol("{") || self.is_string() {
                let args = self.call_args()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn is_string(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Str(_))
    }

    fn call_args(&mut self) -> PResult<Vec<Expr>> {
        if self.eat_symbol("(") {
            let args = if self.is_symbol(")") {
                Vec::new()
            } else {
                self.expr_list()?
            };
            self.expect_symbol(")")?;
            Ok(args)
        } else if self.is_symbol("{") {
            Ok(vec![self.table_expr()?])
        } else if let TokenKind::Str(s) = self.peek().kind.clone() {
            self.advance();
            Ok(vec![Expr::Str(s)])
        } else {
            Err(self.error("expected call arguments"))
        }
    }

    fn primary_expr(&mut self) -> PResult<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Keyword("nil") => {
                self.advance();
                Ok(Expr::Nil)
            }
            TokenKind::Keyword("true") => {
                self.advance();
                Ok(Expr::True)
            }
            TokenKind::Keyword("false") => {
                self.advance();
                Ok(Expr::False)
            }
            TokenKind::Keyword("function") => {
                self.advance();
                Ok(Expr::Function(self.func_body(false)?))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Symbol("...") => {
                self.advance();
                Ok(Expr::Vararg)
            }
            TokenKind::Symbol("(") => {
                self.advance();
                let inner = self.expr()?;
                self.expect_symbol(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::Symbol("{") => self.table_expr(),
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            other => Err(ParseError {
                message: format!("unexpected token {other:?}"),
                span: self.peek().span,
            }),
        }
    }

    fn table_expr(&mut self) -> PResult<Expr> {
        self.expect_symbol("{")?;
        let mut fields = Vec::new();
        while !self.is_symbol("}") {
            if self.eat_symbol("[") {
                let key = self.expr()?;
                self.expect_symbol("]")?;
                self.expect_symbol("=")?;
                let value = self.expr()?;
                fields.push(TableField::Indexed { key, value });
            } else if let TokenKind::Ident(name) = self.peek().kind.clone() {
                // Disambiguate `name = expr` from a positional expr starting with an ident.
                if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Symbol("="))
                {
                    self.advance();
                    self.advance();
                    let value = self.expr()?;
                    fields.push(TableField::Named { name, value });
                } else {
                    fields.push(TableField::Positional(self.expr()?));
                }
            } else {
                fields.push(TableField::Positional(self.expr()?));
            }
            if !(self.eat_symbol(",") || self.eat_symbol(";")) {
                break;
            }
        }
        self.expect_symbol("}")?;
        Ok(Expr::Table(fields))
    }
}
