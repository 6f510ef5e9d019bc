//! Tagged-sum AST for the bundled scripting language.
//!
//! This mirrors the node-kind contract in `spec.md` §6: a small fixed set of
//! statement and expression kinds, each permitting in-place identifier
//! replacement at both reference sites and declaration sites. The core
//! pipeline (C3 identifier extraction, C5 rewriting) is implemented as two
//! visitors over this same sum, the way `cribo`'s visitors module walks
//! `ruff_python_ast` nodes.

/// A possibly-dotted reference used as a function/method declaration name or
/// an assignment target, e.g. `T`, `T.__index`, `T.a.b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedPath {
    pub base: String,
    pub segments: Vec<String>,
}

impl DottedPath {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            base: name.into(),
            segments: Vec::new(),
        }
    }

    pub fn is_simple(&self) -> bool {
        self.segments.is_empty()
    }

    /// The full dotted dependency key, e.g. `"T.__index"`.
    pub fn joined(&self) -> String {
        if self.segments.is_empty() {
            self.base.clone()
        } else {
            format!("{}.{}", self.base, self.segments.join("."))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Len,
}

#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub params: Vec<String>,
    pub is_vararg: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum TableField {
    Positional(Expr),
    Named { name: String, value: Expr },
    Indexed { key: Expr, value: Expr },
}

/// Expression nodes. `Ident` is the only reference-site node the rewriter
/// (C5) ever rewrites; every other node just carries `Expr`/`Box<Expr>`
/// children for the visitor to recurse into.
#[derive(Debug, Clone)]
pub enum Expr {
    Nil,
    True,
    False,
    Vararg,
    Number(f64),
    Str(String),
    /// A free or bound identifier reference. The only node the rewriter
    /// ever replaces the *contents* of.
    Ident(String),
    Paren(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    /// `base[index]` — generic (possibly non-literal) indexing.
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `base.name` — constant-string-indexed member access sugar.
    Member {
        base: Box<Expr>,
        name: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `base:method(args)` — implicit-self method call.
    MethodCall {
        base: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Function(FunctionBody),
    Table(Vec<TableField>),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `local NAME {, NAME} [= EXPR {, EXPR}]`.
    Local { names: Vec<String>, values: Vec<Expr> },
    /// `[local] function PATH (...) ... end` or `function T:m(...) ... end`.
    /// `is_local` only ever applies when `path.is_simple()` — Lua has no
    /// `local function A.b()` form.
    FunctionDecl {
        path: DottedPath,
        is_local: bool,
        is_method: bool,
        body: FunctionBody,
    },
    Assign { targets: Vec<Expr>, values: Vec<Expr> },
    ExprStat(Expr),
    Return(Vec<Expr>),
    Break,
    Do(Vec<Stmt>),
    While { cond: Expr, body: Vec<Stmt> },
    Repeat { body: Vec<Stmt>, cond: Expr },
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
    },
    NumericFor {
        var: String,
        start: Expr,
        stop: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    GenericFor {
        vars: Vec<String>,
        exprs: Vec<Expr>,
        body: Vec<Stmt>,
    },
}

/// The classification table from `spec.md` §3 ("Item"), derived from a
/// single top-level `Stmt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Single simple declared name.
    Function(String),
    /// Dotted declaration path.
    Method(String),
    /// One or more declared local names.
    LocalBinding(Vec<String>),
    /// Dotted assignment target.
    MemberAssignment(String),
    /// No declared name; not a declaration.
    Statement,
}

impl Stmt {
    /// Classify this top-level statement per `spec.md` §3's Item table.
    pub fn classify(&self) -> ItemKind {
        match self {
            Stmt::FunctionDecl { path, .. } => {
                if path.is_simple() {
                    ItemKind::Function(path.base.clone())
                } else {
                    ItemKind::Method(path.joined())
                }
            }
            Stmt::Local { names, .. } => ItemKind::LocalBinding(names.clone()),
            Stmt::Assign { targets, .. } => {
                if let [single] = targets.as_slice()
                    && let Some(path) = dotted_path_of(single)
                    && !path.is_simple()
                {
                    return ItemKind::MemberAssignment(path.joined());
                }
                ItemKind::Statement
            }
            _ => ItemKind::Statement,
        }
    }
}

/// Recover the dotted path an lvalue/reference expression denotes, if its
/// base chain consists entirely of identifier and constant-string-indexed
/// member accesses (`spec.md` §4.3).
pub fn dotted_path_of(expr: &Expr) -> Option<DottedPath> {
    fn walk(expr: &Expr, segments: &mut Vec<String>) -> Option<String> {
        match expr {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Member { base, name } => {
                let base_name = walk(base, segments)?;
                segments.push(name.clone());
                Some(base_name)
            }
            // `t["name"]` is equivalent to `t.name` for dependency-key
            // purposes as long as the index is a constant string; any other
            // index expression does not yield a dotted path.
            Expr::Index { base, index } => {
                let Expr::Str(name) = index.as_ref() else {
                    return None;
                };
                let base_name = walk(base, segments)?;
                segments.push(name.clone());
                Some(base_name)
            }
            _ => None,
        }
    }

    let mut segments = Vec::new();
    let base = walk(expr, &mut segments)?;
    Some(DottedPath { base, segments })
}
