//! The crate-owned AST (§3). Produced by [`crate::parser`] from sqlparser's
//! own AST; consumed by [`crate::plan`] to build a [`crate::plan::Plan`].

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderId {
    Positional(String), // sqlparser token text, e.g. "$1"
    Named(String),       // identifier, e.g. "id"
}

#[derive(Debug, Clone)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    CreateTable(CreateTable),
    DropTable(DropTable),
    CreateIndex(CreateIndex),
    DropIndex(DropIndex),
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    /// `None` means no `WHERE` clause was present (rejected with `E3`).
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Delete {
    pub table: String,
    /// `None` means no `WHERE` clause was present (rejected with `E3`).
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone)]
pub struct DropTable {
    pub table: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone)]
pub struct CreateIndex {
    pub index_name: String,
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DropIndex {
    pub index_name: String,
    pub table: String,
}

/// A single projection item: `expr [AS alias]`.
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TableRef {
    Named { name: String, alias: Option<String> },
    Derived { query: Box<Select>, alias: String },
}

impl TableRef {
    pub fn alias_or_name(&self) -> &str {
        match self {
            TableRef::Named { name, alias } => alias.as_deref().unwrap_or(name),
            TableRef::Derived { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub right: TableRef,
    /// Conjunction of equalities between exactly one left-relation column
    /// and one right-relation column (validated before lowering).
    pub on: Expr,
}

#[derive(Debug, Clone)]
pub struct OrderByItem {
    pub expr: Expr,
    pub ascending: bool,
}

#[derive(Debug, Clone)]
pub struct Select {
    pub projection: Vec<SelectItem>,
    pub distinct: bool,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub union_all: Option<Box<Select>>,
    pub uses_window: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone)]
pub enum InList {
    Values(Vec<Expr>),
    Subquery(Box<Select>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Column {
        qualifier: Option<String>,
        name: String,
    },
    Literal(Value),
    Placeholder(PlaceholderId),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    In {
        expr: Box<Expr>,
        list: InList,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
    },
    IsNull(Box<Expr>),
    Exists {
        subquery: Box<Select>,
        negated: bool,
    },
    FuncCall {
        name: String,
        args: Vec<Expr>,
    },
    WindowCall {
        name: String,
        args: Vec<Expr>,
        partition_by: Vec<Expr>,
        order_by: Vec<OrderByItem>,
    },
}

impl Expr {
    /// The set of table qualifiers this expression references, e.g. `u` in
    /// `u.id`. Used by the validator to detect join-predicate shape and
    /// correlated-subquery references.
    pub fn qualifiers(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            Expr::Column {
                qualifier: Some(q), ..
            } => {
                out.insert(q.clone());
            }
            Expr::Compare { lhs, rhs, .. } => {
                lhs.qualifiers(out);
                rhs.qualifiers(out);
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.qualifiers(out);
                r.qualifiers(out);
            }
            Expr::Not(e) | Expr::IsNull(e) => e.qualifiers(out),
            Expr::In { expr, list, .. } => {
                expr.qualifiers(out);
                if let InList::Values(vs) = list {
                    for v in vs {
                        v.qualifiers(out);
                    }
                }
            }
            Expr::Between { expr, low, high } => {
                expr.qualifiers(out);
                low.qualifiers(out);
                high.qualifiers(out);
            }
            Expr::Like { expr, pattern } => {
                expr.qualifiers(out);
                pattern.qualifiers(out);
            }
            Expr::FuncCall { args, .. } => {
                for a in args {
                    a.qualifiers(out);
                }
            }
            _ => {}
        }
    }
}
