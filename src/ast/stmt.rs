//! Statement nodes: the executable body of a method, following
//! the annotation section.

use crate::intern::Symbol;
use crate::token::Pos;

use super::{Constraint, Expr, NodeHeader};

#[derive(Debug, Clone)]
pub enum LValue {
    /// `name = expr`
    Name(Symbol, Pos),
    /// `name[i, j] = expr`
    Subscript { name: Symbol, name_pos: Pos, indices: Vec<(Symbol, Pos)> },
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub header: NodeHeader,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(header: NodeHeader, kind: StmtKind) -> Self {
        Self { header, kind }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Assign { target: LValue, value: Box<Expr> },

    /// `for <name> = <from> to <to>: <body> end`
    BoundedFor { bound: Symbol, bound_pos: Pos, from: Box<Expr>, to: Box<Expr>, body: Vec<Stmt> },

    /// `for each <name> is atom|bond [(i-j)] [such that <constraint>]: <body> end`
    ///
    /// `decomposition` names a Bond's two endpoint Atoms, scoped to this
    /// loop's own body (see `AnnotationKind::ObjectDecl`'s
    /// doc comment for why this isn't a numeric range).
    ObjectFor {
        bound: Symbol,
        bound_pos: Pos,
        object_kind: crate::types::ObjectKind,
        decomposition: Option<(Symbol, Pos, Symbol, Pos)>,
        constraint: Option<Constraint>,
        body: Vec<Stmt>,
    },
}
