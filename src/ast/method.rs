//! The top-level method node: `name <ident>` followed by an
//! annotation section and a statement section.

use std::collections::HashMap;

use crate::intern::Symbol;
use crate::token::Pos;

use super::{Annotation, NodeId, Stmt};

/// Non-owning parent links, populated by a single post-parse walk (design
/// notes: "parent fields are lookup-only"). Looking up the root's own id
/// yields `None`.
pub type ParentMap = HashMap<NodeId, NodeId>;

#[derive(Debug, Clone)]
pub struct Method {
    pub name: Symbol,
    pub name_pos: Pos,
    pub annotations: Vec<Annotation>,
    pub statements: Vec<Stmt>,
}

impl Method {
    pub fn new(name: Symbol, name_pos: Pos) -> Self {
        Self { name, name_pos, annotations: Vec::new(), statements: Vec::new() }
    }

    /// Does this method's tree contain a regression placeholder anywhere in
    /// its annotations or statements?
    pub fn has_regression_placeholder(&self) -> bool {
        self.annotations.iter().any(annotation_has_placeholder)
            || self.statements.iter().any(stmt_has_placeholder)
    }
}

fn annotation_has_placeholder(ann: &Annotation) -> bool {
    use super::AnnotationKind::*;
    match &ann.kind {
        ParameterDecl { .. } | PropertyDecl { .. } => false,
        // `decomposition` is a pair of bare names, never an expression.
        ObjectDecl { constraint, .. } => constraint.as_ref().is_some_and(constraint_has_placeholder),
        Substitution { value, guard, .. } => {
            expr_has_placeholder(value) || guard.as_ref().is_some_and(constraint_has_placeholder)
        }
    }
}

fn stmt_has_placeholder(stmt: &Stmt) -> bool {
    use super::StmtKind::*;
    match &stmt.kind {
        Assign { target, value } => lvalue_has_placeholder(target) || expr_has_placeholder(value),
        BoundedFor { from, to, body, .. } => {
            expr_has_placeholder(from) || expr_has_placeholder(to) || body.iter().any(stmt_has_placeholder)
        }
        ObjectFor { constraint, body, .. } => {
            constraint.as_ref().is_some_and(constraint_has_placeholder) || body.iter().any(stmt_has_placeholder)
        }
    }
}

/// `LValue` indices are bare bound names, never expressions, so a target can
/// never itself carry a regression placeholder.
fn lvalue_has_placeholder(_lvalue: &super::LValue) -> bool {
    false
}

fn constraint_has_placeholder(c: &super::Constraint) -> bool {
    use super::ConstraintKind::*;
    match &c.kind {
        RelOp { left, right, .. } => expr_has_placeholder(left) || expr_has_placeholder(right),
        BinaryLogical { left, right, .. } => constraint_has_placeholder(left) || constraint_has_placeholder(right),
        Not(inner) => constraint_has_placeholder(inner),
        Predicate { .. } => false,
    }
}

fn expr_has_placeholder(expr: &super::Expr) -> bool {
    use super::ExprKind::*;
    match &expr.kind {
        RegressionPlaceholder => true,
        Number(_) | Name(_) | Subscript { .. } => false,
        BinaryOp { left, right, .. } => expr_has_placeholder(left) || expr_has_placeholder(right),
        UnaryMinus(inner) => expr_has_placeholder(inner),
        Sum { body, .. } => expr_has_placeholder(body),
        Function { arg, .. } => expr_has_placeholder(arg),
        EE { diag, off, rhs, cutoff, .. } => {
            expr_has_placeholder(diag)
                || expr_has_placeholder(off)
                || expr_has_placeholder(rhs)
                || cutoff.as_ref().is_some_and(|c| expr_has_placeholder(&c.radius))
        }
    }
}
