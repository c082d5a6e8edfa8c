//! Builds the `ParentMap` in a single post-parse walk (design notes: parent
//! pointers are non-owning, looked up by `NodeId` rather than embedded).

use crate::visitor::{self, Visitor};

use super::{Annotation, Constraint, Expr, Method, ParentMap, Stmt};

pub struct ParentLinker {
    stack: Vec<super::NodeId>,
    parents: ParentMap,
}

impl ParentLinker {
    pub fn new() -> Self {
        Self { stack: Vec::new(), parents: ParentMap::new() }
    }

    pub fn link(method: &Method) -> ParentMap {
        let mut linker = Self::new();
        linker.visit_method(method);
        linker.parents
    }

    fn record(&mut self, id: super::NodeId) {
        if let Some(&parent) = self.stack.last() {
            self.parents.insert(id, parent);
        }
    }
}

impl Visitor for ParentLinker {
    fn visit_annotation(&mut self, annotation: &Annotation) {
        self.record(annotation.header.id);
        self.stack.push(annotation.header.id);
        visitor::walk_annotation(self, annotation);
        self.stack.pop();
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        self.record(stmt.header.id);
        self.stack.push(stmt.header.id);
        visitor::walk_stmt(self, stmt);
        self.stack.pop();
    }

    fn visit_constraint(&mut self, constraint: &Constraint) {
        self.record(constraint.header.id);
        self.stack.push(constraint.header.id);
        visitor::walk_constraint(self, constraint);
        self.stack.pop();
    }

    fn visit_expr(&mut self, expr: &Expr) {
        self.record(expr.header.id);
        self.stack.push(expr.header.id);
        visitor::walk_expr(self, expr);
        self.stack.pop();
    }
}
