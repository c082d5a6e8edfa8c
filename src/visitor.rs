//! A shared tree-walking trait for passes that need to visit every node but
//! only act on a few (parent-linking, free-variable collection).
//!
//! This tree owns its nodes outright (see `ast` module docs), so these
//! visitors borrow plain references with no lifetime parameter of their own.

use crate::ast::{Annotation, AnnotationKind, Constraint, ConstraintKind, Expr, ExprKind, Method, Stmt, StmtKind};

pub trait Visitor {
    fn visit_method(&mut self, method: &Method) {
        walk_method(self, method);
    }

    fn visit_annotation(&mut self, annotation: &Annotation) {
        walk_annotation(self, annotation);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_constraint(&mut self, constraint: &Constraint) {
        walk_constraint(self, constraint);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_method<V: Visitor + ?Sized>(v: &mut V, method: &Method) {
    for annotation in &method.annotations {
        v.visit_annotation(annotation);
    }
    for stmt in &method.statements {
        v.visit_stmt(stmt);
    }
}

pub fn walk_annotation<V: Visitor + ?Sized>(v: &mut V, annotation: &Annotation) {
    match &annotation.kind {
        AnnotationKind::ParameterDecl { .. } => {}
        AnnotationKind::ObjectDecl { constraint, .. } => {
            if let Some(c) = constraint {
                v.visit_constraint(c);
            }
        }
        AnnotationKind::PropertyDecl { .. } => {}
        AnnotationKind::Substitution { value, guard, .. } => {
            v.visit_expr(value);
            if let Some(g) = guard {
                v.visit_constraint(g);
            }
        }
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Assign { value, .. } => v.visit_expr(value),
        StmtKind::BoundedFor { from, to, body, .. } => {
            v.visit_expr(from);
            v.visit_expr(to);
            for s in body {
                v.visit_stmt(s);
            }
        }
        StmtKind::ObjectFor { constraint, body, .. } => {
            if let Some(c) = constraint {
                v.visit_constraint(c);
            }
            for s in body {
                v.visit_stmt(s);
            }
        }
    }
}

pub fn walk_constraint<V: Visitor + ?Sized>(v: &mut V, constraint: &Constraint) {
    match &constraint.kind {
        ConstraintKind::RelOp { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ConstraintKind::BinaryLogical { left, right, .. } => {
            v.visit_constraint(left);
            v.visit_constraint(right);
        }
        ConstraintKind::Not(inner) => v.visit_constraint(inner),
        ConstraintKind::Predicate { .. } => {}
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Name(_) | ExprKind::Subscript { .. } | ExprKind::RegressionPlaceholder => {}
        ExprKind::BinaryOp { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::UnaryMinus(inner) => v.visit_expr(inner),
        ExprKind::Sum { body, .. } => v.visit_expr(body),
        ExprKind::Function { arg, .. } => v.visit_expr(arg),
        ExprKind::EE { diag, off, rhs, cutoff, .. } => {
            v.visit_expr(diag);
            v.visit_expr(off);
            v.visit_expr(rhs);
            if let Some(c) = cutoff {
                v.visit_expr(&c.radius);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[derive(Default)]
    struct Counter {
        exprs: usize,
        stmts: usize,
    }

    impl Visitor for Counter {
        fn visit_expr(&mut self, expr: &Expr) {
            self.exprs += 1;
            walk_expr(self, expr);
        }

        fn visit_stmt(&mut self, stmt: &Stmt) {
            self.stmts += 1;
            walk_stmt(self, stmt);
        }
    }

    fn parse(source: &str) -> Method {
        let mut interner = Interner::new();
        crate::parser::parse(source, &mut interner).unwrap().0
    }

    #[test]
    fn walks_every_statement_in_a_loop_body() {
        let method = parse("name m\nfor k = 1 to 3:\n  x = k\n  y = k + 1\nend\n");
        let mut counter = Counter::default();
        counter.visit_method(&method);
        // The BoundedFor itself, plus its two-statement body.
        assert_eq!(counter.stmts, 3);
    }

    #[test]
    fn walks_into_annotation_substitution_values_and_guards() {
        let method = parse("name m\nparameter A is atom\ni is atom\nchi[i] = A[i] if element(i, H)\nk = 1\n");
        let mut counter = Counter::default();
        counter.visit_method(&method);
        // A[i] (the substitution's value) plus k's own RHS number literal.
        assert!(counter.exprs >= 2);
    }

    #[test]
    fn default_visitor_impl_recurses_through_every_node_without_overrides() {
        struct NoOp;
        impl Visitor for NoOp {}

        let method = parse("name m\nfor each a is atom:\n  x = a + 1\nend\n");
        // Exercises the blanket default methods directly; panics on a cycle
        // or an unreachable match arm would fail the test.
        NoOp.visit_method(&method);
    }
}
