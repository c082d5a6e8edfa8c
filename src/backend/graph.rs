//! Graph back end: a directed-graph description of the typed
//! AST, one node per AST node plus one per declared symbol, child edges
//! labeled with the field name they came from. Grounded on
//! `original_source/ccl/generators/graphviz.py`'s generic field walk, rebuilt
//! as a typed recursive traversal over tagged AST variants rather than
//! runtime reflection (design notes: "no reflection").

use petgraph::dot::Dot;
use petgraph::graph::{Graph, NodeIndex};

use crate::ast::{Annotation, AnnotationKind, Constraint, ConstraintKind, Expr, ExprKind, LValue, Method, Stmt, StmtKind};
use crate::intern::Interner;
use crate::scope::{SymbolKind, SymbolTable};

use super::{sanitize_ident, BackendError, GeneratedFile};

pub fn generate(method: &Method, symbols: &SymbolTable, interner: &Interner) -> Result<Vec<GeneratedFile>, BackendError> {
    let mut builder = GraphBuilder::new(interner);
    let root = builder.graph.add_node("Method".to_string());
    builder.visit_method(method, root);
    builder.visit_symbol_table(symbols, root);

    let contents = format!("{}", Dot::new(&builder.graph));
    Ok(vec![GeneratedFile { relative_path: "method.dot".to_string(), contents }])
}

struct GraphBuilder<'a> {
    graph: Graph<String, String>,
    interner: &'a Interner,
}

impl<'a> GraphBuilder<'a> {
    fn new(interner: &'a Interner) -> Self {
        Self { graph: Graph::new(), interner }
    }

    fn name(&self, sym: crate::intern::Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn node(&mut self, label: impl Into<String>) -> NodeIndex {
        self.graph.add_node(label.into())
    }

    fn edge(&mut self, from: NodeIndex, to: NodeIndex, field: &str) {
        self.graph.add_edge(from, to, field.to_string());
    }

    fn visit_method(&mut self, method: &Method, root: NodeIndex) {
        for (i, ann) in method.annotations.iter().enumerate() {
            let n = self.visit_annotation(ann);
            self.edge(root, n, &format!("annotations:{i}"));
        }
        for (i, stmt) in method.statements.iter().enumerate() {
            let n = self.visit_stmt(stmt);
            self.edge(root, n, &format!("statements:{i}"));
        }
    }

    fn visit_annotation(&mut self, ann: &Annotation) -> NodeIndex {
        match &ann.kind {
            AnnotationKind::ParameterDecl { name, kind, .. } => {
                let n = self.node("ParameterDecl");
                let label = format!("name = {}\nkind = {kind:?}", self.name(*name));
                self.attach_properties(n, &label);
                n
            }
            AnnotationKind::ObjectDecl { name, object_kind, decomposition, constraint, .. } => {
                let n = self.node("ObjectDecl");
                let label = format!("name = {}\nobject_kind = {object_kind}", self.name(*name));
                self.attach_properties(n, &label);
                if let Some((idx1, _, idx2, _)) = decomposition {
                    let p = self.node(format!("{}-{}", self.name(*idx1), self.name(*idx2)));
                    self.edge(n, p, "decomposition");
                }
                if let Some(c) = constraint {
                    let cn = self.visit_constraint(c);
                    self.edge(n, cn, "constraint");
                }
                n
            }
            AnnotationKind::PropertyDecl { name, property, of_element, .. } => {
                let n = self.node("PropertyDecl");
                let mut label = format!("name = {}\nproperty = {property}", self.name(*name));
                if let Some((el, _)) = of_element {
                    label.push_str(&format!("\nof_element = {}", self.name(*el)));
                }
                self.attach_properties(n, &label);
                n
            }
            AnnotationKind::Substitution { name, indices, value, guard, .. } => {
                let n = self.node("Substitution");
                let idx_names: Vec<&str> = indices.iter().map(|(s, _)| self.name(*s)).collect();
                self.attach_properties(n, &format!("name = {}\nindices = {:?}", self.name(*name), idx_names));
                let vn = self.visit_expr(value);
                self.edge(n, vn, "value");
                if let Some(g) = guard {
                    let gn = self.visit_constraint(g);
                    self.edge(n, gn, "guard");
                }
                n
            }
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> NodeIndex {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let n = self.node("Assign");
                let tn = self.visit_lvalue(target);
                self.edge(n, tn, "target");
                let vn = self.visit_expr(value);
                self.edge(n, vn, "value");
                n
            }
            StmtKind::BoundedFor { bound, from, to, body, .. } => {
                let n = self.node("BoundedFor");
                self.attach_properties(n, &format!("bound = {}", self.name(*bound)));
                let fn_ = self.visit_expr(from);
                self.edge(n, fn_, "from");
                let tn = self.visit_expr(to);
                self.edge(n, tn, "to");
                for (i, s) in body.iter().enumerate() {
                    let sn = self.visit_stmt(s);
                    self.edge(n, sn, &format!("body:{i}"));
                }
                n
            }
            StmtKind::ObjectFor { bound, object_kind, decomposition, constraint, body, .. } => {
                let n = self.node("ObjectFor");
                self.attach_properties(n, &format!("bound = {}\nobject_kind = {object_kind}", self.name(*bound)));
                if let Some((idx1, _, idx2, _)) = decomposition {
                    let p = self.node(format!("{}-{}", self.name(*idx1), self.name(*idx2)));
                    self.edge(n, p, "decomposition");
                }
                if let Some(c) = constraint {
                    let cn = self.visit_constraint(c);
                    self.edge(n, cn, "constraint");
                }
                for (i, s) in body.iter().enumerate() {
                    let sn = self.visit_stmt(s);
                    self.edge(n, sn, &format!("body:{i}"));
                }
                n
            }
        }
    }

    fn visit_lvalue(&mut self, lvalue: &LValue) -> NodeIndex {
        match lvalue {
            LValue::Name(name, _) => self.node(format!("Name\nname = {}", self.name(*name))),
            LValue::Subscript { name, indices, .. } => {
                let idx: Vec<&str> = indices.iter().map(|(s, _)| self.name(*s)).collect();
                self.node(format!("Subscript\nname = {}\nindices = {:?}", self.name(*name), idx))
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) -> NodeIndex {
        let result_type = expr.result_type.as_ref().map(|t| t.to_string()).unwrap_or_default();
        match &expr.kind {
            ExprKind::Number(n) => self.node(format!("Number\nvalue = {n:?}\nresult_type = {result_type}")),
            ExprKind::Name(name) => self.node(format!("Name\nname = {}\nresult_type = {result_type}", self.name(*name))),
            ExprKind::Subscript { name, indices, .. } => {
                let n = self.node(format!("Subscript\nname = {}\nresult_type = {result_type}", self.name(*name)));
                for (i, (idx, _)) in indices.iter().enumerate() {
                    let idn = self.node(format!("Name\nname = {}", self.name(*idx)));
                    self.edge(n, idn, &format!("indices:{i}"));
                }
                n
            }
            ExprKind::BinaryOp { op, left, right } => {
                let n = self.node(format!("BinaryOp\nop = {op:?}\nresult_type = {result_type}"));
                let l = self.visit_expr(left);
                self.edge(n, l, "left");
                let r = self.visit_expr(right);
                self.edge(n, r, "right");
                n
            }
            ExprKind::UnaryMinus(inner) => {
                let n = self.node(format!("UnaryMinus\nresult_type = {result_type}"));
                let i = self.visit_expr(inner);
                self.edge(n, i, "expr");
                n
            }
            ExprKind::Sum { bound, body, .. } => {
                let n = self.node(format!("Sum\nbound = {}\nresult_type = {result_type}", self.name(*bound)));
                let b = self.visit_expr(body);
                self.edge(n, b, "body");
                n
            }
            ExprKind::Function { name, arg, .. } => {
                let n = self.node(format!("Function\nname = {}\nresult_type = {result_type}", self.name(*name)));
                let a = self.visit_expr(arg);
                self.edge(n, a, "arg");
                n
            }
            ExprKind::EE { row, col, diag, off, rhs, cutoff, .. } => {
                let n = self.node(format!(
                    "EE\nrow = {}\ncol = {}\nresult_type = {result_type}",
                    self.name(*row),
                    self.name(*col)
                ));
                let d = self.visit_expr(diag);
                self.edge(n, d, "diag");
                let o = self.visit_expr(off);
                self.edge(n, o, "off");
                let r = self.visit_expr(rhs);
                self.edge(n, r, "rhs");
                if let Some(cutoff) = cutoff {
                    let c = self.visit_expr(&cutoff.radius);
                    self.edge(n, c, "cutoff.radius");
                }
                n
            }
            ExprKind::RegressionPlaceholder => self.node("RegressionPlaceholder"),
        }
    }

    fn visit_constraint(&mut self, constraint: &Constraint) -> NodeIndex {
        match &constraint.kind {
            ConstraintKind::RelOp { op, left, right } => {
                let n = self.node(format!("RelOp\nop = {op:?}"));
                let l = self.visit_expr(left);
                self.edge(n, l, "left");
                let r = self.visit_expr(right);
                self.edge(n, r, "right");
                n
            }
            ConstraintKind::BinaryLogical { op, left, right } => {
                let n = self.node(format!("BinaryLogical\nop = {op:?}"));
                let l = self.visit_constraint(left);
                self.edge(n, l, "left");
                let r = self.visit_constraint(right);
                self.edge(n, r, "right");
                n
            }
            ConstraintKind::Not(inner) => {
                let n = self.node("Not");
                let i = self.visit_constraint(inner);
                self.edge(n, i, "constraint");
                n
            }
            ConstraintKind::Predicate { name, args, .. } => {
                let n = self.node(format!("Predicate\nname = {}", self.name(*name)));
                for (i, arg) in args.iter().enumerate() {
                    let label = match arg {
                        crate::ast::PredicateArg::Name(s, _) => self.name(*s).to_string(),
                        crate::ast::PredicateArg::Number(lit, _) => format!("{lit:?}"),
                        crate::ast::PredicateArg::Str(s, _) => s.clone(),
                    };
                    let an = self.node(label);
                    self.edge(n, an, &format!("args:{i}"));
                }
                n
            }
        }
    }

    /// Attaches a `symbol_table` scope edge from `root` to one node per
    /// declared global symbol.
    fn visit_symbol_table(&mut self, symbols: &SymbolTable, root: NodeIndex) {
        let table_node = self.node("SymbolTable");
        self.edge(root, table_node, "symbol_table");

        let mut names: Vec<(&crate::intern::Symbol, &crate::scope::SymbolEntry)> = symbols.globals.iter().collect();
        names.sort_by_key(|(sym, _)| sanitize_ident(self.name(**sym)));
        for (sym, entry) in names {
            let kind_name = match &entry.kind {
                SymbolKind::Parameter(_) => "Parameter",
                SymbolKind::Object { .. } => "Object",
                SymbolKind::Function(_) => "Function",
                SymbolKind::Variable(_) => "Variable",
                SymbolKind::Substitution(_) => "Substitution",
                SymbolKind::Constant { .. } => "Constant",
            };
            let n = self.node(format!("{kind_name}\nname = {}\ntype = {}", self.name(*sym), entry.ty()));
            self.edge(table_node, n, "symbols");
        }
    }

    fn attach_properties(&mut self, node: NodeIndex, label: &str) {
        self.graph[node] = format!("{}\n{}", self.graph[node], label);
    }
}
