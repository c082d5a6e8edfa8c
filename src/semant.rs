//! Semantic analysis: builds the symbol table and assigns `result_type` to
//! every expression node.
//!
//! Grounded directly on `original_source/ccl/symboltable.py`'s
//! `SymbolTableBuilder`: the same global/method table split, the same
//! per-node typing rules (`visit_Name`, `visit_Subscript`, `visit_Assign`,
//! `visit_BinaryOp`, `visit_For`/`visit_ForEach`, `visit_Sum`, `visit_EE`,
//! `visit_Substitution`, `visit_Predicate`), and the same requirement that
//! every Substitution symbol carry an unconditional default rule.
//!
//! One deliberate simplification from the original (see DESIGN.md): a
//! Substitution's rule bodies are type-checked once, at declaration time,
//! with their index placeholders bound as temporary Atom symbols; the
//! resulting value type is cached on the symbol. A use site only checks
//! index arity and that each actual argument is a currently-iterating
//! object, rather than re-running the original's fully dynamic, per-call
//! alpha-renamed re-analysis.

use std::collections::HashSet;

use crate::ast::{
    Annotation, AnnotationKind, BinOp, Constraint, ConstraintKind, Expr, ExprKind, LValue, LogicalOp, Method,
    PredicateArg, RelOp, Stmt, StmtKind,
};
use crate::catalog::{is_math_function, FUNCTIONS, PREDICATES};
use crate::elements::is_known_element;
use crate::error::{CompileError, CompileResult};
use crate::intern::{Interner, Symbol};
use crate::scope::{ScopeStack, SubstitutionData, SubstitutionRule, SymbolEntry, SymbolKind, SymbolTable, GLOBAL_LEVEL, METHOD_LEVEL};
use crate::token::Pos;
use crate::types::{ArgType, FunctionReturn, Numeric, ObjectKind, ParameterKind, Type};

pub struct Analyzer<'a> {
    interner: &'a Interner,
    scopes: ScopeStack,
    /// Names currently bound by an enclosing `for`/`for each`/`sum`/`EE`
    /// (mirrors `_iterating_over`).
    iterating_over: HashSet<Symbol>,
}

/// Runs semantic analysis over `method`, assigning `result_type` on every
/// expression it touches and returning the resulting symbol table. `method`
/// must not yet have been analyzed; running twice would double-define
/// method-scope variables.
pub fn analyze(method: &mut Method, interner: &Interner) -> CompileResult<SymbolTable> {
    let mut analyzer = Analyzer::new(interner);
    analyzer.visit_method(method)?;
    Ok(analyzer.scopes.snapshot_persistent())
}

impl<'a> Analyzer<'a> {
    fn new(interner: &'a Interner) -> Self {
        Self { interner, scopes: ScopeStack::new(), iterating_over: HashSet::new() }
    }

    fn name_of(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn seed_builtins(&mut self) {
        for &name in crate::catalog::math_function_names() {
            if let Some(sym) = self.interner.lookup(name) {
                let sig = FUNCTIONS.get(name).expect("math function name must be cataloged").clone();
                self.scopes.bind_at(GLOBAL_LEVEL, sym, SymbolEntry::new(SymbolKind::Function(sig), Pos::default()));
            }
        }
        // "q is always a vector of charges" (original_source's
        // SymbolTableBuilder.__init__): every method may reference `q` as
        // the per-atom charge vector without declaring it.
        if let Some(q) = self.interner.lookup("q") {
            self.scopes.bind_at(
                GLOBAL_LEVEL,
                q,
                SymbolEntry::new(SymbolKind::Variable(Type::Array(vec![ObjectKind::Atom])), Pos::default()),
            );
        }
    }

    fn visit_method(&mut self, method: &mut Method) -> CompileResult<()> {
        self.scopes.push_scope(); // GLOBAL_LEVEL
        self.scopes.push_scope(); // METHOD_LEVEL
        self.seed_builtins();

        for ann in method.annotations.iter_mut() {
            if matches!(ann.kind, AnnotationKind::ParameterDecl { .. }) {
                self.visit_parameter_decl(ann)?;
            }
        }
        for ann in method.annotations.iter_mut() {
            if matches!(ann.kind, AnnotationKind::ObjectDecl { .. }) {
                self.visit_object_decl(ann)?;
            }
        }
        for ann in method.annotations.iter_mut() {
            if matches!(ann.kind, AnnotationKind::PropertyDecl { .. }) {
                self.visit_property_decl(ann)?;
            }
        }
        for ann in method.annotations.iter_mut() {
            if matches!(ann.kind, AnnotationKind::Substitution { .. }) {
                self.visit_substitution_decl(ann)?;
            }
        }
        self.check_substitutions_default()?;

        for stmt in method.statements.iter_mut() {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_substitutions_default(&self) -> CompileResult<()> {
        for (name, entry) in self.scopes.global_entries() {
            if let SymbolKind::Substitution(data) = &entry.kind {
                if !data.has_default() {
                    return Err(CompileError::symbol(
                        entry.declared_at,
                        format!("no default option specified for substitution symbol {}", self.name_of(*name)),
                    ));
                }
            }
        }
        Ok(())
    }

    // ---- annotations ----------------------------------------------------

    fn visit_parameter_decl(&mut self, ann: &Annotation) -> CompileResult<()> {
        let AnnotationKind::ParameterDecl { name, name_pos, kind } = &ann.kind else { unreachable!() };
        if self.scopes.is_bound_at(GLOBAL_LEVEL, *name) {
            return Err(CompileError::symbol(*name_pos, format!("symbol {} already defined", self.name_of(*name))));
        }
        self.scopes.bind_at(GLOBAL_LEVEL, *name, SymbolEntry::new(SymbolKind::Parameter(*kind), *name_pos));
        Ok(())
    }

    fn visit_object_decl(&mut self, ann: &mut Annotation) -> CompileResult<()> {
        let AnnotationKind::ObjectDecl { name, name_pos, object_kind, decomposition, constraint } = &mut ann.kind
        else {
            unreachable!()
        };
        if self.scopes.is_bound_at(GLOBAL_LEVEL, *name) {
            return Err(CompileError::symbol(*name_pos, format!("symbol {} already defined", self.name_of(*name))));
        }
        self.bind_decomposition(*name_pos, *object_kind, decomposition.as_ref(), GLOBAL_LEVEL)?;
        // The declared constraint is type-checked lazily, at each use site
        // that actually iterates the object (mirrors the original: a bare
        // `ObjectSymbol.constraints` is only visited from `visit_For`/`visit_Sum`
        // once the object's own bound name is in scope as the iterator).
        self.scopes.bind_at(
            GLOBAL_LEVEL,
            *name,
            SymbolEntry::new(SymbolKind::Object { kind: *object_kind, constraint: constraint.clone() }, *name_pos),
        );
        Ok(())
    }

    /// Binds a `(idx1-idx2)` bond decomposition's two Atom endpoints at
    /// `level`. Only a Bond may be decomposed — an Atom has no endpoints to
    /// name.
    fn bind_decomposition(
        &mut self,
        owner_pos: Pos,
        object_kind: ObjectKind,
        decomposition: Option<&(Symbol, Pos, Symbol, Pos)>,
        level: usize,
    ) -> CompileResult<()> {
        let Some((idx1, idx1_pos, idx2, idx2_pos)) = decomposition else { return Ok(()) };
        if object_kind != ObjectKind::Bond {
            return Err(CompileError::type_error(owner_pos, "only a bond can be decomposed into two atoms"));
        }
        if idx1 == idx2 {
            return Err(CompileError::symbol(*idx2_pos, "a bond decomposition's two endpoint names must differ"));
        }
        for (endpoint, pos) in [(*idx1, *idx1_pos), (*idx2, *idx2_pos)] {
            if self.scopes.is_bound_at(level, endpoint) {
                return Err(CompileError::symbol(pos, format!("symbol {} already defined", self.name_of(endpoint))));
            }
        }
        self.scopes.bind_at(
            level,
            *idx1,
            SymbolEntry::new(SymbolKind::Object { kind: ObjectKind::Atom, constraint: None }, *idx1_pos),
        );
        self.scopes.bind_at(
            level,
            *idx2,
            SymbolEntry::new(SymbolKind::Object { kind: ObjectKind::Atom, constraint: None }, *idx2_pos),
        );
        Ok(())
    }

    fn visit_property_decl(&mut self, ann: &Annotation) -> CompileResult<()> {
        let AnnotationKind::PropertyDecl { name, name_pos, property, of_element } = &ann.kind else { unreachable!() };
        let signature = FUNCTIONS
            .get(property.as_str())
            .ok_or_else(|| CompileError::symbol(*name_pos, format!("property {property} is not known")))?
            .clone();

        if self.scopes.is_bound_at(GLOBAL_LEVEL, *name) {
            return Err(CompileError::symbol(*name_pos, format!("symbol {} already defined", self.name_of(*name))));
        }

        let entry = if let Some((elem_sym, elem_pos)) = of_element {
            if signature.args.len() != 1 || signature.args[0] != ArgType::Object(ObjectKind::Atom) {
                return Err(CompileError::type_error(*name_pos, format!("{property} is not a per-atom property")));
            }
            let element = self.name_of(*elem_sym).to_string();
            if !is_known_element(&element) {
                return Err(CompileError::type_error(*elem_pos, format!("unknown element {element}")));
            }
            SymbolKind::Constant { signature, element }
        } else {
            SymbolKind::Function(signature)
        };

        self.scopes.bind_at(GLOBAL_LEVEL, *name, SymbolEntry::new(entry, *name_pos));
        Ok(())
    }

    /// Type-checks one `<name>[<indices>] = <value> [if <guard>]` rule and
    /// merges it into the substitution symbol's accumulated rule set, at
    /// GLOBAL_LEVEL regardless of how many rules for the same name have
    /// already been declared — substitution symbols are globally visible,
    /// independent of declaration order.
    fn visit_substitution_decl(&mut self, ann: &mut Annotation) -> CompileResult<()> {
        let AnnotationKind::Substitution { name, name_pos, indices, value, guard } = &mut ann.kind else {
            unreachable!()
        };
        let name = *name;
        let name_pos = *name_pos;

        self.scopes.push_scope();
        for (idx, idx_pos) in indices.iter() {
            self.iterating_over.insert(*idx);
            self.scopes.bind(*idx, SymbolEntry::new(SymbolKind::Object { kind: ObjectKind::Atom, constraint: None }, *idx_pos));
        }

        let typed = (|| {
            if let Some(g) = guard {
                self.type_constraint(g)?;
            }
            self.type_expr(value)
        })();

        self.scopes.pop_scope();
        for (idx, _) in indices.iter() {
            self.iterating_over.remove(idx);
        }
        let value_type = typed?;

        let rule = SubstitutionRule { guard: guard.clone(), value_type: value_type.clone(), body: (**value).clone() };
        let arity = indices.len();

        match self.scopes.get_at(GLOBAL_LEVEL, name).cloned() {
            None => {
                let data = SubstitutionData { indices: indices.iter().map(|(s, _)| *s).collect(), rules: vec![rule] };
                self.scopes.bind_at(GLOBAL_LEVEL, name, SymbolEntry::new(SymbolKind::Substitution(data), name_pos));
                Ok(())
            }
            Some(entry) => {
                let SymbolKind::Substitution(existing) = &entry.kind else {
                    return Err(CompileError::symbol(name_pos, format!("symbol {} already defined", self.name_of(name))));
                };
                if existing.indices.len() != arity {
                    return Err(CompileError::type_error(
                        name_pos,
                        format!("substitution {} redeclared with a different number of indices", self.name_of(name)),
                    ));
                }
                if let Some(first_ty) = existing.value_type() {
                    if *first_ty != value_type {
                        return Err(CompileError::type_error(
                            name_pos,
                            format!("substitution {} redeclared with a different result type", self.name_of(name)),
                        ));
                    }
                }
                if guard.is_none() && existing.has_default() {
                    return Err(CompileError::symbol(
                        name_pos,
                        format!("substitution {} already has a default option", self.name_of(name)),
                    ));
                }
                let new_guard_sig = guard.as_ref().map(|g| constraint_signature(self.interner, g));
                if existing.rules.iter().any(|r| r.guard.as_ref().map(|g| constraint_signature(self.interner, g)) == new_guard_sig) {
                    return Err(CompileError::symbol(name_pos, format!("substitution {} has a duplicate guard", self.name_of(name))));
                }

                let mut updated = existing.clone();
                updated.rules.push(rule);
                self.scopes.bind_at(GLOBAL_LEVEL, name, SymbolEntry::new(SymbolKind::Substitution(updated), entry.declared_at));
                Ok(())
            }
        }
    }

    // ---- statements -------------------------------------------------------

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> CompileResult<()> {
        match &mut stmt.kind {
            StmtKind::Assign { target, value } => self.visit_assign(target, value),
            StmtKind::BoundedFor { bound, bound_pos, from, to, body } => {
                self.visit_bounded_for(*bound, *bound_pos, from, to, body)
            }
            StmtKind::ObjectFor { bound, bound_pos, object_kind, decomposition, constraint, body } => {
                self.visit_object_for(*bound, *bound_pos, *object_kind, decomposition, constraint, body)
            }
        }
    }

    fn visit_assign(&mut self, target: &mut LValue, value: &mut Expr) -> CompileResult<()> {
        let rtype = self.type_expr(value)?;
        if !matches!(rtype, Type::Numeric(_) | Type::Array(_)) {
            return Err(CompileError::type_error(value.header.pos, format!("only numbers and arrays can be assigned, not {rtype}")));
        }

        match target {
            LValue::Name(name, name_pos) => {
                if self.iterating_over.contains(name) {
                    return Err(CompileError::type_error(*name_pos, format!("cannot assign to loop variable {}", self.name_of(*name))));
                }
                match self.scopes.lookup(*name) {
                    Some(entry) => match &entry.kind {
                        SymbolKind::Substitution(_) => {
                            Err(CompileError::symbol(*name_pos, format!("cannot assign to a substitution symbol {}", self.name_of(*name))))
                        }
                        SymbolKind::Parameter(_) => {
                            Err(CompileError::symbol(*name_pos, format!("cannot assign to a parameter symbol {}", self.name_of(*name))))
                        }
                        _ => {
                            let lhs_ty = entry.ty();
                            if assignable(&lhs_ty, &rtype) {
                                Ok(())
                            } else {
                                Err(CompileError::type_error(
                                    *name_pos,
                                    format!("cannot assign {rtype} to the variable {} of type {lhs_ty}", self.name_of(*name)),
                                ))
                            }
                        }
                    },
                    None => {
                        self.scopes.bind_at(METHOD_LEVEL, *name, SymbolEntry::new(SymbolKind::Variable(rtype), *name_pos));
                        Ok(())
                    }
                }
            }
            LValue::Subscript { name, name_pos, indices } => {
                let mut index_types = Vec::with_capacity(indices.len());
                for (idx, idx_pos) in indices.iter() {
                    index_types.push(self.type_name_use(*idx, *idx_pos)?);
                }
                match self.scopes.lookup(*name) {
                    Some(entry) => match &entry.kind {
                        SymbolKind::Substitution(_) => {
                            Err(CompileError::symbol(*name_pos, format!("cannot assign to a substitution symbol {}", self.name_of(*name))))
                        }
                        _ => {
                            let lhs_ty = entry.ty();
                            let Some(shape) = lhs_ty.as_array_shape() else {
                                return Err(CompileError::type_error(*name_pos, format!("cannot assign to non-array type {lhs_ty}")));
                            };
                            if shape.iter().map(|k| Type::Object(*k)).collect::<Vec<_>>() != index_types {
                                return Err(CompileError::type_error(
                                    *name_pos,
                                    format!("cannot index array of type {lhs_ty} with the given index types"),
                                ));
                            }
                            Ok(())
                        }
                    },
                    None => {
                        let shape: CompileResult<Vec<ObjectKind>> = index_types
                            .iter()
                            .map(|t| match t {
                                Type::Object(k) => Ok(*k),
                                other => Err(CompileError::type_error(*name_pos, format!("cannot index with something other than Atom or Bond, got {other}"))),
                            })
                            .collect();
                        let shape = shape?;
                        self.scopes.bind_at(
                            METHOD_LEVEL,
                            *name,
                            SymbolEntry::new(SymbolKind::Variable(Type::Array(shape)), *name_pos),
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    fn visit_bounded_for(
        &mut self,
        bound: Symbol,
        bound_pos: Pos,
        from: &mut Expr,
        to: &mut Expr,
        body: &mut [Stmt],
    ) -> CompileResult<()> {
        self.type_expr(from)?;
        self.type_expr(to)?;

        if self.scopes.lookup(bound).is_some() {
            return Err(CompileError::symbol(bound_pos, format!("symbol {} already defined", self.name_of(bound))));
        }

        self.iterating_over.insert(bound);
        self.scopes.push_scope();
        self.scopes.bind(bound, SymbolEntry::new(SymbolKind::Variable(Type::Numeric(Numeric::Int)), bound_pos));

        let result = self.visit_body(body);

        self.scopes.pop_scope();
        self.iterating_over.remove(&bound);
        result
    }

    fn visit_object_for(
        &mut self,
        bound: Symbol,
        bound_pos: Pos,
        object_kind: ObjectKind,
        decomposition: &mut Option<(Symbol, Pos, Symbol, Pos)>,
        constraint: &mut Option<Constraint>,
        body: &mut [Stmt],
    ) -> CompileResult<()> {
        if self.scopes.lookup(bound).is_some() {
            return Err(CompileError::symbol(bound_pos, format!("symbol {} already defined", self.name_of(bound))));
        }

        self.iterating_over.insert(bound);
        self.scopes.push_scope();
        self.scopes.bind(bound, SymbolEntry::new(SymbolKind::Object { kind: object_kind, constraint: constraint.clone() }, bound_pos));

        let result = (|| {
            // The decomposition's two atom names are scoped to this loop's
            // own body only, not the enclosing method (unlike an
            // `ObjectDecl`'s, which lands at GLOBAL_LEVEL).
            let level = self.scopes.depth() - 1;
            self.bind_decomposition(bound_pos, object_kind, decomposition.as_ref(), level)?;
            if let Some((idx1, _, idx2, _)) = decomposition.as_ref() {
                self.iterating_over.insert(*idx1);
                self.iterating_over.insert(*idx2);
            }
            if let Some(c) = constraint {
                self.type_constraint(c)?;
            }
            self.visit_body(body)
        })();

        if let Some((idx1, _, idx2, _)) = decomposition {
            self.iterating_over.remove(idx1);
            self.iterating_over.remove(idx2);
        }
        self.scopes.pop_scope();
        self.iterating_over.remove(&bound);
        result
    }

    fn visit_body(&mut self, body: &mut [Stmt]) -> CompileResult<()> {
        for stmt in body.iter_mut() {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    // ---- expressions --------------------------------------------------

    fn type_expr(&mut self, expr: &mut Expr) -> CompileResult<Type> {
        let ty = self.compute_expr_type(expr)?;
        expr.result_type = Some(ty.clone());
        Ok(ty)
    }

    fn compute_expr_type(&mut self, expr: &mut Expr) -> CompileResult<Type> {
        match &mut expr.kind {
            ExprKind::Number(crate::ast::NumberLit::Int(_)) => Ok(Type::Numeric(Numeric::Int)),
            ExprKind::Number(crate::ast::NumberLit::Float(_)) => Ok(Type::Numeric(Numeric::Float)),
            ExprKind::RegressionPlaceholder => Ok(Type::Unresolved),
            ExprKind::Name(name) => self.type_name_use(*name, expr.header.pos),
            ExprKind::Subscript { name, name_pos, indices } => {
                let name = *name;
                let name_pos = *name_pos;
                let indices = indices.clone();
                self.type_subscript(name, name_pos, &indices)
            }
            ExprKind::BinaryOp { op, left, right } => {
                let op = *op;
                let ltype = self.type_expr(left)?;
                let rtype = self.type_expr(right)?;
                binary_op_type(op, &ltype, &rtype, expr.header.pos)
            }
            ExprKind::UnaryMinus(inner) => self.type_expr(inner),
            ExprKind::Sum { bound, bound_pos, body } => self.type_sum(*bound, *bound_pos, body),
            ExprKind::Function { name, name_pos, arg } => {
                let name = *name;
                let name_pos = *name_pos;
                self.type_function_call(name, name_pos, arg)
            }
            ExprKind::EE { row, row_pos, col, col_pos, diag, off, rhs, cutoff: _ } => {
                self.type_ee(*row, *row_pos, *col, *col_pos, diag, off, rhs, expr.header.pos)
            }
        }
    }

    fn type_name_use(&mut self, name: Symbol, pos: Pos) -> CompileResult<Type> {
        let entry = self
            .scopes
            .lookup(name)
            .ok_or_else(|| CompileError::symbol(pos, format!("symbol {} not defined", self.name_of(name))))?;
        Ok(match &entry.kind {
            SymbolKind::Parameter(ParameterKind::CommonParameter) => Type::Numeric(Numeric::Float),
            other => other.symbol_type(),
        })
    }

    fn type_subscript(&mut self, name: Symbol, name_pos: Pos, indices: &[(Symbol, Pos)]) -> CompileResult<Type> {
        let entry = self
            .scopes
            .lookup(name)
            .cloned()
            .ok_or_else(|| CompileError::symbol(name_pos, format!("symbol {} not defined", self.name_of(name))))?;

        let mut index_types = Vec::with_capacity(indices.len());
        for (idx, idx_pos) in indices {
            let t = self.type_name_use(*idx, *idx_pos)?;
            if matches!(t, Type::Object(_)) && !self.iterating_over.contains(idx) {
                return Err(CompileError::symbol(*idx_pos, format!("object {} not bound to any for/for each/sum", self.name_of(*idx))));
            }
            index_types.push(t);
        }

        match &entry.kind {
            SymbolKind::Parameter(kind) => {
                let ok = match kind {
                    ParameterKind::AtomParameter => index_types == [Type::Object(ObjectKind::Atom)],
                    ParameterKind::BondParameter => {
                        index_types == [Type::Object(ObjectKind::Bond)]
                            || index_types == [Type::Object(ObjectKind::Atom), Type::Object(ObjectKind::Atom)]
                    }
                    ParameterKind::CommonParameter => {
                        return Err(CompileError::type_error(name_pos, "cannot index a common parameter"));
                    }
                };
                if !ok {
                    return Err(CompileError::type_error(name_pos, format!("cannot index parameter {} with the given index types", self.name_of(name))));
                }
                // The (Atom, Atom) shape requires a bond object relating the
                // two atoms; this grammar has no construct that establishes
                // such a relation (see DESIGN.md), so it is always rejected.
                if index_types.len() == 2 {
                    return Err(CompileError::symbol(name_pos, "no bond object relates these two atoms"));
                }
                Ok(Type::Numeric(Numeric::Float))
            }
            SymbolKind::Variable(Type::Array(shape)) => {
                let expected: Vec<Type> = shape.iter().map(|k| Type::Object(*k)).collect();
                if expected != index_types {
                    return Err(CompileError::type_error(name_pos, format!("cannot index array of shape {:?} with the given index types", shape)));
                }
                Ok(Type::Numeric(Numeric::Float))
            }
            SymbolKind::Function(sig) => {
                let expected: Vec<Type> = sig
                    .args
                    .iter()
                    .map(|a| match a {
                        ArgType::Object(k) => Type::Object(*k),
                        ArgType::Numeric => Type::Numeric(Numeric::Float),
                        ArgType::String => Type::String,
                        ArgType::Array(shape) => Type::Array(shape.clone()),
                    })
                    .collect();
                if expected != index_types {
                    return Err(CompileError::type_error(name_pos, format!("cannot call {} with the given argument types", self.name_of(name))));
                }
                Ok(match &sig.ret {
                    FunctionReturn::Numeric(n) => Type::Numeric(*n),
                    FunctionReturn::Array(shape) => Type::Array(shape.clone()),
                })
            }
            SymbolKind::Substitution(data) => {
                if data.indices.len() != index_types.len() {
                    return Err(CompileError::type_error(
                        name_pos,
                        format!("bad number of indices for {}: got {}, expected {}", self.name_of(name), index_types.len(), data.indices.len()),
                    ));
                }
                if !index_types.iter().all(|t| matches!(t, Type::Object(_))) {
                    return Err(CompileError::type_error(name_pos, format!("substitution indices for {} must be Atom or Bond", self.name_of(name))));
                }
                Ok(data.value_type().cloned().unwrap_or(Type::Unresolved))
            }
            other => Err(CompileError::type_error(name_pos, format!("cannot index type {}", other.symbol_type()))),
        }
    }

    fn type_sum(&mut self, bound: Symbol, bound_pos: Pos, body: &mut Expr) -> CompileResult<Type> {
        let entry = self
            .scopes
            .lookup(bound)
            .cloned()
            .ok_or_else(|| CompileError::symbol(bound_pos, format!("symbol {} not defined", self.name_of(bound))))?;
        let SymbolKind::Object { kind: _, constraint } = entry.kind.clone() else {
            return Err(CompileError::symbol(bound_pos, format!("sum has to iterate over atom or bond, not {}", entry.ty())));
        };

        self.iterating_over.insert(bound);
        self.scopes.push_scope();
        self.scopes.bind(bound, entry.clone());

        let result = (|| {
            if let Some(mut c) = constraint {
                self.type_constraint(&mut c)?;
            }
            self.type_expr(body)
        })();

        self.scopes.pop_scope();
        self.iterating_over.remove(&bound);
        result
    }

    fn type_function_call(&mut self, name: Symbol, name_pos: Pos, arg: &mut Expr) -> CompileResult<Type> {
        let arg_ty = self.type_expr(arg)?;
        if !is_math_function(self.name_of(name)) {
            return Err(CompileError::symbol(name_pos, format!("function {} is not known", self.name_of(name))));
        }
        if !matches!(arg_ty, Type::Numeric(_)) {
            return Err(CompileError::type_error(arg.header.pos, format!("incompatible argument type for function {}: got {arg_ty}, expected Float", self.name_of(name))));
        }
        Ok(Type::Numeric(Numeric::Float))
    }

    fn type_ee(
        &mut self,
        row: Symbol,
        row_pos: Pos,
        col: Symbol,
        col_pos: Pos,
        diag: &mut Expr,
        off: &mut Expr,
        rhs: &mut Expr,
        ee_pos: Pos,
    ) -> CompileResult<Type> {
        if row == col {
            return Err(CompileError::symbol(ee_pos, "EE's row and col names must be distinct"));
        }

        self.iterating_over.insert(row);
        self.iterating_over.insert(col);
        self.scopes.push_scope();
        self.scopes.bind(row, SymbolEntry::new(SymbolKind::Object { kind: ObjectKind::Atom, constraint: None }, row_pos));
        self.scopes.bind(col, SymbolEntry::new(SymbolKind::Object { kind: ObjectKind::Atom, constraint: None }, col_pos));

        let result = (|| {
            let dt = self.type_expr(diag)?;
            let ot = self.type_expr(off)?;
            let rt = self.type_expr(rhs)?;
            let float = Type::Numeric(Numeric::Float);
            if dt != float || ot != float || rt != float {
                return Err(CompileError::type_error(ee_pos, "EE expression's diag/off/rhs clauses must all be Float"));
            }
            Ok(Type::Array(vec![ObjectKind::Atom]))
        })();

        self.scopes.pop_scope();
        self.iterating_over.remove(&row);
        self.iterating_over.remove(&col);
        result
    }

    // ---- constraints ----------------------------------------------------

    fn type_constraint(&mut self, constraint: &mut Constraint) -> CompileResult<()> {
        match &mut constraint.kind {
            ConstraintKind::RelOp { op: _, left, right } => {
                self.type_expr(left)?;
                self.type_expr(right)?;
                Ok(())
            }
            ConstraintKind::BinaryLogical { op: _, left, right } => {
                self.type_constraint(left)?;
                self.type_constraint(right)
            }
            ConstraintKind::Not(inner) => self.type_constraint(inner),
            ConstraintKind::Predicate { name, name_pos, args } => self.type_predicate(*name, *name_pos, args),
        }
    }

    fn type_predicate(&mut self, name: Symbol, name_pos: Pos, args: &mut [PredicateArg]) -> CompileResult<()> {
        let sig = PREDICATES
            .get(self.name_of(name))
            .ok_or_else(|| CompileError::symbol(name_pos, format!("predicate {} not defined", self.name_of(name))))?
            .clone();

        if sig.args.len() != args.len() {
            return Err(CompileError::symbol(
                name_pos,
                format!("predicate {} should have {} arguments but got {}", self.name_of(name), sig.args.len(), args.len()),
            ));
        }

        for (arg_type, arg) in sig.args.iter().zip(args.iter()) {
            match arg_type {
                ArgType::Object(kind) => {
                    let PredicateArg::Name(arg_name, arg_pos) = arg else {
                        return Err(CompileError::type_error(name_pos, format!("predicate {} expects an object argument", self.name_of(name))));
                    };
                    if !self.iterating_over.contains(arg_name) {
                        return Err(CompileError::symbol(*arg_pos, format!("symbol {} not bound to for each or sum", self.name_of(*arg_name))));
                    }
                    let actual = self
                        .scopes
                        .lookup(*arg_name)
                        .ok_or_else(|| CompileError::symbol(*arg_pos, format!("symbol {} not defined", self.name_of(*arg_name))))?
                        .ty();
                    if actual != Type::Object(*kind) {
                        return Err(CompileError::type_error(*arg_pos, format!("predicate {}'s argument is not {kind}", self.name_of(name))));
                    }
                }
                ArgType::String => {
                    if !matches!(arg, PredicateArg::Name(..) | PredicateArg::Str(..)) {
                        return Err(CompileError::type_error(name_pos, format!("predicate {} expected a string argument", self.name_of(name))));
                    }
                }
                ArgType::Numeric => {
                    if !matches!(arg, PredicateArg::Number(..)) {
                        return Err(CompileError::type_error(name_pos, format!("predicate {} expected a numeric argument", self.name_of(name))));
                    }
                }
                ArgType::Array(_) => {
                    return Err(CompileError::type_error(name_pos, format!("predicate {} has no array-typed argument slot", self.name_of(name))));
                }
            }
        }

        if self.name_of(name) == "element" {
            let (raw, elem_pos) = match &args[1] {
                PredicateArg::Name(elem_sym, elem_pos) => (self.name_of(*elem_sym).to_string(), *elem_pos),
                PredicateArg::Str(s, elem_pos) => (s.clone(), *elem_pos),
                _ => unreachable!("element's second argument slot is String-typed"),
            };
            let element = raw.to_lowercase();
            if !is_known_element(&element) && !is_known_element(capitalize(&element).as_str()) {
                return Err(CompileError::type_error(elem_pos, format!("unknown element {raw}")));
            }
        }

        Ok(())
    }
}

/// A structural signature for a guard, used to reject two substitution rules
/// declared with the same guard (guards must be pairwise distinct).
/// `Constraint`/`Expr` carry `Pos` and don't derive `PartialEq`, so two
/// otherwise-identical guards written at different source positions would
/// never compare equal by position; this ignores position and compares tree
/// shape plus resolved identifier text instead.
fn constraint_signature(interner: &Interner, c: &Constraint) -> String {
    match &c.kind {
        ConstraintKind::RelOp { op, left, right } => {
            format!("rel({op:?},{},{})", expr_signature(interner, left), expr_signature(interner, right))
        }
        ConstraintKind::BinaryLogical { op, left, right } => {
            format!("logic({op:?},{},{})", constraint_signature(interner, left), constraint_signature(interner, right))
        }
        ConstraintKind::Not(inner) => format!("not({})", constraint_signature(interner, inner)),
        ConstraintKind::Predicate { name, args, .. } => {
            let arg_sigs: Vec<String> = args.iter().map(|a| predicate_arg_signature(interner, a)).collect();
            format!("pred({},[{}])", interner.resolve(*name), arg_sigs.join(","))
        }
    }
}

fn predicate_arg_signature(interner: &Interner, arg: &PredicateArg) -> String {
    match arg {
        PredicateArg::Name(sym, _) => format!("name({})", interner.resolve(*sym)),
        PredicateArg::Number(n, _) => format!("num({n:?})"),
        PredicateArg::Str(s, _) => format!("str({s})"),
    }
}

fn expr_signature(interner: &Interner, e: &Expr) -> String {
    match &e.kind {
        ExprKind::Number(n) => format!("num({n:?})"),
        ExprKind::Name(sym) => format!("name({})", interner.resolve(*sym)),
        ExprKind::Subscript { name, indices, .. } => {
            let idx_sigs: Vec<&str> = indices.iter().map(|(s, _)| interner.resolve(*s)).collect();
            format!("sub({},[{}])", interner.resolve(*name), idx_sigs.join(","))
        }
        ExprKind::BinaryOp { op, left, right } => {
            format!("bin({op:?},{},{})", expr_signature(interner, left), expr_signature(interner, right))
        }
        ExprKind::UnaryMinus(inner) => format!("neg({})", expr_signature(interner, inner)),
        ExprKind::Sum { bound, body, .. } => format!("sum({},{})", interner.resolve(*bound), expr_signature(interner, body)),
        ExprKind::Function { name, arg, .. } => format!("call({},{})", interner.resolve(*name), expr_signature(interner, arg)),
        ExprKind::EE { row, col, diag, off, rhs, .. } => format!(
            "ee({},{},{},{},{})",
            interner.resolve(*row),
            interner.resolve(*col),
            expr_signature(interner, diag),
            expr_signature(interner, off),
            expr_signature(interner, rhs),
        ),
        ExprKind::RegressionPlaceholder => "placeholder".to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn assignable(lhs: &Type, rhs: &Type) -> bool {
    match (lhs, rhs) {
        (Type::Array(a), Type::Array(b)) => a == b,
        (Type::Array(_), Type::Numeric(_)) => true,
        (Type::Numeric(_), Type::Numeric(_)) => lhs.assignable_from(rhs),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileError;
    use crate::types::{Numeric, ObjectKind, Type};
    use crate::{compile, Error};

    /// `chi[i] = A[i] if element(i, H); chi[i] = B[i]` — two
    /// rules, guards `{Some(element(i,H)), None}`; `chi[a]` types as Float.
    #[test]
    fn s2_substitution_with_guard_has_two_rules_and_types_float() {
        let source = "name s2\n\
parameter A is atom\n\
parameter B is atom\n\
i is atom\n\
chi[i] = A[i] if element(i, H)\n\
chi[i] = B[i]\n\
for each a is atom:\n\
  x = chi[a]\n\
end\n";
        let compiled = compile(source).unwrap();
        let chi_sym = compiled.interner.lookup("chi").unwrap();
        let chi = compiled.symbols.lookup(chi_sym).unwrap();
        let crate::scope::SymbolKind::Substitution(data) = &chi.kind else {
            panic!("chi should be a substitution symbol");
        };
        assert_eq!(data.rules.len(), 2);
        assert_eq!(data.rules.iter().filter(|r| r.guard.is_none()).count(), 1);
        assert_eq!(data.rules.iter().filter(|r| r.guard.is_some()).count(), 1);
        assert_eq!(chi.ty(), Type::Numeric(Numeric::Float));
    }

    /// A substitution with only guarded rules (no default) must fail to
    /// compile.
    #[test]
    fn substitution_with_only_guarded_rules_fails_to_compile() {
        let source = "name bad\n\
parameter A is atom\n\
i is atom\n\
chi[i] = A[i] if element(i, H)\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    /// A substitution redeclared with the same (unguarded) default twice is
    /// rejected, not silently merged.
    #[test]
    fn substitution_with_duplicate_default_guard_is_rejected() {
        let source = "name bad\n\
parameter A is atom\n\
parameter B is atom\n\
i is atom\n\
chi[i] = A[i]\n\
chi[i] = B[i]\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    /// `v = M * u` where `M: Array(Atom,Bond)` and
    /// `u: Array(Atom)` — rejected at the `*` node (inner dimensions `Bond`
    /// vs `Atom` don't match).
    #[test]
    fn s3_array_shape_mismatch_is_a_type_error() {
        let source = "name s3\n\
i is atom\n\
b is bond\n\
for each x is atom:\n\
  for each y is bond:\n\
    M[x, y] = 1\n\
  end\n\
end\n\
for each x is atom:\n\
  u[x] = 1\n\
end\n\
v = M * u\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Type { .. })));
    }

    /// Inside `for each b is bond (i-j) such that bonded(i,j)`,
    /// `i`/`j` resolve as Atom and `b` as Bond; none of the three is visible
    /// afterward.
    #[test]
    fn s6_bond_decomposition_scopes_its_endpoints_to_the_loop_body() {
        let source = "name s6\n\
for each b is bond (i-j) such that bonded(i,j):\n\
  x = distance[i, j]\n\
end\n\
y = distance[i, j]\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    #[test]
    fn s6_bond_decomposition_endpoints_resolve_as_atom_and_bond_as_bond_inside_the_loop() {
        let source = "name s6\n\
for each b is bond (i-j) such that bonded(i,j):\n\
  x = distance[i, j]\n\
end\n";
        compile(source).unwrap();
    }

    #[test]
    fn ee_row_and_col_must_be_distinct_names() {
        let source = "name bad\nparameter A is common\ni is atom\nq = EE[ row i, col i : diag A, off A, rhs A ]\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    #[test]
    fn assigning_to_a_loop_counter_is_a_type_error() {
        let source = "name bad\nfor k = 1 to 5:\n  k = 2\nend\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Type { .. })));
    }

    #[test]
    fn assigning_to_a_parameter_symbol_is_a_symbol_error() {
        let source = "name bad\nparameter A is common\nA = 1\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    #[test]
    fn redeclaring_a_parameter_name_is_a_symbol_error() {
        let source = "name bad\nparameter A is atom\nparameter A is common\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    #[test]
    fn element_predicate_rejects_an_unknown_element_name() {
        let source = "name bad\nfor each i is atom such that element(i, Zz):\nend\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Type { .. })));
    }

    /// Predicate string arguments are either bare names or
    /// double-quoted literals — a quoted element symbol must type-check
    /// exactly like a bare one.
    #[test]
    fn element_predicate_accepts_a_double_quoted_element_name() {
        let source = "name ok\nfor each i is atom such that element(i, \"H\"):\nend\n";
        compile(source).unwrap();
    }

    #[test]
    fn element_predicate_rejects_an_unknown_double_quoted_element_name() {
        let source = "name bad\nfor each i is atom such that element(i, \"Zz\"):\nend\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Type { .. })));
    }

    #[test]
    fn bond_parameter_indexed_by_two_atoms_is_rejected() {
        // DESIGN.md open-question decision #3: no grammar construct relates
        // an atom pair to a bond, so this always fails rather than silently
        // resolving the wrong bond.
        let source = "name bad\nparameter R is bond\nfor each b is bond (i-j) such that bonded(i,j):\n  x = R[i, j]\nend\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    #[test]
    fn object_name_used_outside_any_iterating_loop_is_a_symbol_error() {
        let source = "name bad\ni is atom\nx = electronegativity[i]\n";
        let err = compile(source).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Symbol { .. })));
    }

    #[test]
    fn reserved_q_resolves_to_array_atom_in_every_program() {
        let compiled = compile("name m\nk = 1\n").unwrap();
        let q = compiled.interner.lookup("q").unwrap();
        assert_eq!(compiled.symbols.lookup(q).unwrap().ty(), Type::Array(vec![ObjectKind::Atom]));
    }
}

fn binary_op_type(op: BinOp, ltype: &Type, rtype: &Type, pos: Pos) -> CompileResult<Type> {
    match (ltype, rtype) {
        (Type::Numeric(l), Type::Numeric(r)) => {
            Ok(if *l == Numeric::Float || *r == Numeric::Float { Type::Numeric(Numeric::Float) } else { Type::Numeric(Numeric::Int) })
        }
        (Type::Array(lshape), Type::Array(rshape)) => match op {
            BinOp::Add | BinOp::Sub => {
                if lshape == rshape {
                    Ok(Type::Array(lshape.clone()))
                } else {
                    Err(CompileError::type_error(pos, format!("cannot {op:?} arrays of shapes {:?} and {:?}", lshape, rshape)))
                }
            }
            BinOp::Mul => match (lshape.len(), rshape.len()) {
                (2, 2) => {
                    if lshape[1] != rshape[0] {
                        Err(CompileError::type_error(pos, "cannot multiply matrices of incompatible shapes"))
                    } else {
                        Ok(Type::Array(vec![lshape[0], rshape[1]]))
                    }
                }
                (1, 2) => {
                    if lshape[0] != rshape[0] {
                        Err(CompileError::type_error(pos, "cannot multiply vector and matrix of incompatible shapes"))
                    } else {
                        Ok(Type::Array(vec![rshape[1]]))
                    }
                }
                (2, 1) => {
                    if lshape[1] != rshape[0] {
                        Err(CompileError::type_error(pos, "cannot multiply matrix and vector of incompatible shapes"))
                    } else {
                        Ok(Type::Array(vec![lshape[0]]))
                    }
                }
                (1, 1) => {
                    if lshape != rshape {
                        Err(CompileError::type_error(pos, "cannot dot-product vectors of different shapes"))
                    } else {
                        Ok(Type::Numeric(Numeric::Float))
                    }
                }
                _ => Err(CompileError::type_error(pos, "cannot multiply arrays of more than two dimensions")),
            },
            BinOp::Div | BinOp::Pow => Err(CompileError::type_error(pos, format!("cannot {op:?} two arrays"))),
        },
        (Type::Array(shape), Type::Numeric(_)) => match op {
            BinOp::Mul => Ok(Type::Array(shape.clone())),
            BinOp::Div => Ok(Type::Array(shape.clone())),
            _ => Err(CompileError::type_error(pos, "can only multiply or divide an array by a number")),
        },
        (Type::Numeric(_), Type::Array(shape)) => match op {
            BinOp::Mul => Ok(Type::Array(shape.clone())),
            _ => Err(CompileError::type_error(pos, "cannot perform this operation between a number and an array")),
        },
        _ => Err(CompileError::type_error(pos, format!("cannot {op:?} values of types {ltype} and {rtype}"))),
    }
}
