//! Complexity analysis.
//!
//! Mirrors `original_source/ccl/complexity.py`'s per-node cost algebra: every
//! AST kind contributes an additive term, loops multiply the body cost by
//! the size of what they iterate (`N` atoms, `M` bonds, or a literal bounded
//! count), and the whole thing is summed into a small two-variable
//! polynomial rather than handed to a symbolic-algebra crate.

use std::fmt;

use crate::ast::{Constraint, ConstraintKind, Expr, ExprKind, Method, NumberLit, Stmt, StmtKind};
use crate::intern::Interner;
use crate::scope::{SymbolKind, SymbolTable};
use crate::token::Pos;
use crate::types::{ObjectKind, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplexityError {
    /// `EE[... within r]` — truncated/cutoff assembly has no well-defined
    /// cost without guessing at a cover radius.
    CutoffModeUnsupported(Pos),
    /// A `BoundedFor`'s `from`/`to` must be literal integers (mirrors the
    /// original's direct `.val` access on its bound nodes).
    NonLiteralBound(Pos),
}

impl fmt::Display for ComplexityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityError::CutoffModeUnsupported(pos) => {
                write!(f, "{}:{}: complexity analysis does not support EE's cutoff/cover mode", pos.line, pos.column)
            }
            ComplexityError::NonLiteralBound(pos) => {
                write!(f, "{}:{}: a bounded for's endpoints must be literal integers for complexity analysis", pos.line, pos.column)
            }
        }
    }
}

impl std::error::Error for ComplexityError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityMode {
    /// The full simplified polynomial, no dominance dropped.
    Exact,
    /// Only the strictly-dominant (highest total-degree) terms as `N, M -> oo`.
    Asymptotic,
}

/// One monomial `coeff * N^n_exp * M^m_exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    pub coeff: i64,
    pub n_exp: u32,
    pub m_exp: u32,
}

impl Term {
    fn total_degree(&self) -> u32 {
        self.n_exp + self.m_exp
    }
}

/// A sum of `Term`s in the two symbolic problem sizes `N` (atom count) and
/// `M` (bond count), standing in for the original's `sympy` expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polynomial {
    pub terms: Vec<Term>,
}

impl Polynomial {
    pub fn zero() -> Self {
        Self { terms: Vec::new() }
    }

    pub fn constant(c: i64) -> Self {
        if c == 0 {
            Self::zero()
        } else {
            Self { terms: vec![Term { coeff: c, n_exp: 0, m_exp: 0 }] }
        }
    }

    pub fn n_to(exp: u32) -> Self {
        Self { terms: vec![Term { coeff: 1, n_exp: exp, m_exp: 0 }] }
    }

    pub fn m_to(exp: u32) -> Self {
        Self { terms: vec![Term { coeff: 1, n_exp: 0, m_exp: exp } ] }
    }

    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().copied());
        Polynomial { terms }.simplify()
    }

    pub fn scale(&self, factor: i64) -> Polynomial {
        Polynomial { terms: self.terms.iter().map(|t| Term { coeff: t.coeff * factor, ..*t }).collect() }.simplify()
    }

    /// Multiplies every term's `N` exponent up by one — the cost of
    /// executing this polynomial's worth of work once per Atom.
    pub fn times_n(&self) -> Polynomial {
        Polynomial { terms: self.terms.iter().map(|t| Term { n_exp: t.n_exp + 1, ..*t }).collect() }
    }

    /// Same, for `M` (Bond count).
    pub fn times_m(&self) -> Polynomial {
        Polynomial { terms: self.terms.iter().map(|t| Term { m_exp: t.m_exp + 1, ..*t }).collect() }
    }

    /// Merges like terms (equal exponents) and drops any that cancel to
    /// zero; empty result (no terms at all) is the "cost 0" of an empty
    /// loop body (boundary law 10).
    pub fn simplify(&self) -> Polynomial {
        let mut merged: Vec<Term> = Vec::new();
        for t in &self.terms {
            if let Some(existing) = merged.iter_mut().find(|m| m.n_exp == t.n_exp && m.m_exp == t.m_exp) {
                existing.coeff += t.coeff;
            } else {
                merged.push(*t);
            }
        }
        merged.retain(|t| t.coeff != 0);
        merged.sort_by(|a, b| (b.total_degree(), b.n_exp).cmp(&(a.total_degree(), a.n_exp)));
        Polynomial { terms: merged }
    }

    /// Drops every term whose total degree is strictly less than the
    /// maximum — the terms that vanish relative to the dominant ones as
    /// `N, M -> oo`.
    pub fn asymptotic(&self) -> Polynomial {
        let Some(max_degree) = self.terms.iter().map(Term::total_degree).max() else {
            return Polynomial::zero();
        };
        Polynomial { terms: self.terms.iter().copied().filter(|t| t.total_degree() == max_degree).collect() }
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|t| {
                let mut factors = Vec::new();
                if t.n_exp > 0 {
                    factors.push(if t.n_exp == 1 { "N".to_string() } else { format!("N^{}", t.n_exp) });
                }
                if t.m_exp > 0 {
                    factors.push(if t.m_exp == 1 { "M".to_string() } else { format!("M^{}", t.m_exp) });
                }
                if factors.is_empty() {
                    t.coeff.to_string()
                } else if t.coeff == 1 {
                    factors.join("*")
                } else {
                    format!("{}*{}", t.coeff, factors.join("*"))
                }
            })
            .collect();
        write!(f, "{}", parts.join(" + "))
    }
}

/// One array-typed declaration's allocation term: the product of its shape's
/// dimensions, each mapped to `N` (Atom) or `M` (Bond). Initial
/// array allocations... equal to the product of shape costs").
fn shape_cost(shape: &[ObjectKind]) -> Polynomial {
    let mut cost = Polynomial::constant(1);
    for k in shape {
        cost = match k {
            ObjectKind::Atom => cost.times_n(),
            ObjectKind::Bond => cost.times_m(),
        };
    }
    cost
}

/// Runs the cost algebra over `method`'s statements, returning the
/// simplified polynomial (exact mode) or its dominant terms only
/// (asymptotic mode, wrapped in `O(...)` by the caller if desired).
pub fn analyze(method: &Method, symbols: &SymbolTable, interner: &Interner, mode: ComplexityMode) -> Result<Polynomial, ComplexityError> {
    let mut total = Polynomial::zero();
    for stmt in &method.statements {
        total = total.add(&stmt_cost(stmt, symbols, interner)?);
    }
    for entry in symbols.method_scope.values() {
        if let SymbolKind::Variable(Type::Array(shape)) = &entry.kind {
            total = total.add(&shape_cost(shape));
        }
    }
    let simplified = total.simplify();
    Ok(match mode {
        ComplexityMode::Exact => simplified,
        ComplexityMode::Asymptotic => simplified.asymptotic(),
    })
}

fn stmt_cost(stmt: &Stmt, symbols: &SymbolTable, interner: &Interner) -> Result<Polynomial, ComplexityError> {
    match &stmt.kind {
        StmtKind::Assign { value, .. } => Ok(expr_cost(value, symbols, interner)?.add(&Polynomial::constant(1))),
        StmtKind::BoundedFor { bound_pos, from, to, body, .. } => {
            let from_val = literal_int(from).ok_or(ComplexityError::NonLiteralBound(*bound_pos))?;
            let to_val = literal_int(to).ok_or(ComplexityError::NonLiteralBound(*bound_pos))?;
            let count = (to_val - from_val).max(0);

            let mut body_cost = Polynomial::zero();
            for s in body {
                body_cost = body_cost.add(&stmt_cost(s, symbols, interner)?);
            }
            Ok(body_cost.scale(count).add(&Polynomial::constant(1)))
        }
        StmtKind::ObjectFor { bound, object_kind, constraint, body, .. } => {
            let mut body_cost = Polynomial::zero();
            if let Some(c) = constraint {
                body_cost = body_cost.add(&constraint_cost(c, symbols, interner)?);
            }
            for s in body {
                body_cost = body_cost.add(&stmt_cost(s, symbols, interner)?);
            }
            let _ = (bound, symbols);
            let scaled = match object_kind {
                ObjectKind::Atom => body_cost.times_n(),
                ObjectKind::Bond => body_cost.times_m(),
            };
            Ok(scaled.add(&Polynomial::constant(1)))
        }
    }
}

fn expr_cost(expr: &Expr, symbols: &SymbolTable, interner: &Interner) -> Result<Polynomial, ComplexityError> {
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Name(_) | ExprKind::RegressionPlaceholder => Ok(Polynomial::constant(1)),
        ExprKind::Subscript { name, .. } => match symbols.lookup(*name).map(|e| &e.kind) {
            // `inv`: the dense `N x N` solve dominates, O(N^3).
            Some(SymbolKind::Function(_)) if interner.resolve(*name) == "inv" => Ok(Polynomial::n_to(3)),
            // A Substitution is inlined at every use site by the back end, so
            // each subscript into one re-pays the combined cost of its
            // guards and bodies.
            Some(SymbolKind::Substitution(data)) => {
                let mut cost = Polynomial::zero();
                for rule in &data.rules {
                    if let Some(guard) = &rule.guard {
                        cost = cost.add(&constraint_cost(guard, symbols, interner)?);
                    }
                    cost = cost.add(&expr_cost(&rule.body, symbols, interner)?);
                }
                Ok(cost.add(&Polynomial::constant(1)))
            }
            // A Parameter/Array element lookup, or any other catalog
            // function call, is a plain O(1) access.
            _ => Ok(Polynomial::constant(1)),
        },
        ExprKind::BinaryOp { left, right, .. } => {
            let operands = expr_cost(left, symbols, interner)?.add(&expr_cost(right, symbols, interner)?);
            // An array-typed result is an element-wise op over its shape;
            // anything else is a single scalar op.
            let op_cost = match &expr.result_type {
                Some(Type::Array(shape)) => shape_cost(shape),
                _ => Polynomial::constant(1),
            };
            Ok(operands.add(&op_cost))
        }
        ExprKind::UnaryMinus(inner) => {
            let inner_cost = expr_cost(inner, symbols, interner)?;
            let op_cost = match &expr.result_type {
                Some(Type::Array(shape)) => shape_cost(shape),
                _ => Polynomial::constant(1),
            };
            Ok(inner_cost.add(&op_cost))
        }
        ExprKind::Sum { bound, body, .. } => {
            // A sum's bound name always names a previously declared Object
            // (checked by the analyzer); its contribution scales by the
            // iterated kind just like an ObjectFor's body. Annotation-declared
            // objects are bound at GLOBAL_LEVEL and survive into the
            // persisted symbol table, so the bound kind is almost always
            // recoverable here; a loop-local bound (declared only by an
            // enclosing `for each`) does not survive scope pop, so fall back
            // to N, the conservative, dominant choice, when it can't be
            // found.
            let inner = expr_cost(body, symbols, interner)?;
            let scaled = match symbols.lookup(*bound).map(|e| &e.kind) {
                Some(SymbolKind::Object { kind: ObjectKind::Bond, .. }) => inner.times_m(),
                _ => inner.times_n(),
            };
            Ok(scaled.add(&Polynomial::constant(1)))
        }
        ExprKind::Function { arg, .. } => Ok(expr_cost(arg, symbols, interner)?.add(&Polynomial::constant(1))),
        ExprKind::EE { diag, off, rhs, cutoff, .. } => {
            if cutoff.is_some() {
                return Err(ComplexityError::CutoffModeUnsupported(expr.header.pos));
            }
            // Per-entry assembly is O(N^2); the dense linear solve
            // dominates at O(N^3) (mirrors `inv`'s own N^3 contribution).
            let assembly = expr_cost(diag, symbols, interner)?
                .add(&expr_cost(off, symbols, interner)?)
                .add(&expr_cost(rhs, symbols, interner)?)
                .times_n()
                .times_n();
            Ok(assembly.add(&Polynomial::n_to(3)))
        }
    }
}

fn constraint_cost(constraint: &Constraint, symbols: &SymbolTable, interner: &Interner) -> Result<Polynomial, ComplexityError> {
    match &constraint.kind {
        ConstraintKind::RelOp { left, right, .. } => {
            Ok(expr_cost(left, symbols, interner)?.add(&expr_cost(right, symbols, interner)?).add(&Polynomial::constant(1)))
        }
        ConstraintKind::BinaryLogical { left, right, .. } => Ok(constraint_cost(left, symbols, interner)?
            .add(&constraint_cost(right, symbols, interner)?)
            .add(&Polynomial::constant(1))),
        ConstraintKind::Not(inner) => Ok(constraint_cost(inner, symbols, interner)?.add(&Polynomial::constant(1))),
        ConstraintKind::Predicate { .. } => Ok(Polynomial::constant(1)),
    }
}

fn literal_int(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Number(NumberLit::Int(v)) => Some(*v),
        ExprKind::UnaryMinus(inner) => literal_int(inner).map(|v| -v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_merges_like_terms() {
        let p = Polynomial { terms: vec![Term { coeff: 2, n_exp: 1, m_exp: 0 }, Term { coeff: 3, n_exp: 1, m_exp: 0 }] };
        let simplified = p.simplify();
        assert_eq!(simplified.terms, vec![Term { coeff: 5, n_exp: 1, m_exp: 0 }]);
    }

    #[test]
    fn asymptotic_drops_lower_degree_terms() {
        let p = Polynomial { terms: vec![Term { coeff: 1, n_exp: 3, m_exp: 0 }, Term { coeff: 7, n_exp: 1, m_exp: 0 }] };
        let reduced = p.asymptotic();
        assert_eq!(reduced.terms, vec![Term { coeff: 1, n_exp: 3, m_exp: 0 }]);
    }

    #[test]
    fn empty_polynomial_displays_as_zero() {
        assert_eq!(Polynomial::zero().to_string(), "0");
    }

    #[test]
    fn display_formats_mixed_degree_terms() {
        let p = Polynomial { terms: vec![Term { coeff: 2, n_exp: 2, m_exp: 1 }, Term { coeff: 1, n_exp: 0, m_exp: 0 }] };
        assert_eq!(p.to_string(), "2*N^2*M + 1");
    }

    #[test]
    fn sum_over_an_annotation_declared_bond_scales_by_m_not_n() {
        let mut interner = crate::intern::Interner::new();
        let source = "name m\nbo is bond order\nb is bond\ntotal = sum b: bo[b]\n";
        let (mut method, _) = crate::parser::parse(source, &mut interner).unwrap();
        let symbols = crate::semant::analyze(&mut method, &interner).unwrap();
        let poly = analyze(&method, &symbols, &interner, ComplexityMode::Asymptotic).unwrap();
        assert_eq!(poly.to_string(), "M");
    }

    #[test]
    fn sum_over_an_annotation_declared_atom_scales_by_n() {
        let mut interner = crate::intern::Interner::new();
        let source = "name m\nchi is electronegativity\ni is atom\ntotal = sum i: chi[i]\n";
        let (mut method, _) = crate::parser::parse(source, &mut interner).unwrap();
        let symbols = crate::semant::analyze(&mut method, &interner).unwrap();
        let poly = analyze(&method, &symbols, &interner, ComplexityMode::Asymptotic).unwrap();
        assert_eq!(poly.to_string(), "N");
    }
}
