//! The symbol table: a stack of scopes bound during semantic analysis,
//! grounded on `original_source/ccl/symboltable.py`'s
//! `Symbol` subclasses (`ParameterSymbol`, `ObjectSymbol`, `FunctionSymbol`,
//! `VariableSymbol`, `SubstitutionSymbol`, `ConstantSymbol`) and its
//! parent-chained `SymbolTable`.
//!
//! Level 0 of the stack is the global table (parameters, objects, catalog
//! properties/constants, substitutions); level 1 is the method's own table
//! (assignment-introduced variables); any further level is a nested scope
//! pushed for the body of a `for`/`for each`/`sum`/`EE`.

use std::collections::HashMap;

use crate::ast::{Constraint, Expr};
use crate::intern::Symbol;
use crate::token::Pos;
use crate::types::{FunctionReturn, FunctionSignature, Numeric, ObjectKind, ParameterKind, Type};

/// The global table's fixed level index.
pub const GLOBAL_LEVEL: usize = 0;
/// The method table's fixed level index (assignment-introduced variables).
pub const METHOD_LEVEL: usize = 1;

/// One accumulated rule of a Substitution symbol: `<guard> -> <value type>`.
/// The rule's expression is type-checked once, at declaration time (a
/// deliberate simplification of the original's fully dynamic per-use-site
/// re-analysis — see DESIGN.md).
#[derive(Debug, Clone)]
pub struct SubstitutionRule {
    pub guard: Option<Constraint>,
    pub value_type: Type,
    /// The rule's right-hand side, kept (not just its type) so the
    /// complexity analyzer and back ends can inline the rule's actual cost
    /// and code rather than just its result type.
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct SubstitutionData {
    pub indices: Vec<Symbol>,
    pub rules: Vec<SubstitutionRule>,
}

impl SubstitutionData {
    pub fn has_default(&self) -> bool {
        self.rules.iter().any(|r| r.guard.is_none())
    }

    /// All rules for a substitution must agree on the result type (mirrors
    /// `len(types) > 1` in the original); `None` if no rule has been added
    /// yet.
    pub fn value_type(&self) -> Option<&Type> {
        self.rules.first().map(|r| &r.value_type)
    }
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Parameter(ParameterKind),
    Object { kind: ObjectKind, constraint: Option<Constraint> },
    Function(FunctionSignature),
    Variable(Type),
    Substitution(SubstitutionData),
    /// A catalog property bound to one fixed element (`chi_H = electronegativity of H`).
    Constant { signature: FunctionSignature, element: String },
}

impl SymbolKind {
    /// The type this symbol contributes when referenced as a value (mirrors
    /// `Symbol.symbol_type()`).
    pub fn symbol_type(&self) -> Type {
        match self {
            SymbolKind::Parameter(kind) => Type::Parameter(*kind),
            SymbolKind::Object { kind, .. } => Type::Object(*kind),
            SymbolKind::Function(sig) => Type::Function(sig.clone()),
            SymbolKind::Variable(ty) => ty.clone(),
            SymbolKind::Substitution(data) => data.value_type().cloned().unwrap_or(Type::Unresolved),
            SymbolKind::Constant { signature, .. } => match &signature.ret {
                FunctionReturn::Numeric(n) => Type::Numeric(*n),
                FunctionReturn::Array(shape) => Type::Array(shape.clone()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub kind: SymbolKind,
    pub declared_at: Pos,
}

impl SymbolEntry {
    pub fn new(kind: SymbolKind, declared_at: Pos) -> Self {
        Self { kind, declared_at }
    }

    pub fn ty(&self) -> Type {
        self.kind.symbol_type()
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<Symbol, SymbolEntry>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Binds `name` in the innermost scope, returning the entry it shadows
    /// in that same scope, if any (re-declaration in the
    /// same scope is a SymbolError, checked by the caller).
    pub fn bind(&mut self, name: Symbol, entry: SymbolEntry) -> Option<SymbolEntry> {
        self.scopes.last_mut().expect("ScopeStack::bind called with no open scope").insert(name, entry)
    }

    /// Binds `name` at a specific level rather than the innermost scope —
    /// used for global declarations (level 0) and method-scope
    /// assignment-introduced variables (level 1), which must land at a fixed
    /// level regardless of how deeply nested the current statement is.
    pub fn bind_at(&mut self, level: usize, name: Symbol, entry: SymbolEntry) -> Option<SymbolEntry> {
        self.scopes[level].insert(name, entry)
    }

    pub fn is_bound_at(&self, level: usize, name: Symbol) -> bool {
        self.scopes[level].contains_key(&name)
    }

    pub fn get_at(&self, level: usize, name: Symbol) -> Option<&SymbolEntry> {
        self.scopes[level].get(&name)
    }

    pub fn is_bound_in_innermost_scope(&self, name: Symbol) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains_key(&name))
    }

    pub fn lookup(&self, name: Symbol) -> Option<&SymbolEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    pub fn lookup_mut(&mut self, name: Symbol) -> Option<&mut SymbolEntry> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(&name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn global_entries(&self) -> impl Iterator<Item = (&Symbol, &SymbolEntry)> {
        self.scopes[GLOBAL_LEVEL].iter()
    }

    /// Captures the global and method tables as a standalone `SymbolTable`
    /// once analysis finishes, for callers (the complexity analyzer, the
    /// back ends, `lib.rs`'s public API) that outlive this `ScopeStack`'s own
    /// nested-scope bookkeeping.
    pub fn snapshot_persistent(&self) -> SymbolTable {
        SymbolTable {
            globals: self.scopes[GLOBAL_LEVEL].clone(),
            method_scope: self.scopes[METHOD_LEVEL].clone(),
        }
    }
}

/// The global and method symbol tables surviving after analysis, returned
/// alongside the typed method from `compile()`.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub globals: HashMap<Symbol, SymbolEntry>,
    pub method_scope: HashMap<Symbol, SymbolEntry>,
}

impl SymbolTable {
    /// Looks a name up first in the method scope, then the globals — mirrors
    /// `ScopeStack::lookup`'s innermost-first search restricted to the two
    /// persistent levels.
    pub fn lookup(&self, name: Symbol) -> Option<&SymbolEntry> {
        self.method_scope.get(&name).or_else(|| self.globals.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut stack = ScopeStack::new();
        let x = Symbol::EMPTY; // any symbol works for this structural test
        stack.push_scope();
        stack.bind(x, SymbolEntry::new(SymbolKind::Variable(Type::Numeric(Numeric::Float)), Pos::new(1, 0)));
        stack.push_scope();
        stack.bind(x, SymbolEntry::new(SymbolKind::Object { kind: ObjectKind::Atom, constraint: None }, Pos::new(2, 0)));
        assert_eq!(stack.lookup(x).unwrap().ty(), Type::Object(ObjectKind::Atom));
        stack.pop_scope();
        assert_eq!(stack.lookup(x).unwrap().ty(), Type::Numeric(Numeric::Float));
    }

    #[test]
    fn lookup_misses_after_scope_pop() {
        let mut stack = ScopeStack::new();
        let x = Symbol::EMPTY;
        stack.push_scope();
        stack.push_scope();
        stack.bind(x, SymbolEntry::new(SymbolKind::Variable(Type::Numeric(Numeric::Int)), Pos::new(1, 0)));
        stack.pop_scope();
        assert!(stack.lookup(x).is_none());
    }

    #[test]
    fn redeclaration_in_same_scope_is_detectable() {
        let mut stack = ScopeStack::new();
        let x = Symbol::EMPTY;
        stack.push_scope();
        stack.bind(x, SymbolEntry::new(SymbolKind::Variable(Type::Numeric(Numeric::Int)), Pos::new(1, 0)));
        assert!(stack.is_bound_in_innermost_scope(x));
    }

    #[test]
    fn bind_at_targets_a_fixed_level_regardless_of_nesting() {
        let mut stack = ScopeStack::new();
        let x = Symbol::EMPTY;
        stack.push_scope(); // global
        stack.push_scope(); // method
        stack.push_scope(); // nested for-body
        stack.bind_at(METHOD_LEVEL, x, SymbolEntry::new(SymbolKind::Variable(Type::Numeric(Numeric::Float)), Pos::new(1, 0)));
        assert!(stack.is_bound_at(METHOD_LEVEL, x));
        assert!(!stack.is_bound_in_innermost_scope(x));
    }
}
