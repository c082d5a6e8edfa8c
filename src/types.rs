//! The DSL's type lattice and the compatibility rules used by
//! assignment and binary-operator typing.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Numeric {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Atom,
    Bond,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Atom => write!(f, "Atom"),
            ObjectKind::Bond => write!(f, "Bond"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    AtomParameter,
    BondParameter,
    CommonParameter,
}

/// An argument slot in a Function or Predicate signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Object(ObjectKind),
    Numeric,
    String,
    /// `inv`'s one argument: an `(Atom, Atom)` matrix (`original_source/ccl/functions.py`'s
    /// `FunctionType(ArrayType(ATOM, ATOM), ArrayType(ATOM, ATOM))`).
    Array(Vec<ObjectKind>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub args: Vec<ArgType>,
    pub ret: FunctionReturn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionReturn {
    Numeric(Numeric),
    Array(Vec<ObjectKind>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateSignature {
    pub args: Vec<ArgType>,
}

/// The full type lattice. `Unresolved` is a sentinel used only for the
/// regression placeholder node; no ordinary expression may type to
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Numeric(Numeric),
    Object(ObjectKind),
    Parameter(ParameterKind),
    Array(Vec<ObjectKind>),
    Function(FunctionSignature),
    Predicate(PredicateSignature),
    String,
    Bool,
    Unresolved,
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Numeric(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Numeric(Numeric::Int))
    }

    pub fn as_array_shape(&self) -> Option<&[ObjectKind]> {
        match self {
            Type::Array(shape) => Some(shape),
            _ => None,
        }
    }

    /// Array ← Array iff shapes equal. Array ← Numeric (broadcast) is always
    /// allowed. Numeric ← Numeric is allowed unless it narrows Float into Int.
    pub fn assignable_from(&self, rhs: &Type) -> bool {
        match (self, rhs) {
            (Type::Array(a), Type::Array(b)) => a == b,
            (Type::Array(_), Type::Numeric(_)) => true,
            (Type::Numeric(Numeric::Float), Type::Numeric(_)) => true,
            (Type::Numeric(Numeric::Int), Type::Numeric(Numeric::Int)) => true,
            (Type::Numeric(Numeric::Int), Type::Numeric(Numeric::Float)) => false,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Numeric(Numeric::Int) => write!(f, "Int"),
            Type::Numeric(Numeric::Float) => write!(f, "Float"),
            Type::Object(k) => write!(f, "{}", k),
            Type::Parameter(ParameterKind::AtomParameter) => write!(f, "AtomParameter"),
            Type::Parameter(ParameterKind::BondParameter) => write!(f, "BondParameter"),
            Type::Parameter(ParameterKind::CommonParameter) => write!(f, "CommonParameter"),
            Type::Array(shape) => {
                let parts: Vec<String> = shape.iter().map(|k| k.to_string()).collect();
                write!(f, "Array({})", parts.join(", "))
            }
            Type::Function(sig) => write!(f, "Function(-> {:?})", sig.ret),
            Type::Predicate(_) => write!(f, "Predicate"),
            Type::String => write!(f, "String"),
            Type::Bool => write!(f, "Bool"),
            Type::Unresolved => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_assignable_to_float() {
        assert!(Type::Numeric(Numeric::Float).assignable_from(&Type::Numeric(Numeric::Int)));
    }

    #[test]
    fn float_not_assignable_to_int() {
        assert!(!Type::Numeric(Numeric::Int).assignable_from(&Type::Numeric(Numeric::Float)));
    }

    #[test]
    fn numeric_broadcasts_into_array() {
        let arr = Type::Array(vec![ObjectKind::Atom]);
        assert!(arr.assignable_from(&Type::Numeric(Numeric::Float)));
    }

    #[test]
    fn array_shapes_must_match_exactly() {
        let v = Type::Array(vec![ObjectKind::Atom]);
        let m = Type::Array(vec![ObjectKind::Atom, ObjectKind::Bond]);
        assert!(!v.assignable_from(&m));
    }
}
