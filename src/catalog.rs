//! Built-in domain function and predicate catalog.
//!
//! Grounded directly on `original_source`'s `ccl/functions.py`: the same
//! property names, arities and return kinds, loaded once into a pair of
//! lazily-initialized maps.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::types::{ArgType, FunctionReturn, FunctionSignature, Numeric, ObjectKind, PredicateSignature};

const FLOAT_ATOM_PROPERTIES: &[&str] = &[
    "electronegativity",
    "covalent radius",
    "van der waals radius",
    "hardness",
    "ionization potential",
    "electron affinity",
];

const INT_ATOM_PROPERTIES: &[&str] = &["atomic number", "valence electron count", "formal charge"];

const MATH_FUNCTIONS: &[&str] = &["exp", "sqrt", "sin", "cos", "tan", "sinh", "cosh", "tanh"];

/// `name -> signature` for every catalog Function (math functions, atom/bond
/// properties, `distance`, `inv`).
pub static FUNCTIONS: Lazy<HashMap<&'static str, FunctionSignature>> = Lazy::new(|| {
    let mut m = HashMap::new();

    for &name in MATH_FUNCTIONS {
        m.insert(
            name,
            FunctionSignature { args: vec![ArgType::Numeric], ret: FunctionReturn::Numeric(Numeric::Float) },
        );
    }

    m.insert(
        "inv",
        FunctionSignature {
            args: vec![ArgType::Array(vec![ObjectKind::Atom, ObjectKind::Atom])],
            ret: FunctionReturn::Array(vec![ObjectKind::Atom, ObjectKind::Atom]),
        },
    );

    for &name in FLOAT_ATOM_PROPERTIES {
        m.insert(
            name,
            FunctionSignature {
                args: vec![ArgType::Object(ObjectKind::Atom)],
                ret: FunctionReturn::Numeric(Numeric::Float),
            },
        );
    }

    for &name in INT_ATOM_PROPERTIES {
        m.insert(
            name,
            FunctionSignature {
                args: vec![ArgType::Object(ObjectKind::Atom)],
                ret: FunctionReturn::Numeric(Numeric::Int),
            },
        );
    }

    m.insert(
        "bond order",
        FunctionSignature {
            args: vec![ArgType::Object(ObjectKind::Bond)],
            ret: FunctionReturn::Numeric(Numeric::Int),
        },
    );

    m.insert(
        "distance",
        FunctionSignature {
            args: vec![ArgType::Object(ObjectKind::Atom), ArgType::Object(ObjectKind::Atom)],
            ret: FunctionReturn::Numeric(Numeric::Float),
        },
    );

    m
});

/// `name -> signature` for every catalog Predicate.
pub static PREDICATES: Lazy<HashMap<&'static str, PredicateSignature>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "element",
        PredicateSignature { args: vec![ArgType::Object(ObjectKind::Atom), ArgType::String] },
    );
    m.insert(
        "bonded",
        PredicateSignature { args: vec![ArgType::Object(ObjectKind::Atom), ArgType::Object(ObjectKind::Atom)] },
    );
    m.insert(
        "near",
        PredicateSignature {
            args: vec![ArgType::Object(ObjectKind::Atom), ArgType::Object(ObjectKind::Atom), ArgType::Numeric],
        },
    );
    m.insert(
        "bond_distance",
        PredicateSignature {
            args: vec![ArgType::Object(ObjectKind::Atom), ArgType::Object(ObjectKind::Atom), ArgType::Numeric],
        },
    );
    m
});

/// Is `name` a one-argument `Float -> Float` math function eligible to sit in
/// the global scope under its own name?
pub fn is_math_function(name: &str) -> bool {
    MATH_FUNCTIONS.contains(&name)
}

/// The math function names seeded into every method's global scope (spec
/// invariant 5: "named entries for each built-in math function").
pub fn math_function_names() -> &'static [&'static str] {
    MATH_FUNCTIONS
}

/// Atom/bond property words recognized by a `<name> is <property-words> [of
/// <element>]` annotation. Distinct
/// from `is_math_function`/`distance`/`inv`: those are called, never
/// annotated onto a bound name.
pub fn is_known_property(name: &str) -> bool {
    FLOAT_ATOM_PROPERTIES.contains(&name) || INT_ATOM_PROPERTIES.contains(&name) || name == "bond order"
}

/// The maximum number of words any known property name spans (`"van der
/// waals radius"`), used by the parser's greedy longest-match lookahead.
pub const MAX_PROPERTY_WORDS: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn electronegativity_takes_one_atom_returns_float() {
        let sig = FUNCTIONS.get("electronegativity").unwrap();
        assert_eq!(sig.args, vec![ArgType::Object(ObjectKind::Atom)]);
        assert_eq!(sig.ret, FunctionReturn::Numeric(Numeric::Float));
    }

    #[test]
    fn atomic_number_returns_int() {
        let sig = FUNCTIONS.get("atomic number").unwrap();
        assert_eq!(sig.ret, FunctionReturn::Numeric(Numeric::Int));
    }

    #[test]
    fn inv_maps_atom_atom_to_atom_atom() {
        let sig = FUNCTIONS.get("inv").unwrap();
        assert_eq!(sig.ret, FunctionReturn::Array(vec![ObjectKind::Atom, ObjectKind::Atom]));
    }

    #[test]
    fn predicates_have_expected_arity() {
        assert_eq!(PREDICATES.get("bonded").unwrap().args.len(), 2);
        assert_eq!(PREDICATES.get("near").unwrap().args.len(), 3);
    }

    #[test]
    fn math_functions_are_recognized() {
        assert!(is_math_function("sqrt"));
        assert!(!is_math_function("electronegativity"));
    }
}
