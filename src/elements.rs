//! A read-only table of known element names, loaded once at startup from a
//! bundled resource. Its lifecycle is program-init to program-exit; it is
//! never mutated.

use std::collections::HashSet;

use once_cell::sync::Lazy;

const ELEMENTS_RAW: &str = include_str!("data/elements.txt");

static ELEMENT_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set = HashSet::new();
    for line in ELEMENTS_RAW.lines() {
        for word in line.split_whitespace() {
            set.insert(word);
        }
    }
    set
});

/// Is `name` a known chemical element symbol or English name (case-sensitive,
/// matching the bundled table)? Used by predicate checking for `element(Atom,
/// String)` literal arguments.
pub fn is_known_element(name: &str) -> bool {
    ELEMENT_NAMES.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_symbol_and_name() {
        assert!(is_known_element("H"));
        assert!(is_known_element("Hydrogen"));
    }

    #[test]
    fn rejects_unknown_word() {
        assert!(!is_known_element("Unobtainium"));
    }

    #[test]
    fn is_case_sensitive() {
        assert!(!is_known_element("hydrogen"));
    }
}
