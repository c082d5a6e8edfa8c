//! End-to-end tests against the four public entry points:
//! `compile`, `complexity`, `translate`, `has_regression_placeholder`.

use eemc::complexity::ComplexityMode;
use eemc::config::{Backend, TranslateOptions};
use eemc::{compile, complexity, has_regression_placeholder, translate, Error};
use pretty_assertions::assert_eq;

const EEM: &str = "name eem\n\
parameter A is atom\n\
parameter B is atom\n\
i is atom\n\
j is atom\n\
q = EE[ row i, col j : diag A[i], off 1 / distance[i, j], rhs -B[i] ]\n";

#[test]
fn compiles_and_types_the_reserved_q_vector() {
    let compiled = compile(EEM).unwrap();
    let q = compiled.interner.lookup("q").unwrap();
    assert_eq!(compiled.symbols.lookup(q).unwrap().ty(), eemc::types::Type::Array(vec![eemc::types::ObjectKind::Atom]));
}

#[test]
fn asymptotic_complexity_of_an_eem_like_method_is_cubic() {
    assert_eq!(complexity(EEM, ComplexityMode::Asymptotic).unwrap(), "O(N^3)");
}

#[test]
fn exact_complexity_includes_lower_order_terms() {
    let exact = complexity(EEM, ComplexityMode::Exact).unwrap();
    assert!(exact.contains("N^3"), "exact polynomial should retain the dominant term: {exact}");
}

#[test]
fn translate_native_emits_a_rust_module_and_manifest() {
    let files = translate(EEM, Backend::Native, &TranslateOptions::default()).unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert!(names.contains(&"eem.rs"));
    assert!(names.contains(&"Cargo.toml"));
    let module = &files.iter().find(|f| f.relative_path == "eem.rs").unwrap().contents;
    assert!(module.contains("pub fn eem"));
    assert!(module.contains("nalgebra"));
}

#[test]
fn translate_latex_emits_a_glossary_and_equalization_block() {
    let files = translate(EEM, Backend::Latex, &TranslateOptions::default()).unwrap();
    let tex = &files[0].contents;
    assert!(tex.contains("equalization"));
    assert!(tex.contains("is an atom parameter") || tex.contains("are atom parameters"));
}

#[test]
fn translate_graph_emits_a_dot_digraph() {
    let files = translate(EEM, Backend::Graph, &TranslateOptions::default()).unwrap();
    let dot = &files[0].contents;
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("Method"));
}

#[test]
fn translate_refuses_a_program_with_a_regression_placeholder() {
    let source = "name m\nq = {}\n";
    let err = translate(source, Backend::Native, &TranslateOptions::default()).unwrap_err();
    assert_eq!(err, Error::RegressionPlaceholderPresent);
}

#[test]
fn has_regression_placeholder_is_false_for_a_complete_program() {
    assert!(!has_regression_placeholder(EEM).unwrap());
}

#[test]
fn a_syntactically_invalid_program_reports_a_syntax_error_with_position() {
    let source = "name m\nk = \n";
    let err = compile(source).unwrap_err();
    match err {
        Error::Compile(compile_err) => {
            assert_eq!(compile_err.pos().line, 2);
        }
        other => panic!("expected a Compile(SyntaxError), got {other:?}"),
    }
}

/// A method with a guarded substitution, a bounded loop and a sum, exercised
/// end to end through compile, complexity and every back end.
const SUBSTITUTION_METHOD: &str = "name guarded\n\
parameter A is atom\n\
parameter B is atom\n\
i is atom\n\
chi[i] = A[i] if element(i, H)\n\
chi[i] = B[i]\n\
total = sum i: chi[i]\n\
for k = 1 to 3:\n\
  x = k\n\
end\n";

#[test]
fn guarded_substitution_method_compiles_and_translates_cleanly() {
    compile(SUBSTITUTION_METHOD).unwrap();
    let files = translate(SUBSTITUTION_METHOD, Backend::Latex, &TranslateOptions::default()).unwrap();
    assert!(files[0].contents.contains("cases"));
}

#[test]
fn bounded_for_contributes_a_literal_multiple_to_exact_complexity() {
    let exact = complexity(SUBSTITUTION_METHOD, ComplexityMode::Exact).unwrap();
    // 3 iterations of a constant-cost body plus surrounding O(1) terms.
    assert!(exact.contains('3') || exact.contains("N"), "expected the bounded loop's count to show up: {exact}");
}
