//! Native back end: emits Rust + `nalgebra` rather than the
//! original's C++/Eigen, since this crate's readers are Rust developers and
//! `nalgebra` covers the same `DVector`/`DMatrix`/LU-solve vocabulary the DSL
//! exposes. Three files come out of a translation: the generated module, its
//! crate-level doc comment (Rust's stand-in for the original's `.h` header,
//! noted in DESIGN.md), and a `Cargo.toml` manifest in place of the
//! original's `CMakeLists.txt`.

use crate::ast::{BinOp, Constraint, ConstraintKind, Expr, ExprKind, LValue, Method, NumberLit, Stmt, StmtKind};
use crate::config::TranslateOptions;
use crate::intern::Interner;
use crate::scope::{ParameterKind, SymbolKind, SymbolTable};
use crate::types::ObjectKind;

use super::{sanitize_ident, BackendError, GeneratedFile};

pub fn generate(
    method: &Method,
    symbols: &SymbolTable,
    interner: &Interner,
    options: &TranslateOptions,
) -> Result<Vec<GeneratedFile>, BackendError> {
    let method_name = sanitize_ident(interner.resolve(method.name));

    let mut body = String::new();
    let mut uses_ee = false;
    for stmt in &method.statements {
        emit_stmt(stmt, interner, 1, &mut body, &mut uses_ee)?;
    }

    let parameters = parameter_declarations(symbols, interner);
    let blank = if options.format_code { "\n" } else { "" };

    let mut source = String::new();
    source.push_str(&format!(
        "//! Generated from the `{name}` partial-charge method.\n//! Regenerate with `eemc translate`; do not hand-edit.\n{blank}",
        name = interner.resolve(method.name),
    ));
    if options.bond_info {
        source.push_str("#![cfg_attr(not(feature = \"bond_info\"), allow(dead_code))]\n");
    }
    source.push_str(&format!("use nalgebra::{{DMatrix, DVector}};\n{blank}"));
    source.push_str(&parameters);
    if uses_ee {
        source.push_str(SOLVE_EE);
        source.push_str(blank);
    }
    let charge_arg = if uses_ee { ", total_charge: f64" } else { "" };
    source.push_str(&format!(
        "pub fn {name}(n_atoms: usize, n_bonds: usize{charge_arg}) -> DVector<f64> {{\n    let mut q = DVector::<f64>::zeros(n_atoms);\n{blank}{body}    q\n}}\n",
        name = method_name,
    ));

    let manifest = format!(
        "[package]\nname = \"{name}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\nnalgebra = \"0.32\"\n",
        name = method_name,
    );

    Ok(vec![
        GeneratedFile { relative_path: format!("{method_name}.rs"), contents: source },
        GeneratedFile { relative_path: "Cargo.toml".to_string(), contents: manifest },
    ])
}

/// One `const`/comment line per declared Parameter, listing its kind so a
/// reader of the generated module can see what data the caller must supply
/// (the original's forward declarations / parameter string lists).
fn parameter_declarations(symbols: &SymbolTable, interner: &Interner) -> String {
    let mut names: Vec<(&str, ParameterKind)> = symbols
        .globals
        .iter()
        .filter_map(|(sym, entry)| match &entry.kind {
            SymbolKind::Parameter(kind) => Some((interner.resolve(*sym), *kind)),
            _ => None,
        })
        .collect();
    names.sort();
    if names.is_empty() {
        return String::new();
    }
    let mut out = String::from("// Declared parameters (caller-supplied data):\n");
    for (name, kind) in names {
        let kind_name = match kind {
            ParameterKind::AtomParameter => "per-atom",
            ParameterKind::BondParameter => "per-bond",
            ParameterKind::CommonParameter => "scalar",
        };
        out.push_str(&format!("//   {name}: {kind_name}\n"));
    }
    out.push('\n');
    out
}

fn indent(level: usize) -> String {
    "    ".repeat(level)
}

/// The EE lowering: an `(N+1)×(N+1)` matrix with unit last
/// row/column and zero bottom-right corner, the molecule's total charge in
/// the last RHS entry, solved by a dense partial-pivot LU, returning the
/// first N entries.
const SOLVE_EE: &str = "\
fn solve_ee(n: usize, coeff: impl Fn(usize, usize) -> f64, rhs: impl Fn(usize) -> f64, total_charge: f64) -> DVector<f64> {
    let mut a = DMatrix::<f64>::zeros(n + 1, n + 1);
    let mut b = DVector::<f64>::zeros(n + 1);
    for i in 0..n {
        for j in 0..n {
            a[(i, j)] = coeff(i, j);
        }
        a[(i, n)] = 1.0;
        a[(n, i)] = 1.0;
        b[i] = rhs(i);
    }
    b[n] = total_charge;
    let solution = a.lu().solve(&b).expect(\"EE system is singular\");
    solution.rows(0, n).into_owned()
}
";

fn emit_stmt(stmt: &Stmt, interner: &Interner, level: usize, out: &mut String, uses_ee: &mut bool) -> Result<(), BackendError> {
    match &stmt.kind {
        StmtKind::Assign { target, value } => {
            let rhs = emit_expr(value, interner, uses_ee)?;
            let lhs = match target {
                LValue::Name(name, _) => sanitize_ident(interner.resolve(*name)),
                LValue::Subscript { name, indices, .. } => {
                    let idx = indices.iter().map(|(s, _)| sanitize_ident(interner.resolve(*s))).collect::<Vec<_>>().join("][");
                    format!("{}[{}]", sanitize_ident(interner.resolve(*name)), idx)
                }
            };
            out.push_str(&format!("{}{} = {};\n", indent(level), lhs, rhs));
        }
        StmtKind::BoundedFor { bound, from, to, body, .. } => {
            let bound_name = sanitize_ident(interner.resolve(*bound));
            let from_str = emit_expr(from, interner, uses_ee)?;
            let to_str = emit_expr(to, interner, uses_ee)?;
            out.push_str(&format!("{}for {} in {}..{} {{\n", indent(level), bound_name, from_str, to_str));
            for s in body {
                emit_stmt(s, interner, level + 1, out, uses_ee)?;
            }
            out.push_str(&format!("{}}}\n", indent(level)));
        }
        StmtKind::ObjectFor { bound, object_kind, constraint, body, .. } => {
            let bound_name = sanitize_ident(interner.resolve(*bound));
            let range = match object_kind {
                ObjectKind::Atom => "0..n_atoms",
                ObjectKind::Bond => "0..n_bonds",
            };
            out.push_str(&format!("{}for {} in {} {{\n", indent(level), bound_name, range));
            let mut inner_level = level + 1;
            if let Some(c) = constraint {
                out.push_str(&format!("{}if {} {{\n", indent(inner_level), emit_constraint(c, interner, uses_ee)?));
                inner_level += 1;
            }
            for s in body {
                emit_stmt(s, interner, inner_level, out, uses_ee)?;
            }
            if constraint.is_some() {
                out.push_str(&format!("{}}}\n", indent(inner_level - 1)));
            }
            out.push_str(&format!("{}}}\n", indent(level)));
        }
    }
    Ok(())
}

fn emit_expr(expr: &Expr, interner: &Interner, uses_ee: &mut bool) -> Result<String, BackendError> {
    Ok(match &expr.kind {
        ExprKind::Number(NumberLit::Int(v)) => v.to_string(),
        ExprKind::Number(NumberLit::Float(v)) => format!("{v:?}"),
        ExprKind::Name(name) => sanitize_ident(interner.resolve(*name)),
        ExprKind::Subscript { name, indices, .. } => {
            let idx = indices.iter().map(|(s, _)| sanitize_ident(interner.resolve(*s))).collect::<Vec<_>>().join("][");
            format!("{}[{}]", sanitize_ident(interner.resolve(*name)), idx)
        }
        ExprKind::BinaryOp { op: BinOp::Pow, left, right } => {
            format!("({}).powf({})", emit_expr(left, interner, uses_ee)?, emit_expr(right, interner, uses_ee)?)
        }
        ExprKind::BinaryOp { op, left, right } => {
            format!("({} {} {})", emit_expr(left, interner, uses_ee)?, rust_op(*op), emit_expr(right, interner, uses_ee)?)
        }
        ExprKind::UnaryMinus(inner) => format!("(-{})", emit_expr(inner, interner, uses_ee)?),
        ExprKind::Sum { bound, body, .. } => {
            let bound_name = sanitize_ident(interner.resolve(*bound));
            format!("(0..n_atoms).map(|{bound_name}| {}).sum::<f64>()", emit_expr(body, interner, uses_ee)?)
        }
        ExprKind::Function { name, arg, .. } => {
            format!("{}({})", sanitize_ident(interner.resolve(*name)), emit_expr(arg, interner, uses_ee)?)
        }
        ExprKind::EE { diag, off, rhs, cutoff, .. } => {
            if cutoff.is_some() {
                return Err(BackendError("native back end cannot emit EE's cutoff/cover mode".to_string()));
            }
            *uses_ee = true;
            format!(
                "solve_ee(n_atoms, |i, j| if i == j {{ {} }} else {{ {} }}, |i| {}, total_charge)",
                emit_expr(diag, interner, uses_ee)?,
                emit_expr(off, interner, uses_ee)?,
                emit_expr(rhs, interner, uses_ee)?,
            )
        }
        ExprKind::RegressionPlaceholder => {
            return Err(BackendError("cannot translate a method containing a regression placeholder".to_string()));
        }
    })
}

fn emit_constraint(constraint: &Constraint, interner: &Interner, uses_ee: &mut bool) -> Result<String, BackendError> {
    Ok(match &constraint.kind {
        ConstraintKind::RelOp { op, left, right } => {
            format!("{} {} {}", emit_expr(left, interner, uses_ee)?, rust_rel_op(*op), emit_expr(right, interner, uses_ee)?)
        }
        ConstraintKind::BinaryLogical { op, left, right } => {
            let joiner = match op {
                crate::ast::LogicalOp::And => "&&",
                crate::ast::LogicalOp::Or => "||",
            };
            format!("({} {} {})", emit_constraint(left, interner, uses_ee)?, joiner, emit_constraint(right, interner, uses_ee)?)
        }
        ConstraintKind::Not(inner) => format!("!({})", emit_constraint(inner, interner, uses_ee)?),
        ConstraintKind::Predicate { name, args, .. } => {
            let arg_strs: Vec<String> = args
                .iter()
                .map(|a| match a {
                    crate::ast::PredicateArg::Name(s, _) => sanitize_ident(interner.resolve(*s)),
                    crate::ast::PredicateArg::Number(NumberLit::Int(v), _) => v.to_string(),
                    crate::ast::PredicateArg::Number(NumberLit::Float(v), _) => format!("{v:?}"),
                    crate::ast::PredicateArg::Str(s, _) => format!("{s:?}"),
                })
                .collect();
            format!("{}({})", sanitize_ident(interner.resolve(*name)), arg_strs.join(", "))
        }
    })
}

/// `Pow` is handled separately in `emit_expr` via `.powf(...)` — Rust's `^`
/// is bitwise XOR, not exponentiation.
fn rust_op(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Pow => unreachable!("Pow is special-cased in emit_expr before rust_op is called"),
    }
}

fn rust_rel_op(op: crate::ast::RelOp) -> &'static str {
    use crate::ast::RelOp::*;
    match op {
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        Eq => "==",
        Neq => "!=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeHeader;
    use crate::intern::Interner;
    use crate::token::Pos;

    fn header() -> NodeHeader {
        NodeHeader { id: crate::ast::NodeId::default(), pos: Pos::new(1, 0) }
    }

    #[test]
    fn emits_a_number_literal_verbatim() {
        let interner = Interner::new();
        let expr = Expr::new(header(), ExprKind::Number(NumberLit::Int(2)));
        let mut uses_ee = false;
        assert_eq!(emit_expr(&expr, &interner, &mut uses_ee).unwrap(), "2");
        assert!(!uses_ee);
    }

    #[test]
    fn rejects_a_regression_placeholder() {
        let interner = Interner::new();
        let expr = Expr::new(header(), ExprKind::RegressionPlaceholder);
        let mut uses_ee = false;
        assert!(emit_expr(&expr, &interner, &mut uses_ee).is_err());
    }

    #[test]
    fn ee_expression_pulls_in_the_solve_ee_helper_and_a_total_charge_parameter() {
        let mut interner = Interner::new();
        let (method, _) = crate::parser::parse(
            "name m\nparameter A is common\nparameter B is common\ni is atom\nj is atom\nq = EE[ row i, col j : diag A, off 1, rhs -B ]\n",
            &mut interner,
        )
        .unwrap();
        let mut method = method;
        let symbols = crate::semant::analyze(&mut method, &interner).unwrap();
        let files = generate(&method, &symbols, &interner, &TranslateOptions::default()).unwrap();
        let source = &files.iter().find(|f| f.relative_path.ends_with(".rs")).unwrap().contents;
        assert!(source.contains("fn solve_ee"));
        assert!(source.contains("total_charge: f64"));
    }
}
