//! Typesetting back end: renders a method as mathematical
//! notation — ∀/∑, `cases` for guarded substitutions, an "equalization"
//! block per EE expression, and a trailing glossary of declared symbols.
//! Grounded directly on `original_source/ccl/generators/latex.py`'s `Latex`
//! visitor, rebuilt over the typed AST's tagged variants.

use crate::ast::{
    BinOp, Constraint, ConstraintKind, Expr, ExprKind, LValue, LogicalOp, Method, NumberLit, PredicateArg, RelOp, Stmt,
    StmtKind,
};
use crate::config::TranslateOptions;
use crate::intern::Interner;
use crate::scope::{ParameterKind, SymbolKind, SymbolTable};
use crate::types::ObjectKind;

use super::{BackendError, GeneratedFile};

const GREEK_LETTERS: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa", "lambda", "mu", "nu", "xi",
    "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi", "omega",
];

/// A name spelled like a Greek letter (case-insensitively) becomes its
/// LaTeX macro (`\chi`); anything else passes through unchanged.
fn get_name(name: &str) -> String {
    if GREEK_LETTERS.contains(&name.to_lowercase().as_str()) {
        format!("\\{}", name.to_lowercase())
    } else {
        name.to_string()
    }
}

pub fn generate(
    method: &Method,
    symbols: &SymbolTable,
    interner: &Interner,
    options: &TranslateOptions,
) -> Result<Vec<GeneratedFile>, BackendError> {
    let mut emitter = Emitter { interner };

    let mut statements = String::new();
    for stmt in &method.statements {
        statements.push_str(&emitter.emit_stmt(stmt, 0));
        statements.push('\n');
    }

    let glossary = emitter.emit_glossary(symbols, options);

    let contents = format!(
        "\\noindent ${statements}$\n\n\\vspace*{{5mm}}\\noindent where\n\n\\noindent {glossary}\n",
    );

    Ok(vec![GeneratedFile { relative_path: "method.tex".to_string(), contents }])
}

struct Emitter<'a> {
    interner: &'a Interner,
}

impl<'a> Emitter<'a> {
    fn name(&self, sym: crate::intern::Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn indent(depth: usize) -> String {
        format!("\\hspace*{{{}mm}}", 4 * depth)
    }

    fn emit_body(&mut self, body: &[Stmt], depth: usize) -> String {
        let lines: Vec<String> = body.iter().map(|s| self.emit_stmt(s, depth)).collect();
        if lines.len() == 1 {
            lines[0].clone()
        } else {
            lines.iter().map(|l| format!("{} {l}", Self::indent(depth))).collect::<Vec<_>>().join("\\\\\n")
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt, depth: usize) -> String {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let lhs = self.emit_lvalue(target);
                if let ExprKind::EE { .. } = &value.kind {
                    self.emit_ee_block(&lhs, value)
                } else {
                    format!("{lhs} = {}", self.emit_expr(value))
                }
            }
            StmtKind::BoundedFor { bound, from, to, body, .. } => {
                let bound_str = get_name(self.name(*bound));
                let from_str = self.emit_expr(from);
                let to_str = self.emit_expr(to);
                let body_str = self.emit_body(body, depth + 1);
                format!("\\text{{for }} {from_str} \\leq {bound_str} \\leq {to_str}:\n{body_str}")
            }
            StmtKind::ObjectFor { bound, object_kind, constraint, body, .. } => {
                let bound_str = get_name(self.name(*bound));
                let kind = match object_kind {
                    ObjectKind::Atom => "atom",
                    ObjectKind::Bond => "bond",
                };
                let body_str = self.emit_body(body, depth + 1);
                let mut head = format!("\\forall \\text{{ {kind} }} {bound_str}");
                if let Some(c) = constraint {
                    head.push_str(&format!("\\text{{ such that }} {}", self.emit_constraint(c)));
                }
                format!("{head}: {body_str}")
            }
        }
    }

    fn emit_lvalue(&self, lvalue: &LValue) -> String {
        match lvalue {
            LValue::Name(name, _) => get_name(self.name(*name)),
            LValue::Subscript { name, indices, .. } => {
                let idx: Vec<String> = indices.iter().map(|(s, _)| get_name(self.name(*s))).collect();
                format!("{}_{{{}}}", get_name(self.name(*name)), idx.join(", "))
            }
        }
    }

    fn is_atom(expr: &Expr) -> bool {
        matches!(expr.kind, ExprKind::Name(_) | ExprKind::Number(_) | ExprKind::Subscript { .. })
    }

    fn emit_expr(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Number(NumberLit::Int(v)) => v.to_string(),
            ExprKind::Number(NumberLit::Float(v)) => v.to_string(),
            ExprKind::Name(name) => get_name(self.name(*name)),
            ExprKind::Subscript { name, indices, .. } => {
                let idx: Vec<String> = indices.iter().map(|(s, _)| get_name(self.name(*s))).collect();
                format!("{}_{{{}}}", get_name(self.name(*name)), idx.join(", "))
            }
            ExprKind::BinaryOp { op, left, right } => self.emit_binary_op(*op, left, right),
            ExprKind::UnaryMinus(inner) => format!("-{}", self.emit_expr(inner)),
            ExprKind::Sum { bound, body, .. } => {
                let bound_str = get_name(self.name(*bound));
                format!("\\sum_{{{bound_str}}}\\left({}\\right)", self.emit_expr(body))
            }
            ExprKind::Function { name, arg, .. } => {
                format!("\\text{{{}}}\\left({}\\right)", get_name(self.name(*name)), self.emit_expr(arg))
            }
            ExprKind::EE { .. } => self.emit_ee_block("", expr),
            ExprKind::RegressionPlaceholder => "\\square".to_string(),
        }
    }

    fn emit_binary_op(&mut self, op: BinOp, left: &Expr, right: &Expr) -> String {
        let mut left_str = self.emit_expr(left);
        let mut right_str = self.emit_expr(right);

        match op {
            BinOp::Mul => {
                if !Self::is_atom(left) && !matches!(left.kind, ExprKind::BinaryOp { op: BinOp::Pow, .. }) {
                    left_str = format!("\\left({left_str}\\right)");
                }
                if !Self::is_atom(right) && !matches!(right.kind, ExprKind::BinaryOp { op: BinOp::Pow, .. }) {
                    right_str = format!("\\left({right_str}\\right)");
                }
                format!("{left_str} {right_str}")
            }
            BinOp::Div => format!("\\frac{{{left_str}}}{{{right_str}}}"),
            BinOp::Pow => {
                if Self::is_atom(left) {
                    format!("{{{left_str}}} ^ {{{right_str}}}")
                } else {
                    format!("\\left({left_str}\\right)^{{{right_str}}}")
                }
            }
            BinOp::Add => format!("{left_str} + {right_str}"),
            BinOp::Sub => format!("{left_str} - {right_str}"),
        }
    }

    /// One EE expression's linear-system statement: an "equalization" block
    /// for each EE expression. `lhs` is the name the
    /// EE's solution is assigned to, or empty when the EE appears bare.
    fn emit_ee_block(&mut self, lhs: &str, expr: &Expr) -> String {
        let ExprKind::EE { row, col, diag, off, rhs, cutoff, .. } = &expr.kind else {
            unreachable!("emit_ee_block called on a non-EE expression")
        };
        let row_str = get_name(self.name(*row));
        let col_str = get_name(self.name(*col));
        let diag_str = self.emit_expr(diag);
        let off_str = self.emit_expr(off);
        let rhs_str = self.emit_expr(rhs);

        let solved_for = if lhs.is_empty() { "q".to_string() } else { lhs.to_string() };

        let mut block = format!(
            "\\text{{equalization: solve }} A {solved_for} = b \\text{{ for }} {solved_for} \\text{{, where}}\\\\\n\
             \\begin{{cases}}\n\
             A_{{{row_str}, {row_str}}} = {diag_str} \\\\\n\
             A_{{{row_str}, {col_str}}} = {off_str} & {row_str} \\neq {col_str} \\\\\n\
             b_{{{row_str}}} = {rhs_str}\n\
             \\end{{cases}}"
        );
        if let Some(cutoff) = cutoff {
            block.push_str(&format!(
                "\\\\\n\\text{{(truncated to pairs within radius }} {}\\text{{)}}",
                self.emit_expr(&cutoff.radius)
            ));
        }
        block
    }

    fn emit_constraint(&mut self, constraint: &Constraint) -> String {
        match &constraint.kind {
            ConstraintKind::RelOp { op, left, right } => {
                format!("${} {} {}$", self.emit_expr(left), rel_op_latex(*op), self.emit_expr(right))
            }
            ConstraintKind::BinaryLogical { op, left, right } => {
                let joiner = match op {
                    LogicalOp::And => "and",
                    LogicalOp::Or => "or",
                };
                format!("{} {joiner} {}", self.emit_constraint(left), self.emit_constraint(right))
            }
            ConstraintKind::Not(inner) => format!("not {}", self.emit_constraint(inner)),
            ConstraintKind::Predicate { name, args, .. } => self.emit_predicate(*name, args),
        }
    }

    fn emit_predicate(&mut self, name: crate::intern::Symbol, args: &[PredicateArg]) -> String {
        let predicate_name = self.name(name).to_string();
        let arg_str = |a: &PredicateArg| match a {
            PredicateArg::Name(s, _) => get_name(self.interner.resolve(*s)),
            PredicateArg::Number(NumberLit::Int(v), _) => v.to_string(),
            PredicateArg::Number(NumberLit::Float(v), _) => v.to_string(),
            PredicateArg::Str(s, _) => s.clone(),
        };
        match predicate_name.as_str() {
            "bonded" if args.len() == 2 => {
                format!("{}\\text{{ is bonded to }}{}", arg_str(&args[0]), arg_str(&args[1]))
            }
            "element" if args.len() == 2 => {
                format!("{}\\text{{ is {}}}", arg_str(&args[0]), arg_str(&args[1]))
            }
            _ => {
                let joined: Vec<String> = args.iter().map(arg_str).collect();
                format!("\\text{{{predicate_name}}}({})", joined.join(", "))
            }
        }
    }

    /// Builds the trailing "where ..." glossary sentence, grounded on
    /// `latex.py`'s `visit_SymbolTable`.
    fn emit_glossary(&mut self, symbols: &SymbolTable, options: &TranslateOptions) -> String {
        let mut atom_parameters = Vec::new();
        let mut bond_parameters = Vec::new();
        let mut common_parameters = Vec::new();
        let mut substitutions = Vec::new();
        let mut atoms = Vec::new();
        let mut bonds = Vec::new();
        let mut functions = Vec::new();

        let mut sorted: Vec<_> = symbols.globals.iter().collect();
        sorted.sort_by_key(|(sym, _)| self.name(**sym).to_string());

        for (sym, entry) in sorted {
            match &entry.kind {
                SymbolKind::Parameter(ParameterKind::AtomParameter) => atom_parameters.push(*sym),
                SymbolKind::Parameter(ParameterKind::BondParameter) => bond_parameters.push(*sym),
                SymbolKind::Parameter(ParameterKind::CommonParameter) => common_parameters.push(*sym),
                SymbolKind::Object { kind: ObjectKind::Atom, constraint } => atoms.push((*sym, constraint.clone())),
                SymbolKind::Object { kind: ObjectKind::Bond, constraint } => bonds.push((*sym, constraint.clone())),
                SymbolKind::Substitution(data) => substitutions.push((*sym, data.clone())),
                SymbolKind::Function(_) | SymbolKind::Constant { .. } => functions.push(*sym),
                SymbolKind::Variable(_) => {} // "we need only vector q" — latex.py
            }
        }

        let mut expression_sentences = Vec::new();
        for (sym, data) in &substitutions {
            let name_str = get_name(self.name(*sym));
            if data.rules.len() == 1 {
                let indices: Vec<String> = data.indices.iter().map(|s| get_name(self.name(*s))).collect();
                let idx = if indices.is_empty() { String::new() } else { format!("_{{{}}}", indices.join(", ")) };
                let value = self.emit_expr(&data.rules[0].body);
                expression_sentences.push(format!("${name_str}{idx} = {value}$\\\\"));
            } else {
                let indices: Vec<String> = data.indices.iter().map(|s| get_name(self.name(*s))).collect();
                let idx = format!("_{{{}}}", indices.join(", "));
                let mut cases = String::new();
                for rule in &data.rules {
                    let value = self.emit_expr(&rule.body);
                    let guard = match &rule.guard {
                        Some(g) => format!("\\text{{if }} {} \\\\", self.emit_constraint(g)),
                        None => "\\text{otherwise}\\\\".to_string(),
                    };
                    cases.push_str(&format!("{value} & {guard}\n"));
                }
                expression_sentences.push(format!("${name_str}{idx} = \n\\begin{{cases}}\n{cases}\\end{{cases}}$"));
            }
        }

        let mut sentences = Vec::new();
        if expression_sentences.is_empty() {
            sentences.push("$q$ is a vector of charges".to_string());
        } else {
            sentences.push("\n\n\\noindent and\n\n$q$ is a vector of charges".to_string());
        }

        for sym in &functions {
            let name_str = get_name(self.name(*sym));
            if self.name(*sym) == "distance" {
                sentences.push(format!("${name_str}_{{i, j}}$ is a distance between atoms $i$ and $j$"));
            } else {
                sentences.push(format!("${name_str}$ is a catalog property"));
            }
        }

        push_group(&mut sentences, &atom_parameters, self.interner, "an atom parameter", "atom parameters");
        push_group(&mut sentences, &bond_parameters, self.interner, "a bond parameter", "bond parameters");
        push_group(&mut sentences, &common_parameters, self.interner, "a common parameter", "common parameters");

        for (sym, constraint) in &atoms {
            let mut s = format!("${}$ is an atom", get_name(self.name(*sym)));
            if let Some(c) = constraint {
                s.push_str(&format!(" such that {}", self.emit_constraint(c)));
            }
            sentences.push(s);
        }
        for (sym, constraint) in &bonds {
            let mut s = format!("${}$ is a bond", get_name(self.name(*sym)));
            if let Some(c) = constraint {
                s.push_str(&format!(" such that {}", self.emit_constraint(c)));
            }
            sentences.push(s);
        }

        if options.bond_info {
            sentences.push("per-bond metadata is available to the generated program".to_string());
        }
        if options.bond_distances {
            sentences.push("pairwise atom distances are available to the generated program".to_string());
        }

        format!("{}{}.", expression_sentences.join("\n"), sentences.join(", "))
    }
}

fn push_group(sentences: &mut Vec<String>, syms: &[crate::intern::Symbol], interner: &Interner, singular: &str, plural: &str) {
    if syms.is_empty() {
        return;
    }
    if syms.len() == 1 {
        sentences.push(format!("${}$ is {singular}", get_name(interner.resolve(syms[0]))));
    } else {
        let names: Vec<String> = syms.iter().map(|s| format!("${}$", get_name(interner.resolve(*s)))).collect();
        sentences.push(format!("{} are {plural}", names.join(", ")));
    }
}

fn rel_op_latex(op: RelOp) -> &'static str {
    match op {
        RelOp::Lt => "<",
        RelOp::Le => "\\leq",
        RelOp::Gt => ">",
        RelOp::Ge => "\\geq",
        RelOp::Eq => "=",
        RelOp::Neq => "\\neq",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(source: &str) -> String {
        let mut interner = Interner::new();
        let (mut method, _) = crate::parser::parse(source, &mut interner).unwrap();
        let symbols = crate::semant::analyze(&mut method, &interner).unwrap();
        let files = generate(&method, &symbols, &interner, &TranslateOptions::default()).unwrap();
        files.into_iter().next().unwrap().contents
    }

    #[test]
    fn get_name_macro_ises_a_greek_letter_spelled_name_case_insensitively() {
        assert_eq!(get_name("chi"), "\\chi");
        assert_eq!(get_name("Chi"), "\\chi");
        assert_eq!(get_name("electronegativity"), "electronegativity");
    }

    #[test]
    fn a_single_unguarded_substitution_prints_a_plain_equation() {
        let tex = translate("name m\nparameter A is atom\ni is atom\nchi[i] = A[i]\nk = 1\n");
        assert!(tex.contains("\\chi"));
        assert!(!tex.contains("cases"));
    }

    #[test]
    fn a_guarded_substitution_emits_a_cases_block() {
        let source = "name m\nparameter A is atom\nparameter B is atom\ni is atom\nchi[i] = A[i] if element(i, H)\nchi[i] = B[i]\nk = 1\n";
        let tex = translate(source);
        assert!(tex.contains("cases"));
        assert!(tex.contains("otherwise"));
    }

    #[test]
    fn an_ee_expression_emits_an_equalization_block() {
        let source = "name m\nparameter A is common\ni is atom\nj is atom\nq = EE[ row i, col j : diag A, off A, rhs A ]\n";
        let tex = translate(source);
        assert!(tex.contains("equalization"));
    }

    #[test]
    fn division_is_rendered_as_a_frac() {
        let source = "name m\nk = 1 / 2\n";
        let tex = translate(source);
        assert!(tex.contains("\\frac"));
    }

    #[test]
    fn multiplication_parenthesizes_a_non_atomic_operand() {
        let source = "name m\nk = (1 + 2) * 3\n";
        let tex = translate(source);
        assert!(tex.contains("\\left("));
    }

    #[test]
    fn glossary_lists_a_common_parameter_singular_and_plural() {
        let one = translate("name m\nparameter A is common\nk = 1\n");
        assert!(one.contains("is a common parameter"));

        let two = translate("name m\nparameter A is common\nparameter B is common\nk = 1\n");
        assert!(two.contains("are common parameters"));
    }

    #[test]
    fn bond_info_option_adds_its_own_glossary_sentence() {
        let mut interner = Interner::new();
        let (mut method, _) = crate::parser::parse("name m\nk = 1\n", &mut interner).unwrap();
        let symbols = crate::semant::analyze(&mut method, &interner).unwrap();
        let options = TranslateOptions { bond_info: true, ..TranslateOptions::default() };
        let files = generate(&method, &symbols, &interner, &options).unwrap();
        assert!(files[0].contents.contains("per-bond metadata"));
    }
}
