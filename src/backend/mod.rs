//! Back-end contracts: read-only `Visitor`-style
//! traversals of the typed AST and symbol table that emit text, never code
//! that runs the DSL program itself (no evaluator lives in this crate).

pub mod graph;
pub mod latex;
pub mod native;

use std::fmt;

use crate::config::Backend;
use crate::intern::Interner;
use crate::scope::SymbolTable;
use crate::{ast::Method, config::TranslateOptions};

/// One file a back end wants written to the output directory, relative to
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub relative_path: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// Dispatches to the requested back end's own generator.
pub fn generate(
    method: &Method,
    symbols: &SymbolTable,
    interner: &Interner,
    backend: Backend,
    options: &TranslateOptions,
) -> Result<Vec<GeneratedFile>, BackendError> {
    match backend {
        Backend::Native => native::generate(method, symbols, interner, options),
        Backend::Latex => latex::generate(method, symbols, interner, options),
        Backend::Graph => graph::generate(method, symbols, interner),
    }
}

/// A name safe to use as a Rust/LaTeX/DOT identifier: the interned spelling
/// verbatim when it already is one, otherwise with spaces and other
/// non-identifier characters replaced by `_` (catalog property names like
/// `"bond order"` are the only multi-word identifiers this crate produces).
pub(crate) fn sanitize_ident(raw: &str) -> String {
    raw.chars().map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' }).collect()
}
