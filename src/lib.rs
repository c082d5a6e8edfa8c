//! eemc — a source-to-source compiler for partial-charge calculation methods.
//!
//! The public surface is the four synchronous entry points:
//! [`compile`], [`complexity`], [`translate`] and
//! [`has_regression_placeholder`]. Each is a pure function from a source
//! string (plus back-end options, where relevant) to its result; nothing
//! here holds state across calls except the process-wide, read-only element
//! table (`elements`).

pub mod ast;
pub mod backend;
pub mod catalog;
pub mod complexity;
pub mod config;
pub mod elements;
pub mod error;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod semant;
pub mod token;
pub mod types;
pub mod visitor;

pub mod cli;

use std::fmt;

pub use ast::Method;
pub use config::{Backend, OptionBag, TranslateOptions};
pub use error::CompileError;
pub use intern::Interner;
pub use scope::SymbolTable;

/// The unified error type for the crate's public API: wraps the front end's
/// `CompileError`, the complexity analyzer's `ComplexityError`, and a back
/// end's `BackendError` behind one `std::error::Error` impl, so a caller
/// going through [`complexity`] or [`translate`] doesn't need to match on
/// which stage failed before rendering a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Compile(CompileError),
    Complexity(complexity::ComplexityError),
    Backend(backend::BackendError),
    /// Raised by [`complexity`] and [`translate`] when the program contains
    /// a regression placeholder — neither a cost formula nor generated code
    /// is well-defined while one is present.
    RegressionPlaceholderPresent,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile(e) => write!(f, "{e}"),
            Error::Complexity(e) => write!(f, "{e}"),
            Error::Backend(e) => write!(f, "{e}"),
            Error::RegressionPlaceholderPresent => {
                write!(f, "cannot analyze or translate a method containing an unresolved regression placeholder")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Compile(e)
    }
}

impl From<complexity::ComplexityError> for Error {
    fn from(e: complexity::ComplexityError) -> Self {
        Error::Complexity(e)
    }
}

impl From<backend::BackendError> for Error {
    fn from(e: backend::BackendError) -> Self {
        Error::Backend(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A successfully compiled method: its typed AST (with parent links already
/// attached) and the symbol table that typed it, plus the interner that
/// resolves every `Symbol` either one carries. `compile` is the only entry
/// point that hands back the interner, since every downstream call
/// ([`complexity`], [`translate`]) needs it to turn symbols back into names.
pub struct Compiled {
    pub method: Method,
    pub symbols: SymbolTable,
    pub interner: Interner,
}

/// Parses and semantically analyzes `source`,
/// returning the typed AST plus symbol table, or the first `SyntaxError`,
/// `SymbolError` or `TypeError` encountered. Parent links are attached
/// before semantic analysis runs; `compile` succeeds even
/// when the program contains a regression placeholder — parsing and scoping
/// remain well-defined with one in place; only
/// `complexity`/`translate` refuse.
pub fn compile(source: &str) -> Result<Compiled> {
    let mut interner = Interner::new();
    let (mut method, _parents) = parser::parse(source, &mut interner)?;
    let symbols = semant::analyze(&mut method, &interner)?;
    Ok(Compiled { method, symbols, interner })
}

/// Does `source` contain a `{}` regression
/// placeholder anywhere in its annotations or statements? Parses `source`
/// first (a placeholder can only be detected once the tree exists); a
/// syntactically invalid program still raises `SyntaxError`.
pub fn has_regression_placeholder(source: &str) -> Result<bool> {
    let mut interner = Interner::new();
    let (method, _parents) = parser::parse(source, &mut interner)?;
    Ok(method.has_regression_placeholder())
}

/// Compiles `source` and returns its symbolic cost
/// formula in the requested mode. Refuses with
/// [`Error::RegressionPlaceholderPresent`] if the program contains an
/// unresolved regression placeholder.
pub fn complexity(source: &str, mode: complexity::ComplexityMode) -> Result<String> {
    let compiled = compile(source)?;
    if compiled.method.has_regression_placeholder() {
        return Err(Error::RegressionPlaceholderPresent);
    }
    let polynomial = complexity::analyze(&compiled.method, &compiled.symbols, &compiled.interner, mode)?;
    Ok(match mode {
        complexity::ComplexityMode::Exact => polynomial.to_string(),
        complexity::ComplexityMode::Asymptotic => format!("O({polynomial})"),
    })
}

/// Compiles `source` and runs the named back end
/// over the typed AST plus symbol table, returning the files it would write.
/// Refuses with [`Error::RegressionPlaceholderPresent`] if the program
/// contains an unresolved regression placeholder.
pub fn translate(source: &str, backend: Backend, options: &TranslateOptions) -> Result<Vec<backend::GeneratedFile>> {
    let compiled = compile(source)?;
    if compiled.method.has_regression_placeholder() {
        return Err(Error::RegressionPlaceholderPresent);
    }
    let files = backend::generate(&compiled.method, &compiled.symbols, &compiled.interner, backend, options)?;
    Ok(files)
}
