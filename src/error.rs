//! The compiler's flat, three-kind error taxonomy.
//!
//! All three kinds carry the offending node's source position and a plain
//! message; none is recovered locally and the analyzer aborts on the first
//! one raised (deterministic single-error diagnostics, per design).

use std::fmt;

use crate::token::Pos;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Syntax { pos: Pos, message: String },
    Symbol { pos: Pos, message: String },
    Type { pos: Pos, message: String },
}

impl CompileError {
    pub fn syntax(pos: Pos, message: impl Into<String>) -> Self {
        CompileError::Syntax { pos, message: message.into() }
    }

    pub fn symbol(pos: Pos, message: impl Into<String>) -> Self {
        CompileError::Symbol { pos, message: message.into() }
    }

    pub fn type_error(pos: Pos, message: impl Into<String>) -> Self {
        CompileError::Type { pos, message: message.into() }
    }

    pub fn pos(&self) -> Pos {
        match self {
            CompileError::Syntax { pos, .. }
            | CompileError::Symbol { pos, .. }
            | CompileError::Type { pos, .. } => *pos,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Syntax { message, .. }
            | CompileError::Symbol { message, .. }
            | CompileError::Type { message, .. } => message,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            CompileError::Syntax { .. } => "SyntaxError",
            CompileError::Symbol { .. } => "SymbolError",
            CompileError::Type { .. } => "TypeError",
        }
    }

    /// Render as `line:column: message` followed by the offending source
    /// line and a caret underline, for the CLI-style wrapper.
    pub fn display_with_source(&self, source: &str) -> String {
        let pos = self.pos();
        let line_content = source.lines().nth(pos.line.saturating_sub(1)).unwrap_or("");
        let caret = format!("{}^", " ".repeat(pos.column));

        format!(
            "{}:{}: {}: {}\n  {}\n  {}",
            pos.line,
            pos.column,
            self.kind_name(),
            self.message(),
            line_content,
            caret
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.pos().line, self.pos().column, self.kind_name(), self.message())
    }
}

impl std::error::Error for CompileError {}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_source_shows_caret() {
        let err = CompileError::type_error(Pos::new(2, 4), "Int <- Float forbidden");
        let source = "k = 0\nk = 1.5\n";
        let rendered = err.display_with_source(source);
        assert!(rendered.contains("2:4: TypeError: Int <- Float forbidden"));
        assert!(rendered.contains("k = 1.5"));
        assert!(rendered.contains("    ^"));
    }
}
