//! Recursive-descent parser: token stream to typed AST.
//!
//! A method's body is a genuinely interleaved mix of annotations and
//! statements (spec: "an ordered mix of annotations and statements"), not a
//! contiguous annotation prefix followed by a statement suffix — a bare
//! assignment like `q = EE[...]` is a legal, and common, final statement
//! with no loop anywhere in the method. Each top-level construct is
//! classified before it's parsed: `parameter` and `<ident> is ...` are
//! always annotations, `for` is always a statement, and a bare
//! `<ident> = <expr>` is a `Substitution` only when it carries a subscript
//! or a trailing `if` guard — the two shapes a plain `Assignment` statement
//! never has. Classifying the bare-name, no-guard case requires a bounded
//! lookahead past the expression to see whether an `if` follows; the
//! checkpoint is rewound before the construct is parsed for real.

mod annotation;
mod constraint;
mod expr;
mod stmt;

use crate::ast::{Method, NodeHeader, NodeId, NodeIdGen, ParentLinker};
use crate::error::{CompileError, CompileResult};
use crate::intern::{Interner, Symbol};
use crate::token::{Pos, Token, TokenKind};

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    interner: &'a mut Interner,
    ids: NodeIdGen,
}

pub(crate) type ParseResult<T> = CompileResult<T>;

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, interner: &'a mut Interner) -> Self {
        Self { tokens, current: 0, interner, ids: NodeIdGen::new() }
    }

    pub(crate) fn header(&self, pos: Pos) -> NodeHeader {
        NodeHeader { id: self.ids.next_id(), pos }
    }

    pub(crate) fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    pub(crate) fn interner_ref(&self) -> &Interner {
        self.interner
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    /// Saves the token cursor for a bounded lookahead attempt (parenthesized
    /// constraint vs. parenthesized arithmetic expression). Node
    /// ids handed out during an abandoned attempt are simply never linked
    /// into the final tree; `NodeIdGen` never rewinds.
    fn checkpoint(&self) -> usize {
        self.current
    }

    fn restore(&mut self, checkpoint: usize) {
        self.current = checkpoint;
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().kind.clone();
            Err(CompileError::syntax(
                self.peek().pos,
                format!("expected {kind:?} {context}, found {found:?}"),
            ))
        }
    }

    fn expect_ident(&mut self, context: &str) -> ParseResult<(Symbol, Pos)> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok((sym, tok.pos))
            }
            other => Err(CompileError::syntax(tok.pos, format!("expected identifier {context}, found {other:?}"))),
        }
    }

    /// `name <ident>` followed by an interleaved mix of annotations and
    /// statements; each top-level construct is routed to whichever of
    /// `method.annotations` / `method.statements` it belongs to via
    /// `classify_top_level`.
    pub fn parse_method(&mut self) -> ParseResult<(Method, std::collections::HashMap<NodeId, NodeId>)> {
        self.expect(TokenKind::Name, "at the start of a method")?;
        let (name, name_pos) = self.expect_ident("after 'name'")?;
        let mut method = Method::new(name, name_pos);

        while !self.is_at_end() {
            match self.classify_top_level()? {
                TopLevelKind::Annotation => method.annotations.push(self.parse_annotation()?),
                TopLevelKind::Statement => method.statements.push(self.parse_stmt()?),
            }
        }

        let parents = ParentLinker::link(&method);
        Ok((method, parents))
    }

    /// Decides, without consuming input beyond a rewound checkpoint,
    /// whether the next top-level construct is an annotation or a
    /// statement.
    fn classify_top_level(&mut self) -> ParseResult<TopLevelKind> {
        if self.check(&TokenKind::Parameter) {
            return Ok(TopLevelKind::Annotation);
        }
        if self.check(&TokenKind::For) {
            return Ok(TopLevelKind::Statement);
        }

        match self.peek_at(1).map(|t| &t.kind) {
            Some(TokenKind::Is) => Ok(TopLevelKind::Annotation),
            // A subscripted top-level lhs only ever type-checks as a
            // Substitution: its index names aren't bound by any enclosing
            // loop, which only a Substitution's temporary per-use binding
            // tolerates.
            Some(TokenKind::LBracket) => Ok(TopLevelKind::Annotation),
            Some(TokenKind::Assign) => {
                let checkpoint = self.checkpoint();
                self.advance(); // the bare name
                self.advance(); // '='
                self.parse_expr()?;
                let has_guard = self.check(&TokenKind::If);
                self.restore(checkpoint);
                Ok(if has_guard { TopLevelKind::Annotation } else { TopLevelKind::Statement })
            }
            _ => {
                let tok = self.peek().clone();
                Err(CompileError::syntax(
                    tok.pos,
                    format!("expected 'is', '[' or '=' after an identifier at the top level, found {:?}", tok.kind),
                ))
            }
        }
    }
}

enum TopLevelKind {
    Annotation,
    Statement,
}

/// Lexes and parses `source` into a `Method` plus its parent-link table.
pub fn parse(source: &str, interner: &mut Interner) -> CompileResult<(Method, std::collections::HashMap<NodeId, NodeId>)> {
    let tokens = crate::lexer::Lexer::new(source, interner).tokenize()?;
    let mut parser = Parser::new(tokens, interner);
    parser.parse_method()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_method_name() {
        let mut interner = Interner::new();
        let (method, _) = parse("name eem\nk = 1\n", &mut interner).unwrap();
        assert_eq!(interner.resolve(method.name), "eem");
    }

    #[test]
    fn annotations_before_the_first_for_then_statements_after() {
        let mut interner = Interner::new();
        let source = "name m\nparameter A is common\ni is atom\nfor each j is atom:\nend\nk = 1\n";
        let (method, _) = parse(source, &mut interner).unwrap();
        assert_eq!(method.annotations.len(), 2);
        assert_eq!(method.statements.len(), 2);
    }

    #[test]
    fn a_for_token_inside_an_annotation_like_position_switches_to_statements_early() {
        // Once `for` is seen, nothing after it is ever read back as an
        // annotation, even if the body looks like one.
        let mut interner = Interner::new();
        let source = "name m\nfor each i is atom:\nend\n";
        let (method, _) = parse(source, &mut interner).unwrap();
        assert!(method.annotations.is_empty());
        assert_eq!(method.statements.len(), 1);
    }

    #[test]
    fn missing_name_keyword_is_a_syntax_error() {
        let mut interner = Interner::new();
        let err = parse("k = 1\n", &mut interner).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn a_bare_assignment_with_no_loop_anywhere_is_a_statement_not_a_substitution() {
        let mut interner = Interner::new();
        let source = "name eem\nparameter A is atom\ni is atom\nq = A[i]\n";
        let (method, _) = parse(source, &mut interner).unwrap();
        assert_eq!(method.annotations.len(), 2);
        assert_eq!(method.statements.len(), 1);
    }

    #[test]
    fn a_subscripted_top_level_assignment_is_still_a_substitution() {
        let mut interner = Interner::new();
        let source = "name m\nparameter A is atom\nchi[i] = A[i]\n";
        let (method, _) = parse(source, &mut interner).unwrap();
        assert_eq!(method.annotations.len(), 2);
        assert!(method.statements.is_empty());
    }

    #[test]
    fn a_guarded_bare_assignment_is_a_substitution_even_without_a_subscript() {
        let mut interner = Interner::new();
        let source = "name m\ni is atom\nq = 1 if element(i, H)\n";
        let (method, _) = parse(source, &mut interner).unwrap();
        assert_eq!(method.annotations.len(), 2);
        assert!(method.statements.is_empty());
    }

    #[test]
    fn parent_links_cover_every_statement_and_annotation_node() {
        let mut interner = Interner::new();
        let source = "name m\ni is atom\nfor each j is atom:\n  x = 1\nend\n";
        let (method, parents) = parse(source, &mut interner).unwrap();
        // The outer `for` statement's own id has no parent (it's a root).
        let for_stmt = &method.statements[0];
        assert!(!parents.contains_key(&for_stmt.header.id));
    }
}
