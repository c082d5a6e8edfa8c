//! Statement grammar:
//!
//! ```text
//! stmt := assign_stmt | bounded_for | object_for
//!
//! assign_stmt := lvalue '=' expr
//! lvalue      := ident ('[' ident (',' ident)* ']')?
//!
//! bounded_for := 'for' ident '=' expr 'to' expr ':' stmt* 'end'
//! object_for  := 'for' 'each' ident 'is' ('atom' | 'bond')
//!                 ['(' expr '-' expr ')']
//!                 ['such' 'that' constraint]
//!                 ':' stmt* 'end'
//! ```

use crate::ast::{LValue, Stmt, StmtKind};
use crate::error::CompileError;
use crate::token::TokenKind;
use crate::types::ObjectKind;

use super::{ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        if self.check(&TokenKind::For) {
            return self.parse_for();
        }
        self.parse_assign()
    }

    fn parse_block_until_end(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::End) {
            if self.is_at_end() {
                return Err(CompileError::syntax(self.peek().pos, "unexpected end of input inside a 'for' block, expected 'end'"));
            }
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::End, "to close a 'for' block")?;
        Ok(body)
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.peek().pos;
        self.expect(TokenKind::For, "at the start of a loop")?;

        if self.matches(&TokenKind::Each) {
            let (bound, bound_pos) = self.expect_ident("as the bound object name")?;
            self.expect(TokenKind::Is, "after the bound object name")?;
            let object_kind = self.parse_object_kind()?;

            let decomposition = if self.matches(&TokenKind::LParen) {
                let (idx1, idx1_pos) = self.expect_ident("as a bond decomposition's first endpoint")?;
                self.expect(TokenKind::Minus, "between a bond decomposition's two endpoints")?;
                let (idx2, idx2_pos) = self.expect_ident("as a bond decomposition's second endpoint")?;
                self.expect(TokenKind::RParen, "to close a bond decomposition")?;
                Some((idx1, idx1_pos, idx2, idx2_pos))
            } else {
                None
            };

            let constraint = if self.matches(&TokenKind::Such) {
                self.expect(TokenKind::That, "after 'such'")?;
                Some(self.parse_constraint()?)
            } else {
                None
            };

            self.expect(TokenKind::Colon, "before a loop body")?;
            let body = self.parse_block_until_end()?;

            Ok(Stmt::new(
                self.header(start),
                StmtKind::ObjectFor { bound, bound_pos, object_kind, decomposition, constraint, body },
            ))
        } else {
            let (bound, bound_pos) = self.expect_ident("as the loop counter name")?;
            self.expect(TokenKind::Assign, "after the loop counter name")?;
            let from = self.parse_expr()?;
            self.expect(TokenKind::To, "between a bounded loop's endpoints")?;
            let to = self.parse_expr()?;
            self.expect(TokenKind::Colon, "before a loop body")?;
            let body = self.parse_block_until_end()?;

            Ok(Stmt::new(
                self.header(start),
                StmtKind::BoundedFor { bound, bound_pos, from: Box::new(from), to: Box::new(to), body },
            ))
        }
    }

    fn parse_object_kind(&mut self) -> ParseResult<ObjectKind> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Atom => {
                self.advance();
                Ok(ObjectKind::Atom)
            }
            TokenKind::Bond => {
                self.advance();
                Ok(ObjectKind::Bond)
            }
            other => Err(CompileError::syntax(tok.pos, format!("expected 'atom' or 'bond', found {other:?}"))),
        }
    }

    fn parse_assign(&mut self) -> ParseResult<Stmt> {
        let (name, name_pos) = self.expect_ident("as an assignment target")?;
        let target = if self.matches(&TokenKind::LBracket) {
            let mut indices = Vec::new();
            loop {
                let (idx, idx_pos) = self.expect_ident("as a subscript index")?;
                indices.push((idx, idx_pos));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBracket, "to close an assignment target's subscript")?;
            LValue::Subscript { name, name_pos, indices }
        } else {
            LValue::Name(name, name_pos)
        };

        self.expect(TokenKind::Assign, "between an assignment target and its value")?;
        let value = self.parse_expr()?;

        Ok(Stmt::new(self.header(name_pos), StmtKind::Assign { target, value: Box::new(value) }))
    }
}

#[cfg(test)]
mod tests {
    use crate::intern::Interner;

    use super::*;

    fn parse_stmt(source: &str) -> (Stmt, Interner) {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new(source, &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        let stmt = parser.parse_stmt().unwrap();
        drop(parser);
        (stmt, interner)
    }

    #[test]
    fn plain_assignment_parses_a_bare_name_target() {
        let (stmt, interner) = parse_stmt("k = 1\n");
        match stmt.kind {
            StmtKind::Assign { target: LValue::Name(name, _), .. } => assert_eq!(interner.resolve(name), "k"),
            other => panic!("expected a plain Assign, got {other:?}"),
        }
    }

    #[test]
    fn subscripted_assignment_parses_its_index_list() {
        let (stmt, _) = parse_stmt("chi[i, j] = 1\n");
        match stmt.kind {
            StmtKind::Assign { target: LValue::Subscript { indices, .. }, .. } => assert_eq!(indices.len(), 2),
            other => panic!("expected a subscripted Assign, got {other:?}"),
        }
    }

    #[test]
    fn bounded_for_parses_its_endpoints_and_body() {
        let (stmt, _) = parse_stmt("for k = 1 to 5:\n  x = k\nend\n");
        match stmt.kind {
            StmtKind::BoundedFor { body, .. } => assert_eq!(body.len(), 1),
            other => panic!("expected a BoundedFor, got {other:?}"),
        }
    }

    #[test]
    fn object_for_with_decomposition_and_constraint_parses_both() {
        let (stmt, _) = parse_stmt("for each b is bond (i-j) such that bonded(i, j):\nend\n");
        match stmt.kind {
            StmtKind::ObjectFor { object_kind, decomposition, constraint, .. } => {
                assert_eq!(object_kind, ObjectKind::Bond);
                assert!(decomposition.is_some());
                assert!(constraint.is_some());
            }
            other => panic!("expected an ObjectFor, got {other:?}"),
        }
    }

    #[test]
    fn object_for_without_decomposition_or_constraint_parses_with_none() {
        let (stmt, _) = parse_stmt("for each a is atom:\nend\n");
        match stmt.kind {
            StmtKind::ObjectFor { object_kind, decomposition, constraint, .. } => {
                assert_eq!(object_kind, ObjectKind::Atom);
                assert!(decomposition.is_none());
                assert!(constraint.is_none());
            }
            other => panic!("expected an ObjectFor, got {other:?}"),
        }
    }

    #[test]
    fn a_for_block_missing_its_end_keyword_is_a_syntax_error() {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new("for each a is atom:\n  x = 1\n", &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        assert!(parser.parse_stmt().is_err());
    }
}
