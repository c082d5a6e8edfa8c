//! Constraint grammar:
//!
//! ```text
//! constraint := or_constraint
//! or_constraint  := and_constraint ('or' and_constraint)*
//! and_constraint := unary_constraint ('and' unary_constraint)*
//! unary_constraint := 'not' unary_constraint | atom_constraint
//! atom_constraint := '(' constraint ')'
//!                  | ident '(' pred_arg (',' pred_arg)* ')'   -- predicate call
//!                  | expr rel_op expr                          -- relational
//! pred_arg := ident | number | string
//! rel_op   := '<' | '<=' | '>' | '>=' | '==' | '!='
//! ```

use crate::ast::{Constraint, ConstraintKind, LogicalOp, PredicateArg, RelOp};
use crate::error::CompileError;
use crate::token::TokenKind;

use super::{ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_constraint(&mut self) -> ParseResult<Constraint> {
        self.parse_or_constraint()
    }

    fn parse_or_constraint(&mut self) -> ParseResult<Constraint> {
        let mut left = self.parse_and_constraint()?;
        while self.check(&TokenKind::Or) {
            let pos = self.peek().pos;
            self.advance();
            let right = self.parse_and_constraint()?;
            left = Constraint::new(
                self.header(pos),
                ConstraintKind::BinaryLogical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right) },
            );
        }
        Ok(left)
    }

    fn parse_and_constraint(&mut self) -> ParseResult<Constraint> {
        let mut left = self.parse_unary_constraint()?;
        while self.check(&TokenKind::And) {
            let pos = self.peek().pos;
            self.advance();
            let right = self.parse_unary_constraint()?;
            left = Constraint::new(
                self.header(pos),
                ConstraintKind::BinaryLogical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right) },
            );
        }
        Ok(left)
    }

    fn parse_unary_constraint(&mut self) -> ParseResult<Constraint> {
        if self.check(&TokenKind::Not) {
            let pos = self.peek().pos;
            self.advance();
            let inner = self.parse_unary_constraint()?;
            return Ok(Constraint::new(self.header(pos), ConstraintKind::Not(Box::new(inner))));
        }
        self.parse_atom_constraint()
    }

    fn parse_atom_constraint(&mut self) -> ParseResult<Constraint> {
        if self.check(&TokenKind::LParen) {
            // Either a parenthesized constraint, or a parenthesized expression
            // on the left side of a relational operator. Try the constraint
            // reading first; if it doesn't close cleanly as a standalone
            // group it's ordinary parenthesized arithmetic handled below.
            let checkpoint = self.checkpoint();
            self.advance();
            if let Ok(inner) = self.parse_constraint() {
                if self.check(&TokenKind::RParen) {
                    self.advance();
                    return Ok(inner);
                }
            }
            self.restore(checkpoint);
        }

        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = *name;
            if matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::LParen)) {
                let pos = self.peek().pos;
                self.advance();
                return self.parse_predicate_call(pos, name);
            }
        }

        self.parse_rel_constraint()
    }

    fn parse_predicate_call(&mut self, start: crate::token::Pos, name: crate::intern::Symbol) -> ParseResult<Constraint> {
        self.expect(TokenKind::LParen, "to open a predicate call's arguments")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_predicate_arg()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "to close a predicate call")?;
        Ok(Constraint::new(self.header(start), ConstraintKind::Predicate { name, name_pos: start, args }))
    }

    fn parse_predicate_arg(&mut self) -> ParseResult<PredicateArg> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(sym) => {
                self.advance();
                Ok(PredicateArg::Name(sym, tok.pos))
            }
            TokenKind::Number(n) => {
                self.advance();
                let lit = match n {
                    crate::token::NumberLit::Int(i) => crate::ast::NumberLit::Int(i),
                    crate::token::NumberLit::Float(f) => crate::ast::NumberLit::Float(f),
                };
                Ok(PredicateArg::Number(lit, tok.pos))
            }
            TokenKind::Str(sym) => {
                self.advance();
                Ok(PredicateArg::Str(self.interner_ref().resolve(sym).to_string(), tok.pos))
            }
            other => Err(CompileError::syntax(tok.pos, format!("expected a predicate argument, found {other:?}"))),
        }
    }

    fn parse_rel_constraint(&mut self) -> ParseResult<Constraint> {
        let left = self.parse_expr()?;
        let pos = self.peek().pos;
        let op = match &self.peek().kind {
            TokenKind::Less => RelOp::Lt,
            TokenKind::LessEqual => RelOp::Le,
            TokenKind::Greater => RelOp::Gt,
            TokenKind::GreaterEqual => RelOp::Ge,
            TokenKind::Equal => RelOp::Eq,
            TokenKind::NotEqual => RelOp::Neq,
            other => {
                return Err(CompileError::syntax(pos, format!("expected a relational operator, found {other:?}")));
            }
        };
        self.advance();
        let right = self.parse_expr()?;
        Ok(Constraint::new(self.header(pos), ConstraintKind::RelOp { op, left: Box::new(left), right: Box::new(right) }))
    }
}

#[cfg(test)]
mod tests {
    use crate::intern::Interner;

    use super::*;

    fn parse_constraint(source: &str) -> (Constraint, Interner) {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new(source, &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        let c = parser.parse_constraint().unwrap();
        drop(parser);
        (c, interner)
    }

    #[test]
    fn relational_constraint_parses_its_operator() {
        let (c, _) = parse_constraint("i < j");
        assert!(matches!(c.kind, ConstraintKind::RelOp { op: RelOp::Lt, .. }));
    }

    #[test]
    fn predicate_call_parses_its_argument_list() {
        let (c, interner) = parse_constraint("bonded(i, j)");
        match c.kind {
            ConstraintKind::Predicate { name, args, .. } => {
                assert_eq!(interner.resolve(name), "bonded");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected a Predicate, got {other:?}"),
        }
    }

    #[test]
    fn predicate_call_accepts_a_string_argument() {
        let (c, _) = parse_constraint("element(i, \"H\")");
        match c.kind {
            ConstraintKind::Predicate { args, .. } => {
                assert!(matches!(&args[1], PredicateArg::Str(s, _) if s.as_str() == "H"));
            }
            other => panic!("expected a Predicate, got {other:?}"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let (c, _) = parse_constraint("i < j or i < k and k < j");
        match c.kind {
            ConstraintKind::BinaryLogical { op: LogicalOp::Or, right, .. } => {
                assert!(matches!(right.kind, ConstraintKind::BinaryLogical { op: LogicalOp::And, .. }));
            }
            other => panic!("expected a top-level Or, got {other:?}"),
        }
    }

    #[test]
    fn not_applies_to_the_following_unary_constraint() {
        let (c, _) = parse_constraint("not bonded(i, j)");
        match c.kind {
            ConstraintKind::Not(inner) => assert!(matches!(inner.kind, ConstraintKind::Predicate { .. })),
            other => panic!("expected a Not, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_constraint_is_unwrapped() {
        let (c, _) = parse_constraint("(i < j)");
        assert!(matches!(c.kind, ConstraintKind::RelOp { .. }));
    }

    #[test]
    fn parenthesized_arithmetic_on_the_left_of_a_relop_is_not_mistaken_for_a_group() {
        let (c, _) = parse_constraint("(i + 1) < j");
        assert!(matches!(c.kind, ConstraintKind::RelOp { .. }));
    }
}
