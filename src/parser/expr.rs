//! Expression grammar:
//!
//! ```text
//! expr       := additive
//! additive   := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/') unary)*
//! unary      := '-' unary | power
//! power      := primary ('^' unary)?            -- right-associative
//! primary    := number
//!             | '{' '}'                          -- regression placeholder
//!             | 'sum' ident ':' expr
//!             | ident '[' ee-body ']'            -- EE literal, name == "EE"
//!             | ident '[' ident (',' ident)* ']'  -- subscript / catalog property
//!             | ident '(' expr ')'                -- math function call
//!             | ident                             -- bare name
//!             | '(' expr ')'
//! ```

use crate::ast::{BinOp, CutoffMode, Expr, ExprKind};
use crate::error::CompileError;
use crate::intern::SymbolEq;
use crate::token::{NumberLit as TokNum, TokenKind};

use super::{ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let pos = self.peek().pos;
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::new(self.header(pos), ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let pos = self.peek().pos;
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::new(self.header(pos), ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.check(&TokenKind::Minus) {
            let pos = self.peek().pos;
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(self.header(pos), ExprKind::UnaryMinus(Box::new(operand))));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if self.check(&TokenKind::Caret) {
            let pos = self.peek().pos;
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expr::new(
                self.header(pos),
                ExprKind::BinaryOp { op: BinOp::Pow, left: Box::new(base), right: Box::new(exponent) },
            ));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(n) => {
                self.advance();
                let lit = match n {
                    TokNum::Int(i) => crate::ast::NumberLit::Int(i),
                    TokNum::Float(f) => crate::ast::NumberLit::Float(f),
                };
                Ok(Expr::new(self.header(tok.pos), ExprKind::Number(lit)))
            }
            TokenKind::LBrace => {
                self.advance();
                self.expect(TokenKind::RBrace, "to close a regression placeholder '{}'")?;
                Ok(Expr::new(self.header(tok.pos), ExprKind::RegressionPlaceholder))
            }
            TokenKind::Sum => {
                self.advance();
                let (bound, bound_pos) = self.expect_ident("as the sum's bound name")?;
                self.expect(TokenKind::Colon, "after the sum's bound name")?;
                let body = self.parse_expr()?;
                Ok(Expr::new(self.header(tok.pos), ExprKind::Sum { bound, bound_pos, body: Box::new(body) }))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "to close a parenthesized expression")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.interner_is(name, "EE") && self.check(&TokenKind::LBracket) {
                    self.parse_ee(tok.pos, name)
                } else if self.check(&TokenKind::LBracket) {
                    self.parse_subscript(tok.pos, name)
                } else if self.check(&TokenKind::LParen) {
                    self.parse_function_call(tok.pos, name)
                } else {
                    Ok(Expr::new(self.header(tok.pos), ExprKind::Name(name)))
                }
            }
            other => Err(CompileError::syntax(tok.pos, format!("expected an expression, found {other:?}"))),
        }
    }

    fn interner_is(&self, sym: crate::intern::Symbol, s: &str) -> bool {
        sym.is(self.interner_ref(), s)
    }

    fn parse_subscript(&mut self, start: crate::token::Pos, name: crate::intern::Symbol) -> ParseResult<Expr> {
        self.expect(TokenKind::LBracket, "to open a subscript")?;
        let mut indices = Vec::new();
        loop {
            let (idx, idx_pos) = self.expect_ident("as a subscript index")?;
            indices.push((idx, idx_pos));
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "to close a subscript")?;
        Ok(Expr::new(self.header(start), ExprKind::Subscript { name, name_pos: start, indices }))
    }

    fn parse_function_call(&mut self, start: crate::token::Pos, name: crate::intern::Symbol) -> ParseResult<Expr> {
        self.expect(TokenKind::LParen, "to open a function call's argument")?;
        let arg = self.parse_expr()?;
        self.expect(TokenKind::RParen, "to close a function call")?;
        Ok(Expr::new(self.header(start), ExprKind::Function { name, name_pos: start, arg: Box::new(arg) }))
    }

    /// `EE[ row <ident>, col <ident> : diag <expr>, off <expr>, rhs <expr> [within <expr>] ]`
    fn parse_ee(&mut self, start: crate::token::Pos, _name: crate::intern::Symbol) -> ParseResult<Expr> {
        self.expect(TokenKind::LBracket, "to open an EE literal")?;

        self.expect_word("row")?;
        let (row, row_pos) = self.expect_ident("as EE's row bound name")?;
        self.expect(TokenKind::Comma, "between EE's row and col bounds")?;
        self.expect_word("col")?;
        let (col, col_pos) = self.expect_ident("as EE's col bound name")?;
        self.expect(TokenKind::Colon, "before EE's diag/off/rhs clauses")?;

        self.expect_word("diag")?;
        let diag = self.parse_expr()?;
        self.expect(TokenKind::Comma, "between EE's diag and off clauses")?;

        self.expect_word("off")?;
        let off = self.parse_expr()?;
        self.expect(TokenKind::Comma, "between EE's off and rhs clauses")?;

        self.expect_word("rhs")?;
        let rhs = self.parse_expr()?;

        let cutoff = if self.matches(&TokenKind::Within) {
            let radius = self.parse_expr()?;
            Some(CutoffMode { radius: Box::new(radius) })
        } else {
            None
        };

        self.expect(TokenKind::RBracket, "to close an EE literal")?;

        Ok(Expr::new(
            self.header(start),
            ExprKind::EE {
                row,
                row_pos,
                col,
                col_pos,
                diag: Box::new(diag),
                off: Box::new(off),
                rhs: Box::new(rhs),
                cutoff,
            },
        ))
    }

    /// Matches a bare identifier token whose text is the given reserved
    /// word (`row`, `col`, `diag`, `off`, `rhs`) inside an EE literal; these
    /// are not keywords anywhere else in the grammar.
    fn expect_word(&mut self, word: &str) -> ParseResult<()> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(sym) if self.interner_is(sym, word) => {
                self.advance();
                Ok(())
            }
            other => Err(CompileError::syntax(tok.pos, format!("expected '{word}' inside an EE literal, found {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::intern::Interner;

    use super::*;

    fn parse_expr(source: &str) -> (Expr, Interner) {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new(source, &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        let expr = parser.parse_expr().unwrap();
        drop(parser);
        (expr, interner)
    }

    #[test]
    fn addition_and_multiplication_respect_precedence() {
        let (expr, _) = parse_expr("1 + 2 * 3");
        match expr.kind {
            ExprKind::BinaryOp { op: BinOp::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("expected a top-level Add, got {other:?}"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        // 2 ^ 3 ^ 2 == 2 ^ (3 ^ 2), not (2 ^ 3) ^ 2.
        let (expr, _) = parse_expr("2 ^ 3 ^ 2");
        match expr.kind {
            ExprKind::BinaryOp { op: BinOp::Pow, left, right } => {
                assert!(matches!(left.kind, ExprKind::Number(crate::ast::NumberLit::Int(2))));
                assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinOp::Pow, .. }));
            }
            other => panic!("expected a top-level Pow, got {other:?}"),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_power_is_rejected_left_of_power() {
        // `-x` parses, and `^` still sees the whole unary as its base.
        let (expr, _) = parse_expr("-2 ^ 2");
        assert!(matches!(expr.kind, ExprKind::UnaryMinus(_)));
    }

    #[test]
    fn subscript_parses_a_bracketed_index_list() {
        let (expr, interner) = parse_expr("distance[i, j]");
        match expr.kind {
            ExprKind::Subscript { name, indices, .. } => {
                assert_eq!(interner.resolve(name), "distance");
                assert_eq!(indices.len(), 2);
            }
            other => panic!("expected a Subscript, got {other:?}"),
        }
    }

    #[test]
    fn function_call_parses_a_single_parenthesized_argument() {
        let (expr, interner) = parse_expr("sqrt(x)");
        match expr.kind {
            ExprKind::Function { name, .. } => assert_eq!(interner.resolve(name), "sqrt"),
            other => panic!("expected a Function, got {other:?}"),
        }
    }

    #[test]
    fn regression_placeholder_parses_as_its_own_node() {
        let (expr, _) = parse_expr("{}");
        assert!(matches!(expr.kind, ExprKind::RegressionPlaceholder));
    }

    #[test]
    fn sum_parses_its_bound_name_and_body() {
        let (expr, interner) = parse_expr("sum i: i + 1");
        match expr.kind {
            ExprKind::Sum { bound, .. } => assert_eq!(interner.resolve(bound), "i"),
            other => panic!("expected a Sum, got {other:?}"),
        }
    }

    #[test]
    fn ee_literal_parses_all_three_clauses_and_no_cutoff_by_default() {
        let (expr, interner) = parse_expr("EE[ row i, col j : diag A, off B, rhs C ]");
        match expr.kind {
            ExprKind::EE { row, col, cutoff, .. } => {
                assert_eq!(interner.resolve(row), "i");
                assert_eq!(interner.resolve(col), "j");
                assert!(cutoff.is_none());
            }
            other => panic!("expected an EE, got {other:?}"),
        }
    }

    #[test]
    fn ee_literal_parses_an_optional_within_clause() {
        let (expr, _) = parse_expr("EE[ row i, col j : diag A, off B, rhs C within 5 ]");
        match expr.kind {
            ExprKind::EE { cutoff, .. } => assert!(cutoff.is_some()),
            other => panic!("expected an EE, got {other:?}"),
        }
    }

    #[test]
    fn unclosed_parenthesis_is_a_syntax_error() {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new("(1 + 2", &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        assert!(parser.parse_expr().is_err());
    }
}
