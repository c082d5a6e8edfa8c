//! Annotation grammar:
//!
//! ```text
//! annotation := parameter_decl | object_decl | property_decl | substitution
//!
//! parameter_decl := 'parameter' ident 'is' ('atom' | 'bond' | 'common')
//! object_decl     := ident 'is' ('atom' | 'bond')
//!                      ['(' expr '-' expr ')']
//!                      ['such' 'that' constraint]
//! property_decl   := ident 'is' property-words ['of' ident]
//! substitution    := ident '=' expr ['if' constraint]
//! ```
//!
//! `object_decl` and `property_decl` both start `ident 'is'`; which one a
//! given annotation is is decided by whether the token right after `is` is
//! the `atom`/`bond` keyword or an ordinary identifier.

use crate::ast::{Annotation, AnnotationKind};
use crate::catalog::{is_known_property, MAX_PROPERTY_WORDS};
use crate::error::CompileError;
use crate::token::TokenKind;
use crate::types::ParameterKind;

use super::{ParseResult, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_annotation(&mut self) -> ParseResult<Annotation> {
        if self.check(&TokenKind::Parameter) {
            return self.parse_parameter_decl();
        }

        let (name, name_pos) = self.expect_ident("at the start of an annotation")?;

        if self.matches(&TokenKind::Is) {
            if matches!(self.peek().kind, TokenKind::Atom | TokenKind::Bond) {
                self.parse_object_decl(name, name_pos)
            } else {
                self.parse_property_decl(name, name_pos)
            }
        } else {
            self.parse_substitution(name, name_pos)
        }
    }

    fn parse_parameter_decl(&mut self) -> ParseResult<Annotation> {
        let start = self.peek().pos;
        self.expect(TokenKind::Parameter, "at the start of a parameter declaration")?;
        let (name, name_pos) = self.expect_ident("as the parameter's name")?;
        self.expect(TokenKind::Is, "after a parameter's name")?;

        let kind = match &self.peek().kind {
            TokenKind::Atom => ParameterKind::AtomParameter,
            TokenKind::Bond => ParameterKind::BondParameter,
            TokenKind::Ident(sym) if self.interner_ref().resolve(*sym) == "common" => ParameterKind::CommonParameter,
            other => {
                return Err(CompileError::syntax(
                    self.peek().pos,
                    format!("expected 'atom', 'bond' or 'common', found {other:?}"),
                ));
            }
        };
        self.advance();

        Ok(Annotation::new(self.header(start), AnnotationKind::ParameterDecl { name, name_pos, kind }))
    }

    fn parse_object_decl(&mut self, name: crate::intern::Symbol, name_pos: crate::token::Pos) -> ParseResult<Annotation> {
        let object_kind = self.parse_object_kind_word()?;

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

        Ok(Annotation::new(
            self.header(name_pos),
            AnnotationKind::ObjectDecl { name, name_pos, object_kind, decomposition, constraint },
        ))
    }

    fn parse_object_kind_word(&mut self) -> ParseResult<crate::types::ObjectKind> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Atom => {
                self.advance();
                Ok(crate::types::ObjectKind::Atom)
            }
            TokenKind::Bond => {
                self.advance();
                Ok(crate::types::ObjectKind::Bond)
            }
            other => Err(CompileError::syntax(tok.pos, format!("expected 'atom' or 'bond', found {other:?}"))),
        }
    }

    fn parse_property_decl(&mut self, name: crate::intern::Symbol, name_pos: crate::token::Pos) -> ParseResult<Annotation> {
        let property = self.parse_property_words()?;

        let of_element = if self.matches(&TokenKind::Of) {
            Some(self.expect_ident("after 'of'")?)
        } else {
            None
        };

        Ok(Annotation::new(self.header(name_pos), AnnotationKind::PropertyDecl { name, name_pos, property, of_element }))
    }

    /// Greedily matches the longest run of identifier tokens (up to
    /// `MAX_PROPERTY_WORDS`) that spells a known catalog property name.
    fn parse_property_words(&mut self) -> ParseResult<String> {
        let mut words = Vec::new();
        for i in 0..MAX_PROPERTY_WORDS {
            match self.peek_at(i).map(|t| &t.kind) {
                Some(TokenKind::Ident(sym)) => words.push(self.interner_ref().resolve(*sym).to_string()),
                _ => break,
            }
        }

        for take in (1..=words.len()).rev() {
            let candidate = words[..take].join(" ");
            if is_known_property(&candidate) {
                for _ in 0..take {
                    self.advance();
                }
                return Ok(candidate);
            }
        }

        Err(CompileError::syntax(self.peek().pos, "expected a known atom or bond property name"))
    }

    fn parse_substitution(&mut self, name: crate::intern::Symbol, name_pos: crate::token::Pos) -> ParseResult<Annotation> {
        let indices = if self.matches(&TokenKind::LBracket) {
            let mut indices = Vec::new();
            loop {
                let (idx, idx_pos) = self.expect_ident("as a substitution index")?;
                indices.push((idx, idx_pos));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBracket, "to close a substitution's index list")?;
            indices
        } else {
            Vec::new()
        };

        self.expect(TokenKind::Assign, "after a substitution's left-hand name")?;
        let value = self.parse_expr()?;

        let guard = if self.matches(&TokenKind::If) {
            Some(self.parse_constraint()?)
        } else {
            None
        };

        Ok(Annotation::new(
            self.header(name_pos),
            AnnotationKind::Substitution { name, name_pos, indices, value: Box::new(value), guard },
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::intern::Interner;

    use super::*;

    fn parse_annotation(source: &str) -> (Annotation, Interner) {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new(source, &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        let ann = parser.parse_annotation().unwrap();
        drop(parser);
        (ann, interner)
    }

    #[test]
    fn parameter_decl_parses_its_kind() {
        let (ann, _) = parse_annotation("parameter A is common\n");
        assert!(matches!(ann.kind, AnnotationKind::ParameterDecl { kind: ParameterKind::CommonParameter, .. }));
    }

    #[test]
    fn object_decl_without_decomposition_or_constraint() {
        let (ann, _) = parse_annotation("i is atom\n");
        match ann.kind {
            AnnotationKind::ObjectDecl { object_kind, decomposition, constraint, .. } => {
                assert_eq!(object_kind, crate::types::ObjectKind::Atom);
                assert!(decomposition.is_none());
                assert!(constraint.is_none());
            }
            other => panic!("expected an ObjectDecl, got {other:?}"),
        }
    }

    #[test]
    fn object_decl_with_bond_decomposition() {
        let (ann, _) = parse_annotation("b is bond (i-j)\n");
        match ann.kind {
            AnnotationKind::ObjectDecl { object_kind, decomposition: Some(_), .. } => {
                assert_eq!(object_kind, crate::types::ObjectKind::Bond);
            }
            other => panic!("expected an ObjectDecl with a decomposition, got {other:?}"),
        }
    }

    #[test]
    fn property_decl_recognizes_a_multi_word_property() {
        let (ann, interner) = parse_annotation("x is covalent radius\n");
        match ann.kind {
            AnnotationKind::PropertyDecl { property, of_element, .. } => {
                assert_eq!(property, "covalent radius");
                assert!(of_element.is_none());
            }
            other => panic!("expected a PropertyDecl, got {other:?}"),
        }
        let _ = interner;
    }

    #[test]
    fn property_decl_parses_an_optional_of_clause() {
        let (ann, interner) = parse_annotation("x is electronegativity of H\n");
        match ann.kind {
            AnnotationKind::PropertyDecl { of_element: Some((sym, _)), .. } => {
                assert_eq!(interner.resolve(sym), "H");
            }
            other => panic!("expected a PropertyDecl with an 'of' clause, got {other:?}"),
        }
    }

    #[test]
    fn substitution_without_a_guard_parses_no_guard() {
        let (ann, _) = parse_annotation("chi[i] = A[i]\n");
        match ann.kind {
            AnnotationKind::Substitution { indices, guard, .. } => {
                assert_eq!(indices.len(), 1);
                assert!(guard.is_none());
            }
            other => panic!("expected a Substitution, got {other:?}"),
        }
    }

    #[test]
    fn substitution_with_a_guard_parses_the_constraint() {
        let (ann, _) = parse_annotation("chi[i] = A[i] if element(i, H)\n");
        match ann.kind {
            AnnotationKind::Substitution { guard: Some(_), .. } => {}
            other => panic!("expected a guarded Substitution, got {other:?}"),
        }
    }

    #[test]
    fn an_unknown_property_word_is_a_syntax_error() {
        let mut interner = Interner::new();
        let tokens = crate::lexer::Lexer::new("x is frobnication\n", &mut interner).tokenize().unwrap();
        let mut parser = Parser::new(tokens, &mut interner);
        assert!(parser.parse_annotation().is_err());
    }
}
