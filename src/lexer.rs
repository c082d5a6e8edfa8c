//! Converts source text into a flat token stream.
//!
//! Structurally this follows the same split-then-classify shape as the
//! teacher's word lexer: scan the source once character by character,
//! accumulate identifier/number runs, and classify each completed word
//! against the keyword table before falling back to `Ident`. This DSL has no
//! layout sensitivity, so there is no separate line-lexing stage.

use crate::error::CompileError;
use crate::intern::Interner;
use crate::token::{NumberLit, Pos, Token, TokenKind};

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    interner: &'a mut Interner,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, interner: &'a mut Interner) -> Self {
        Self { chars: source.chars().collect(), pos: 0, line: 1, column: 0, interner }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let start = self.current_pos();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, start));
                break;
            };

            let kind = if c.is_ascii_digit() {
                self.lex_number()
            } else if c == '"' {
                self.lex_string(start)?
            } else if is_ident_start(c) {
                self.lex_word()
            } else {
                self.lex_punct(start)?
            };

            tokens.push(Token::new(kind, start));
        }
        Ok(tokens)
    }

    fn current_pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        if let Ok(i) = text.parse::<i64>() {
            TokenKind::Number(NumberLit::Int(i))
        } else {
            let f = text.parse::<f64>().expect("digit run is always a valid float");
            TokenKind::Number(NumberLit::Float(f))
        }
    }

    fn lex_string(&mut self, start: Pos) -> Result<TokenKind, CompileError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some(c) => text.push(c),
                None => {
                    return Err(CompileError::syntax(start, "unterminated string literal".to_string()));
                }
            }
        }
        Ok(TokenKind::Str(self.interner.intern(&text)))
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while self.peek().is_some_and(is_ident_continue) {
            word.push(self.advance().unwrap());
        }
        // Multi-word property names ("covalent radius", "atomic number") are
        // assembled by the parser from consecutive Ident tokens, not here:
        // the lexer has no lookahead into the keyword catalog's word counts.
        match word.as_str() {
            "name" => TokenKind::Name,
            "parameter" => TokenKind::Parameter,
            "is" => TokenKind::Is,
            "atom" => TokenKind::Atom,
            "bond" => TokenKind::Bond,
            "such" => TokenKind::Such,
            "that" => TokenKind::That,
            "of" => TokenKind::Of,
            "if" => TokenKind::If,
            "for" => TokenKind::For,
            "each" => TokenKind::Each,
            "to" => TokenKind::To,
            "sum" => TokenKind::Sum,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "end" => TokenKind::End,
            "within" => TokenKind::Within,
            _ => TokenKind::Ident(self.interner.intern(&word)),
        }
    }

    fn lex_punct(&mut self, start: Pos) -> Result<TokenKind, CompileError> {
        let c = self.advance().unwrap();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Equal
                } else {
                    TokenKind::Assign
                }
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::NotEqual
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            other => {
                return Err(CompileError::syntax(start, format!("unexpected character '{other}'")));
            }
        };
        Ok(kind)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        Lexer::new(source, &mut interner).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_parameter_declaration() {
        let mut interner = Interner::new();
        let kinds: Vec<TokenKind> =
            Lexer::new("parameter k is common", &mut interner).tokenize().unwrap().into_iter().map(|t| t.kind).collect();
        match &kinds[1] {
            TokenKind::Ident(sym) => assert_eq!(interner.resolve(*sym), "k"),
            other => panic!("expected Ident, got {other:?}"),
        }
        assert_eq!(kinds[0], TokenKind::Parameter);
        assert_eq!(kinds[2], TokenKind::Is);
    }

    #[test]
    fn lexes_int_and_float_numbers() {
        let kinds = lex("3 3.5");
        assert_eq!(
            kinds,
            vec![TokenKind::Number(NumberLit::Int(3)), TokenKind::Number(NumberLit::Float(3.5)), TokenKind::Eof]
        );
    }

    #[test]
    fn skips_line_comments() {
        let kinds = lex("# a comment\nname foo");
        assert!(matches!(kinds[0], TokenKind::Name));
    }

    #[test]
    fn lexes_comparison_operators() {
        let kinds = lex("<= >= == !=");
        assert_eq!(
            kinds,
            vec![TokenKind::LessEqual, TokenKind::GreaterEqual, TokenKind::Equal, TokenKind::NotEqual, TokenKind::Eof]
        );
    }

    #[test]
    fn rejects_unterminated_string() {
        let mut interner = Interner::new();
        let err = Lexer::new("\"abc", &mut interner).tokenize().unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
