//! # Lexer Module
//!
//! Tokenization stage for Kea. The lexer turns raw source text into a flat
//! token stream while tracking precise line/column information for every
//! token. Keywords are deliberately not special-cased here: `fun`, `let` and
//! friends come out as plain identifier tokens, and the parser matches their
//! lexemes. Lexical errors are pushed into the shared [`DiagnosticEngine`]
//! under the `Lexer` phase; the lexer always produces a (possibly truncated)
//! token stream so the driver can decide whether to continue.

mod token;

pub use token::*;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticEngine, Phase};

/// A position in some source file. Lines and columns are 1-based; the file
/// path is optional so synthetic locations (tests, internal nodes) stay cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub col: u32,
    pub file: Option<String>,
}

impl Location {
    pub fn new(line: u32, col: u32) -> Location {
        Location {
            line,
            col,
            file: None,
        }
    }

    pub fn in_file(line: u32, col: u32, file: impl ToString) -> Location {
        Location {
            line,
            col,
            file: Some(file.to_string()),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}:{}:{}", self.line, self.col)
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

pub struct Lexer<'a> {
    source: &'a [u8],
    file: Option<String>,
    position: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: Option<String>) -> Self {
        Self {
            source: source.as_bytes(),
            file,
            position: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self, diagnostics: &mut DiagnosticEngine) -> Vec<Token> {
        let mut tokens = vec![];

        loop {
            let token = self.next_token(diagnostics);
            let at_end = token.kind == TokenKind::Eof;
            tokens.push(token);
            if at_end {
                break;
            }
        }

        tokens
    }

    fn loc(&self) -> Location {
        Location {
            line: self.line,
            col: self.col,
            file: self.file.clone(),
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }

    fn peek(&self) -> u8 {
        self.peek_nth(0)
    }

    fn peek_nth(&self, nth: usize) -> u8 {
        self.source.get(self.position + nth).copied().unwrap_or(0)
    }

    fn bump(&mut self) {
        if self.is_eof() {
            return;
        }
        if self.source[self.position] == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.position += 1;
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn eat_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_ascii_whitespace() {
            self.bump();
        }
    }

    fn eat_line_comment(&mut self) {
        while !self.is_eof() && self.peek() != b'\n' {
            self.bump();
        }
    }

    fn eat_block_comment(&mut self, diagnostics: &mut DiagnosticEngine) {
        loop {
            if self.is_eof() {
                diagnostics.error(Phase::Lexer, self.loc(), "Unterminated block comment");
                return;
            }
            if self.peek() == b'*' && self.peek_nth(1) == b'/' {
                self.bump_n(2);
                return;
            }
            self.bump();
        }
    }

    fn next_token(&mut self, diagnostics: &mut DiagnosticEngine) -> Token {
        loop {
            self.eat_whitespace();

            if self.is_eof() {
                return Token::new(TokenKind::Eof, self.loc());
            }

            let loc = self.loc();
            let c = self.peek();

            let single = |kind| Token::new(kind, loc.clone());

            match c {
                b'(' => {
                    self.bump();
                    return single(TokenKind::LParen);
                }
                b')' => {
                    self.bump();
                    return single(TokenKind::RParen);
                }
                b'{' => {
                    self.bump();
                    return single(TokenKind::LBrace);
                }
                b'}' => {
                    self.bump();
                    return single(TokenKind::RBrace);
                }
                b'[' => {
                    self.bump();
                    return single(TokenKind::LBracket);
                }
                b']' => {
                    self.bump();
                    return single(TokenKind::RBracket);
                }
                b',' => {
                    self.bump();
                    return single(TokenKind::Comma);
                }
                b'.' => {
                    self.bump();
                    return single(TokenKind::Dot);
                }
                b':' => {
                    self.bump();
                    return single(TokenKind::Colon);
                }
                b';' => {
                    self.bump();
                    return single(TokenKind::Semicolon);
                }
                b'+' => {
                    self.bump();
                    return single(TokenKind::Plus);
                }
                b'*' => {
                    self.bump();
                    return single(TokenKind::Star);
                }
                b'%' => {
                    self.bump();
                    return single(TokenKind::Percent);
                }
                b'/' => {
                    if self.peek_nth(1) == b'/' {
                        self.eat_line_comment();
                        continue;
                    }
                    if self.peek_nth(1) == b'*' {
                        self.bump_n(2);
                        self.eat_block_comment(diagnostics);
                        continue;
                    }
                    self.bump();
                    return single(TokenKind::Slash);
                }
                b'-' => {
                    if self.peek_nth(1) == b'>' {
                        self.bump_n(2);
                        return single(TokenKind::ThinArrow);
                    }
                    self.bump();
                    return single(TokenKind::Minus);
                }
                b'=' => {
                    if self.peek_nth(1) == b'=' {
                        self.bump_n(2);
                        return single(TokenKind::EqualEqual);
                    }
                    self.bump();
                    return single(TokenKind::Equal);
                }
                b'!' => {
                    if self.peek_nth(1) == b'=' {
                        self.bump_n(2);
                        return single(TokenKind::NotEqual);
                    }
                    self.bump();
                    return single(TokenKind::Bang);
                }
                b'<' => {
                    if self.peek_nth(1) == b'=' {
                        self.bump_n(2);
                        return single(TokenKind::LessEqual);
                    }
                    self.bump();
                    return single(TokenKind::Less);
                }
                b'>' => {
                    if self.peek_nth(1) == b'=' {
                        self.bump_n(2);
                        return single(TokenKind::GreaterEqual);
                    }
                    self.bump();
                    return single(TokenKind::Greater);
                }
                b'&' => {
                    if self.peek_nth(1) == b'&' {
                        self.bump_n(2);
                        return single(TokenKind::AmpAmp);
                    }
                    diagnostics.error(Phase::Lexer, loc, "Unexpected character '&'");
                    self.bump();
                    continue;
                }
                b'|' => {
                    if self.peek_nth(1) == b'|' {
                        self.bump_n(2);
                        return single(TokenKind::PipePipe);
                    }
                    diagnostics.error(Phase::Lexer, loc, "Unexpected character '|'");
                    self.bump();
                    continue;
                }
                b'"' => return self.lex_string(diagnostics),
                c if c.is_ascii_alphabetic() || c == b'_' => return self.lex_identifier(),
                c if c.is_ascii_digit() => return self.lex_number(),
                c => {
                    diagnostics.error(
                        Phase::Lexer,
                        loc,
                        format!("Unexpected character '{}'", c as char),
                    );
                    self.bump();
                    continue;
                }
            }
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let loc = self.loc();
        let start = self.position;
        while !self.is_eof() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            self.bump();
        }
        let lexeme = std::str::from_utf8(&self.source[start..self.position])
            .expect("identifier bytes are ascii")
            .to_string();
        Token::with_lexeme(TokenKind::Ident, lexeme, loc)
    }

    fn lex_number(&mut self) -> Token {
        let loc = self.loc();
        let start = self.position;
        let mut is_float = false;

        while !self.is_eof() && self.peek().is_ascii_digit() {
            self.bump();
        }

        if self.peek() == b'.' && self.peek_nth(1).is_ascii_digit() {
            is_float = true;
            self.bump();
            while !self.is_eof() && self.peek().is_ascii_digit() {
                self.bump();
            }
        }

        let lexeme = std::str::from_utf8(&self.source[start..self.position])
            .expect("number bytes are ascii")
            .to_string();
        Token::with_lexeme(
            if is_float {
                TokenKind::Float
            } else {
                TokenKind::Int
            },
            lexeme,
            loc,
        )
    }

    fn lex_string(&mut self, diagnostics: &mut DiagnosticEngine) -> Token {
        let loc = self.loc();
        self.bump();
        let start = self.position;

        loop {
            if self.is_eof() {
                diagnostics.error(
                    Phase::Lexer,
                    loc.clone(),
                    "Unterminated string (unexpected end of file)",
                );
                return Token::new(TokenKind::Eof, self.loc());
            }
            match self.peek() {
                b'"' => break,
                b'\n' => {
                    diagnostics.error(
                        Phase::Lexer,
                        loc.clone(),
                        "Unterminated string (newline in string)",
                    );
                    return Token::new(TokenKind::Eof, self.loc());
                }
                b'\\' => {
                    let escaped = self.peek_nth(1);
                    if matches!(escaped, b'n' | b't' | b'"' | b'\\') {
                        self.bump_n(2);
                    } else {
                        diagnostics.error(
                            Phase::Lexer,
                            self.loc(),
                            format!("Invalid escape sequence: \\{}", escaped as char),
                        );
                        self.bump_n(2);
                    }
                }
                _ => self.bump(),
            }
        }

        let raw = std::str::from_utf8(&self.source[start..self.position])
            .unwrap_or_default()
            .to_string();
        self.bump();

        let value = unescape::unescape(&raw).unwrap_or(raw);
        Token::with_lexeme(TokenKind::Str, value, loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> (Vec<Token>, DiagnosticEngine) {
        let mut diagnostics = DiagnosticEngine::default();
        let tokens = Lexer::new(input, None).tokenize(&mut diagnostics);
        (tokens, diagnostics)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_let_statement() {
        let (tokens, diagnostics) = lex("let foo = 42;");

        assert!(!diagnostics.has_errors());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].lexeme(), "let");
        assert_eq!(tokens[1].lexeme(), "foo");
        assert_eq!(tokens[3].lexeme(), "42");
    }

    #[test]
    fn test_lex_function_header() {
        let (tokens, diagnostics) = lex("fun main() -> int {}");

        assert!(!diagnostics.has_errors());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::ThinArrow,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_float_and_int() {
        let (tokens, _) = lex("3.14 3 . 14");

        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].lexeme(), "3.14");
        assert_eq!(tokens[1].kind, TokenKind::Int);
        assert_eq!(tokens[2].kind, TokenKind::Dot);
        assert_eq!(tokens[3].kind, TokenKind::Int);
    }

    #[test]
    fn test_lex_string_with_escapes() {
        let (tokens, diagnostics) = lex(r#""hello\nworld""#);

        assert!(!diagnostics.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme(), "hello\nworld");
    }

    #[test]
    fn test_lex_comments_are_skipped() {
        let (tokens, diagnostics) = lex("1 // comment\n/* block\ncomment */ 2");

        assert!(!diagnostics.has_errors());
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Int, TokenKind::Int, TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_two_char_operators() {
        let (tokens, _) = lex("== != <= >= -> && ||");

        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::ThinArrow,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_unterminated_string() {
        let (_, diagnostics) = lex("\"oops");

        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_lex_location_tracking() {
        let (tokens, _) = lex("a\n  b");

        assert_eq!(tokens[0].loc, Location::new(1, 1));
        assert_eq!(tokens[1].loc, Location::new(2, 3));
    }

    #[test]
    fn test_lex_unexpected_character() {
        let (tokens, diagnostics) = lex("a @ b");

        assert!(diagnostics.has_errors());
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }
}
