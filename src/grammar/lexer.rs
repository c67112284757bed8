//! Tokenizer for engine output lines
//!
//! Never fails: anything it does not understand becomes `Other`, and an
//! unterminated string literal becomes a single `Broken` token covering the rest
//! of the line. The parser decides what is fatal.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// Numeric literal kept as source text; conversion happens in the parser
    Number(String),
    Str(String),
    Eq,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Other(char),
    Broken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source line
    pub start: usize,
}

/// Split one line into tokens, skipping whitespace
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        line,
        chars: line.char_indices().peekable(),
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        let broken = token.kind == TokenKind::Broken;
        tokens.push(token);
        if broken {
            break;
        }
    }
    tokens
}

struct Lexer<'a> {
    line: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn next_token(&mut self) -> Option<Token> {
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.chars.next();
        }

        let (start, c) = *self.chars.peek()?;
        let kind = match c {
            '=' => self.single(TokenKind::Eq),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '"' | '\'' => {
                self.chars.next();
                self.string(c)
            }
            c if c.is_ascii_digit() => self.number(start),
            '-' | '+' | '.' if self.starts_number(start) => self.number(start),
            c if c.is_alphabetic() || c == '_' => self.ident(start),
            other => self.single(TokenKind::Other(other)),
        };
        Some(Token { kind, start })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.chars.next();
        kind
    }

    /// Sign or leading dot followed by a digit
    fn starts_number(&self, start: usize) -> bool {
        let rest = &self.line[start..];
        let mut it = rest.chars();
        let first = it.next();
        let second = it.next();
        match (first, second) {
            (Some('-' | '+'), Some('.')) => it.next().is_some_and(|c| c.is_ascii_digit()),
            (Some(_), Some(c)) => c.is_ascii_digit(),
            _ => false,
        }
    }

    fn number(&mut self, start: usize) -> TokenKind {
        let mut end = start;
        let mut prev = '\0';
        while let Some(&(idx, c)) = self.chars.peek() {
            let accept = c.is_ascii_digit()
                || c == '.'
                || c == 'e'
                || c == 'E'
                || (idx == start && (c == '-' || c == '+'))
                || ((c == '-' || c == '+') && (prev == 'e' || prev == 'E'));
            if !accept {
                break;
            }
            prev = c;
            end = idx + c.len_utf8();
            self.chars.next();
        }
        TokenKind::Number(self.line[start..end].to_string())
    }

    fn ident(&mut self, start: usize) -> TokenKind {
        let mut end = start;
        while let Some(&(idx, c)) = self.chars.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            end = idx + c.len_utf8();
            self.chars.next();
        }
        TokenKind::Ident(self.line[start..end].to_string())
    }

    fn string(&mut self, quote: char) -> TokenKind {
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                c if c == quote => return TokenKind::Str(out),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, 'u')) => match self.unicode_escape() {
                        Some(ch) => out.push(ch),
                        None => return TokenKind::Broken,
                    },
                    Some((_, other)) => out.push(other),
                    None => return TokenKind::Broken,
                },
                other => out.push(other),
            }
        }
        TokenKind::Broken
    }

    /// `\u{XXXX}` as printed by the engine's debug formatting
    fn unicode_escape(&mut self) -> Option<char> {
        if self.chars.next()?.1 != '{' {
            return None;
        }
        let mut hex = String::new();
        loop {
            let (_, c) = self.chars.next()?;
            if c == '}' {
                break;
            }
            hex.push(c);
        }
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    }
}
