use lazy_static::lazy_static;
use std::collections::HashMap;
use std::iter::Peekable;
use std::mem;
use std::str::Chars;

use tracing::trace;

use crate::diagnostics::Diagnostics;
use crate::token::{Literal, Token};
use crate::token_type::TokenType::{self, *};

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenType> = HashMap::from([
        ("and", And),
        ("class", Class),
        ("else", Else),
        ("false", False),
        ("for", For),
        ("func", Func),
        ("if", If),
        ("nil", Nil),
        ("or", Or),
        ("print", Print),
        ("return", Return),
        ("super", Super),
        ("this", This),
        ("true", True),
        ("var", Var),
        ("while", While),
    ]);
}

pub struct Scanner<'a> {
    source: Peekable<Chars<'a>>,
    tokens: Vec<Token>,
    text: String,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source: source.chars().peekable(),
            tokens: Vec::new(),
            text: String::new(),
            line: 1,
        }
    }

    /// Scans the whole source. The returned list always ends with `Eof`.
    pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        while let Some(c) = self.source.next() {
            self.text.push(c);
            self.scan_token(c, diagnostics);
        }

        self.tokens.push(Token::eof(self.line));
        trace!(count = self.tokens.len(), lines = self.line, "scanned source");
        self.tokens
    }

    fn scan_token(&mut self, c: char, diagnostics: &mut Diagnostics) {
        match c {
            '(' => self.add_token(LeftParen),
            ')' => self.add_token(RightParen),
            '{' => self.add_token(LeftBrace),
            '}' => self.add_token(RightBrace),
            ',' => self.add_token(Comma),
            '.' => self.add_token(Dot),
            '-' => self.add_token(Minus),
            '+' => self.add_token(Plus),
            ';' => self.add_token(Semicolon),
            '*' => self.add_token(Star),
            '!' => {
                let matched = self.match_next('=');
                self.add_token(if matched { BangEqual } else { Bang })
            }
            '=' => {
                let matched = self.match_next('=');
                self.add_token(if matched { EqualEqual } else { Equal })
            }
            '<' => {
                let matched = self.match_next('=');
                self.add_token(if matched { LessEqual } else { Less })
            }
            '>' => {
                let matched = self.match_next('=');
                self.add_token(if matched { GreaterEqual } else { Greater })
            }
            '/' => {
                if self.match_next('/') {
                    while let Some(&char) = self.source.peek() {
                        if char == '\n' {
                            break;
                        }
                        self.source.next();
                    }
                    self.text.clear();
                } else {
                    self.add_token(Slash);
                }
            }
            ' ' | '\r' | '\t' => {
                self.text.pop();
            }
            '\n' => {
                self.line += 1;
                self.text.pop();
            }
            '"' => self.scan_string(diagnostics),
            _ => {
                if self.is_digit(c) {
                    self.scan_number();
                } else if self.is_alpha(c) {
                    self.scan_identifier();
                } else {
                    diagnostics.error(self.line, "Unexpected character.");
                    self.text.pop();
                }
            }
        };
    }

    fn scan_string(&mut self, diagnostics: &mut Diagnostics) {
        while let Some(&c) = self.source.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.text.push(c);
            self.source.next();
        }

        if self.source.peek().is_none() {
            diagnostics.error(self.line, "Unterminated string.");
            self.text.clear();
            return;
        }

        // closing "
        self.source.next();

        self.text.remove(0);
        self.add_token(StringToken);
    }

    fn is_digit(&self, c: char) -> bool {
        c.is_ascii_digit()
    }

    fn scan_number(&mut self) {
        self.advance_digits();

        // check for a fractional part
        if let Some(&c) = self.source.peek() {
            if c == '.' {
                // clone the source iterator so that we can peek 2 characters ahead
                let mut cloned = self.source.clone();
                cloned.next();
                if let Some(&next_c) = cloned.peek() {
                    if self.is_digit(next_c) {
                        self.text.push(c);
                        self.source.next();
                        self.advance_digits();
                    }
                }
            }
        }

        self.add_token(Number);
    }

    fn advance_digits(&mut self) {
        while let Some(&c) = self.source.peek() {
            if !self.is_digit(c) {
                break;
            }
            self.text.push(c);
            self.source.next();
        }
    }

    fn is_alpha(&self, c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_alpha_num(&self, c: char) -> bool {
        self.is_alpha(c) || self.is_digit(c)
    }

    fn scan_identifier(&mut self) {
        while let Some(&c) = self.source.peek() {
            if !self.is_alpha_num(c) {
                break;
            }
            self.text.push(c);
            self.source.next();
        }

        let typ = *KEYWORDS.get(&self.text as &str).unwrap_or(&Identifier);

        self.add_token(typ);
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.source.peek() != Some(&expected) {
            return false;
        }

        self.source.next();
        self.text.push(expected);
        true
    }

    fn add_token(&mut self, typ: TokenType) {
        let mut lexeme = String::new();
        mem::swap(&mut self.text, &mut lexeme);

        // parse literals
        let literal: Literal = match typ {
            Identifier => Literal::IdentifierLiteral(lexeme.clone()),
            StringToken => Literal::StringLiteral(lexeme.clone()),
            Number => lexeme.parse().map(Literal::F64).unwrap_or(Literal::None),
            _ => Literal::None,
        };

        self.tokens.push(Token {
            typ,
            lexeme,
            literal,
            line: self.line,
        });
    }
}
