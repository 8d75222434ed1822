use crate::token_type::TokenType;

/// Constant payload carried by a token and by literal expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    IdentifierLiteral(String),
    StringLiteral(String),
    BoolLiteral(bool),
    F64(f64),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub typ: TokenType,
    pub lexeme: String,
    pub literal: Literal,
    pub line: usize,
}

impl Token {
    pub fn new(typ: TokenType, lexeme: impl Into<String>, literal: Literal, line: usize) -> Self {
        Token {
            typ,
            lexeme: lexeme.into(),
            literal,
            line,
        }
    }

    /// Synthesized end-of-input marker.
    pub fn eof(line: usize) -> Self {
        Token::new(TokenType::Eof, "", Literal::None, line)
    }
}
