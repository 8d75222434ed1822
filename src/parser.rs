use std::iter::Peekable;
use std::rc::Rc;
use std::slice::Iter;

use tracing::{debug, trace};

use crate::diagnostics::Diagnostics;
use crate::stack::ensure_sufficient_stack;
use crate::stmt::{self, Stmt};
use crate::token::Literal;
use crate::token_type::TokenType::{self, *};
use crate::utils::Soo;
use crate::{expr::Expr, token::Token};

/// Upper bound on parameters in a declaration and arguments in a call.
const MAX_ARGUMENTS: usize = 255;

// parameters: parser, and a series of TokenType variants separated by |
// return option of the consumed token
macro_rules! match_types {
    ($parser:expr, $( $variant:pat_param )|* ) => {
        match $parser.tokens.peek() {
            Some(token) => {
                match token.typ {
                    $(
                        $variant
                    )|* => $parser.advance(),
                    _ => None,
                }
            },
            None => None,
        }
    };
}

/// Signals that a syntax error was reported and the current declaration
/// must be abandoned.
#[derive(Debug)]
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Parses a whole program. Errors go to `diagnostics`.
pub fn parse(tokens: &[Token], diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    Parser::new(tokens, diagnostics).parse_program()
}

/// Parses a single expression, yielding nothing on the first error.
pub fn parse_expression(tokens: &[Token], diagnostics: &mut Diagnostics) -> Option<Expr> {
    Parser::new(tokens, diagnostics).parse_expression()
}

/// Recursive-descent parser over one token sequence.
///
/// Both entry points consume the parser, so every input gets a fresh one.
pub struct Parser<'a> {
    tokens: Peekable<Iter<'a, Token>>,
    previous: Option<&'a Token>,
    line_count: usize,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], diagnostics: &'a mut Diagnostics) -> Self {
        let line_count = match tokens.last() {
            Some(token) => token.line,
            None => 0,
        };

        Parser {
            tokens: tokens.iter().peekable(),
            previous: None,
            line_count,
            diagnostics,
        }
    }

    pub fn parse_program(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        trace!(
            statements = statements.len(),
            errors = self.diagnostics.len(),
            "parsed program"
        );
        statements
    }

    pub fn parse_expression(mut self) -> Option<Expr> {
        self.expression().ok()
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if match_types!(self, Class).is_some() {
            self.class_declaration()
        } else if match_types!(self, Func).is_some() {
            self.function("function").map(Stmt::Function)
        } else if match_types!(self, Var).is_some() {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Identifier, "Expect class name.")?.clone();
        self.consume(LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(RightBrace, "Expect '}' after class body.")?;
        Ok(Stmt::Class { name, methods })
    }

    fn function(&mut self, kind: &str) -> ParseResult<Rc<stmt::Function>> {
        let name = self
            .consume(Identifier, format!("Expect {kind} name."))?
            .clone();
        self.consume(LeftParen, format!("Expect '(' after {kind} name."))?;

        let mut params = Vec::new();
        if !self.check(RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.report("Can't have more than 255 parameters.");
                }
                params.push(self.consume(Identifier, "Expect parameter name.")?.clone());

                if match_types!(self, Comma).is_none() {
                    break;
                }
            }
        }
        self.consume(RightParen, "Expect ')' after parameters.")?;

        self.consume(LeftBrace, format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;

        Ok(Rc::new(stmt::Function { name, params, body }))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Identifier, "Expect variable name.")?.clone();

        let initializer = match match_types!(self, Equal) {
            Some(_) => Some(self.expression()?),
            None => None,
        };

        self.consume(Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        ensure_sufficient_stack(|| {
            if match_types!(self, If).is_some() {
                self.if_statement()
            } else if match_types!(self, While).is_some() {
                self.while_statement()
            } else if match_types!(self, For).is_some() {
                self.for_statement()
            } else if match_types!(self, Print).is_some() {
                self.print_statement()
            } else if let Some(keyword) = match_types!(self, Return) {
                self.return_statement(keyword.clone())
            } else if match_types!(self, LeftBrace).is_some() {
                Ok(Stmt::Block {
                    statements: self.block()?,
                })
            } else {
                self.expression_statement()
            }
        })
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = match match_types!(self, Else) {
            Some(_) => Some(Box::new(self.statement()?)),
            None => None,
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if match_types!(self, Semicolon).is_some() {
            None
        } else if match_types!(self, Var).is_some() {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![
                    body,
                    Stmt::Expression {
                        expression: increment,
                    },
                ],
            };
        }

        let condition = condition.unwrap_or(Expr::LiteralExpr {
            value: Literal::BoolLiteral(true),
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;
        self.consume(Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expression })
    }

    fn return_statement(&mut self, keyword: Token) -> ParseResult<Stmt> {
        let value = if self.check(Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// Parses the rest of a block whose `{` was already consumed.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;
        self.consume(Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expression })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| {
            let expr = self.or()?;

            let Some(equals) = match_types!(self, Equal) else {
                return Ok(expr);
            };
            let value = Box::new(self.assignment()?);

            match expr {
                Expr::Variable { name } => Ok(Expr::Assign { name, value }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                expr => {
                    self.report_at(equals, "Invalid assignment target.");
                    Ok(expr)
                }
            }
        })
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while let Some(operator) = match_types!(self, Or) {
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: operator.to_owned(),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while let Some(operator) = match_types!(self, And) {
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: operator.to_owned(),
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while let Some(operator) = match_types!(self, BangEqual | EqualEqual) {
            let right = self.comparison()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while let Some(operator) = match_types!(self, Greater | GreaterEqual | Less | LessEqual) {
            let right = self.term()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while let Some(operator) = match_types!(self, Minus | Plus) {
            let right = self.factor()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while let Some(operator) = match_types!(self, Slash | Star) {
            let right = self.unary()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| {
            if let Some(operator) = match_types!(self, Bang | Minus) {
                let right = self.unary()?;
                Ok(Expr::Unary {
                    operator: operator.to_owned(),
                    right: Box::new(right),
                })
            } else {
                self.call()
            }
        })
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if match_types!(self, LeftParen).is_some() {
                expr = self.finish_call(expr)?;
            } else if match_types!(self, Dot).is_some() {
                let name = self
                    .consume(Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    self.report("Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);

                if match_types!(self, Comma).is_none() {
                    break;
                }
            }
        }

        let paren = self.consume(RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren: paren.clone(),
            arguments,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let Some(&token) = self.tokens.peek() else {
            return Err(self.error("Expect expression."));
        };

        let expr = match token.typ {
            False => Expr::LiteralExpr {
                value: Literal::BoolLiteral(false),
            },
            True => Expr::LiteralExpr {
                value: Literal::BoolLiteral(true),
            },
            Nil => Expr::LiteralExpr {
                value: Literal::None,
            },
            Number | StringToken => Expr::LiteralExpr {
                value: token.literal.clone(),
            },
            Identifier => Expr::Variable {
                name: token.clone(),
            },
            This => Expr::This {
                keyword: token.clone(),
            },
            LeftParen => {
                self.advance();
                let expression = self.expression()?;
                self.consume(RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping {
                    expression: Box::new(expression),
                });
            }
            _ => return Err(self.error("Expect expression.")),
        };

        self.advance();
        Ok(expr)
    }

    fn is_at_end(&mut self) -> bool {
        self.tokens.peek().map_or(true, |token| token.typ == Eof)
    }

    fn check(&mut self, typ: TokenType) -> bool {
        self.tokens.peek().is_some_and(|token| token.typ == typ)
    }

    /// Consumes the next token unless it is the end marker.
    fn advance(&mut self) -> Option<&'a Token> {
        if self.is_at_end() {
            return None;
        }
        self.previous = self.tokens.next();
        self.previous
    }

    fn consume(&mut self, typ: TokenType, message: impl Into<Soo>) -> ParseResult<&'a Token> {
        match self.tokens.peek() {
            Some(&token) if token.typ == typ => {
                self.advance();
                Ok(token)
            }
            _ => Err(self.error(message)),
        }
    }

    /// Reports at the current token and returns the recovery signal.
    fn error(&mut self, message: impl Into<Soo>) -> ParseError {
        self.report(message);
        ParseError
    }

    /// Reports at the current token without unwinding.
    fn report(&mut self, message: impl Into<Soo>) {
        match self.tokens.peek() {
            Some(&token) => self.diagnostics.report(token, message),
            None => self
                .diagnostics
                .report(&Token::eof(self.line_count), message),
        }
    }

    fn report_at(&mut self, token: &Token, message: impl Into<Soo>) {
        self.diagnostics.report(token, message);
    }

    /// Discards tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        debug!(
            line = self.previous.map_or(self.line_count, |token| token.line),
            "synchronizing after syntax error"
        );
        self.advance();

        while !self.is_at_end() {
            if self.previous.is_some_and(|token| token.typ == Semicolon) {
                return;
            }

            match self.tokens.peek().map(|token| token.typ) {
                Some(Class | Func | Var | For | If | While | Print | Return) => return,
                _ => {}
            }

            self.advance();
        }
    }
}

fn binary(left: Expr, operator: &Token, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator: operator.to_owned(),
        right: Box::new(right),
    }
}
