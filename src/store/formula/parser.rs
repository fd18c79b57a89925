//! Recursive-descent parser producing the formula syntax tree.

use super::lexer::{Lexer, Spanned, Token};
use super::FormulaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Parsed, unbound formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Field {
        name: String,
        index: Option<Box<Expr>>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Deepest nesting of parentheses, brackets, call arguments and prefix
/// operators.
pub const MAX_DEPTH: usize = 64;

/// Most binary operators in one formula.
pub const MAX_OPERATORS: usize = 1024;

/// Parse a complete formula. Trailing input is an error.
pub fn parse(input: &str) -> Result<Expr, FormulaError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Spanned>,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            lookahead: None,
            depth: 0,
            operators: 0,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, FormulaError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.parse_and()?;
        while self.eat(&Token::OrOr)? {
            let rhs = self.parse_and()?;
            expr = self.binary(BinaryOp::Or, expr, rhs)?;
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.parse_equality()?;
        while self.eat(&Token::AndAnd)? {
            let rhs = self.parse_equality()?;
            expr = self.binary(BinaryOp::And, expr, rhs)?;
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_comparison()?;
            expr = self.binary(op, expr, rhs)?;
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_additive()?;
            expr = self.binary(op, expr, rhs)?;
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            expr = self.binary(op, expr, rhs)?;
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            expr = self.binary(op, expr, rhs)?;
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.peek()? {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => {
                self.advance()?;
                return self.nested(Self::parse_unary);
            }
            _ => return self.parse_primary(),
        };
        self.advance()?;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        let Some(spanned) = self.advance()? else {
            return Err(FormulaError::UnexpectedEnd {
                expected: "a value",
            });
        };

        match spanned.token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::LParen => {
                let expr = self.nested(Self::parse_expr)?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::Ident(name) => {
                if self.eat(&Token::LParen)? {
                    let args = self.parse_arguments()?;
                    Ok(Expr::Call { name, args })
                } else if self.eat(&Token::LBracket)? {
                    let index = self.nested(Self::parse_expr)?;
                    self.expect(Token::RBracket, "']'")?;
                    Ok(Expr::Field {
                        name,
                        index: Some(Box::new(index)),
                    })
                } else {
                    Ok(Expr::Field { name, index: None })
                }
            }
            token => Err(FormulaError::UnexpectedToken {
                found: token.describe(),
                expected: "a value",
                offset: spanned.offset,
            }),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen)? {
            return Ok(args);
        }
        loop {
            args.push(self.nested(Self::parse_expr)?);
            if self.eat(&Token::Comma)? {
                continue;
            }
            self.expect(Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.depth == MAX_DEPTH {
            return Err(FormulaError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Expr, FormulaError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(FormulaError::TooManyOperators {
                limit: MAX_OPERATORS,
            });
        }
        Ok(binary(op, lhs, rhs))
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), FormulaError> {
        match self.advance()? {
            Some(spanned) if spanned.token == token => Ok(()),
            Some(spanned) => Err(FormulaError::UnexpectedToken {
                found: spanned.token.describe(),
                expected,
                offset: spanned.offset,
            }),
            None => Err(FormulaError::UnexpectedEnd { expected }),
        }
    }

    fn expect_end(&mut self) -> Result<(), FormulaError> {
        match self.advance()? {
            None => Ok(()),
            Some(spanned) => Err(FormulaError::UnexpectedToken {
                found: spanned.token.describe(),
                expected: "end of expression",
                offset: spanned.offset,
            }),
        }
    }

    /// Consume the next token if it equals `token`.
    fn eat(&mut self, token: &Token) -> Result<bool, FormulaError> {
        if self.peek()? == Some(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>, FormulaError> {
        if self.lookahead.is_none() {
            self.lookahead = self.lexer.next_token()?;
        }
        Ok(self.lookahead.as_ref().map(|spanned| &spanned.token))
    }

    fn advance(&mut self) -> Result<Option<Spanned>, FormulaError> {
        match self.lookahead.take() {
            Some(spanned) => Ok(Some(spanned)),
            None => self.lexer.next_token(),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
