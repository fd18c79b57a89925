//! Tokenizer for selection formulas.

use super::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    AndAnd,
    OrOr,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    /// Short description used in parse errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(value) => format!("number {}", value),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Not => "'!'".to_string(),
            Token::AndAnd => "'&&'".to_string(),
            Token::OrOr => "'||'".to_string(),
            Token::Eq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Le => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::Ge => "'>='".to_string(),
        }
    }
}

/// A token together with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    index: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            index: 0,
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<Option<Spanned>, FormulaError> {
        self.skip_whitespace();
        if self.index >= self.bytes.len() {
            return Ok(None);
        }

        let offset = self.index;
        let ch = self.bytes[offset];
        let token = match ch {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b'[' => self.single(Token::LBracket),
            b']' => self.single(Token::RBracket),
            b',' => self.single(Token::Comma),
            b'+' => self.single(Token::Plus),
            b'-' => self.single(Token::Minus),
            b'*' => self.single(Token::Star),
            b'/' => self.single(Token::Slash),
            b'%' => self.single(Token::Percent),
            b'&' => self.pair(b'&', Token::AndAnd, None)?,
            b'|' => self.pair(b'|', Token::OrOr, None)?,
            b'=' => self.pair(b'=', Token::Eq, None)?,
            b'!' => self.pair(b'=', Token::NotEq, Some(Token::Not))?,
            b'<' => self.pair(b'=', Token::Le, Some(Token::Lt))?,
            b'>' => self.pair(b'=', Token::Ge, Some(Token::Gt))?,
            b'0'..=b'9' => self.lex_number()?,
            b'.' if self.peek_digit(offset + 1) => self.lex_number()?,
            _ if is_ident_start(ch) => self.lex_identifier(),
            _ => {
                let ch = self.input[offset..].chars().next().unwrap_or('?');
                return Err(FormulaError::UnexpectedChar { ch, offset });
            }
        };

        Ok(Some(Spanned { token, offset }))
    }

    fn skip_whitespace(&mut self) {
        while self.index < self.bytes.len() && self.bytes[self.index].is_ascii_whitespace() {
            self.index += 1;
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.index += 1;
        token
    }

    /// Lex a two-character operator whose second byte is `second`.
    ///
    /// When the second byte is absent, `alone` is used if the first byte is
    /// an operator on its own; otherwise the lone byte is an error.
    fn pair(
        &mut self,
        second: u8,
        token: Token,
        alone: Option<Token>,
    ) -> Result<Token, FormulaError> {
        let offset = self.index;
        if self.bytes.get(offset + 1) == Some(&second) {
            self.index += 2;
            return Ok(token);
        }
        match alone {
            Some(alone) => {
                self.index += 1;
                Ok(alone)
            }
            None => Err(FormulaError::UnexpectedChar {
                ch: self.bytes[offset] as char,
                offset,
            }),
        }
    }

    fn peek_digit(&self, index: usize) -> bool {
        self.bytes.get(index).is_some_and(|b| b.is_ascii_digit())
    }

    fn lex_number(&mut self) -> Result<Token, FormulaError> {
        let start = self.index;
        self.consume_digits();
        if self.bytes.get(self.index) == Some(&b'.') {
            self.index += 1;
            self.consume_digits();
        }
        if matches!(self.bytes.get(self.index), Some(b'e') | Some(b'E')) {
            let mut lookahead = self.index + 1;
            if matches!(self.bytes.get(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if self.peek_digit(lookahead) {
                self.index = lookahead;
                self.consume_digits();
            }
        }

        let text = &self.input[start..self.index];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::InvalidNumber {
                text: text.to_string(),
                offset: start,
            })
    }

    fn consume_digits(&mut self) {
        while self.peek_digit(self.index) {
            self.index += 1;
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.index;
        self.index += 1;
        while self.index < self.bytes.len() && is_ident_continue(self.bytes[self.index]) {
            self.index += 1;
        }
        match &self.input[start..self.index] {
            "true" => Token::Number(1.0),
            "false" => Token::Number(0.0),
            ident => Token::Ident(ident.to_string()),
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'.'
}
