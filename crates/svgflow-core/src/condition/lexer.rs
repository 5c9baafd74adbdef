use super::ConditionError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Tok {
    Num(f64),
    Ident(String),
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Not,
    And,
    Or,
}

pub(super) struct Lexer<'input> {
    input: &'input str,
    pos: usize,
}

impl<'input> Lexer<'input> {
    pub(super) fn new(input: &'input str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn lex_number(&mut self) -> Result<Tok, ConditionError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || b == b'.')
        {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1 + sign;
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let raw = &self.input[start..self.pos];
        raw.parse::<f64>()
            .map(Tok::Num)
            .map_err(|_| ConditionError::InvalidNumber(raw.to_string()))
    }

    fn lex_ident(&mut self) -> Tok {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        Tok::Ident(self.input[start..self.pos].to_string())
    }

    /// Consumes the next byte when it equals `expected`.
    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Option<Tok>, ConditionError> {
        self.skip_ws();
        let Some(b) = self.peek() else {
            return Ok(None);
        };

        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.lex_number().map(Some);
        }
        if b.is_ascii_alphabetic() || b == b'_' {
            return Ok(Some(self.lex_ident()));
        }

        let start = self.pos;
        self.bump();
        let tok = match b {
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'*' => Tok::Star,
            b'/' => Tok::Slash,
            b'%' => Tok::Percent,
            b'<' => {
                if self.eat(b'=') {
                    Tok::Le
                } else {
                    Tok::Lt
                }
            }
            b'>' => {
                if self.eat(b'=') {
                    Tok::Ge
                } else {
                    Tok::Gt
                }
            }
            b'=' if self.eat(b'=') => {
                if self.eat(b'=') {
                    Tok::StrictEq
                } else {
                    Tok::Eq
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    if self.eat(b'=') {
                        Tok::StrictNotEq
                    } else {
                        Tok::NotEq
                    }
                } else {
                    Tok::Not
                }
            }
            b'&' if self.eat(b'&') => Tok::And,
            b'|' if self.eat(b'|') => Tok::Or,
            _ => {
                let ch = self.input[start..].chars().next().unwrap_or('?');
                return Err(ConditionError::UnexpectedChar(ch, start));
            }
        };
        Ok(Some(tok))
    }

    pub(super) fn tokenize(mut self) -> Result<Vec<Tok>, ConditionError> {
        let mut out = Vec::new();
        while let Some(tok) = self.next_token()? {
            out.push(tok);
        }
        Ok(out)
    }
}
