use super::ConditionError;
use super::lexer::Tok;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Num(f64),
    Bool(bool),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// Deepest allowed nesting of parentheses and unary operators.
pub(super) const MAX_NESTING: usize = 128;
/// Longest accepted token stream; bounds the height of left-folded operator chains.
pub(super) const MAX_TOKENS: usize = 1024;

/// Recursive-descent parser; precedence from loosest: `||`, `&&`, equality, relational,
/// additive, multiplicative, unary.
pub(super) struct Parser {
    toks: Vec<Tok>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub(super) fn new(toks: Vec<Tok>) -> Self {
        Self {
            toks,
            pos: 0,
            depth: 0,
        }
    }

    fn enter(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ConditionError::NestingTooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn nested(
        &mut self,
        inner: fn(&mut Self) -> Result<Expr, ConditionError>,
    ) -> Result<Expr, ConditionError> {
        self.enter()?;
        let expr = inner(self)?;
        self.depth -= 1;
        Ok(expr)
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub(super) fn parse(mut self) -> Result<Expr, ConditionError> {
        if self.toks.is_empty() {
            return Err(ConditionError::Empty);
        }
        if self.toks.len() > MAX_TOKENS {
            return Err(ConditionError::TooLong(MAX_TOKENS));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) => Err(ConditionError::UnexpectedToken(format!("{tok:?}"))),
        }
    }

    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ConditionError>,
        op_for: fn(&Tok) -> Option<BinOp>,
    ) -> Result<Expr, ConditionError> {
        let mut lhs = next(self)?;
        while let Some(op) = self.peek().and_then(op_for) {
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        self.parse_binary_level(Self::parse_and, |t| match t {
            Tok::Or => Some(BinOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        self.parse_binary_level(Self::parse_equality, |t| match t {
            Tok::And => Some(BinOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, ConditionError> {
        self.parse_binary_level(Self::parse_relational, |t| match t {
            Tok::Eq => Some(BinOp::Eq),
            Tok::NotEq => Some(BinOp::NotEq),
            Tok::StrictEq => Some(BinOp::StrictEq),
            Tok::StrictNotEq => Some(BinOp::StrictNotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, ConditionError> {
        self.parse_binary_level(Self::parse_additive, |t| match t {
            Tok::Lt => Some(BinOp::Lt),
            Tok::Le => Some(BinOp::Le),
            Tok::Gt => Some(BinOp::Gt),
            Tok::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ConditionError> {
        self.parse_binary_level(Self::parse_multiplicative, |t| match t {
            Tok::Plus => Some(BinOp::Add),
            Tok::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ConditionError> {
        self.parse_binary_level(Self::parse_unary, |t| match t {
            Tok::Star => Some(BinOp::Mul),
            Tok::Slash => Some(BinOp::Div),
            Tok::Percent => Some(BinOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        match self.peek() {
            Some(Tok::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.nested(Self::parse_unary)?)))
            }
            Some(Tok::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.nested(Self::parse_unary)?)))
            }
            Some(Tok::Plus) => {
                self.pos += 1;
                self.nested(Self::parse_unary)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        match self.bump() {
            Some(Tok::Num(n)) => Ok(Expr::Num(n)),
            Some(Tok::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                _ => Expr::Var(name),
            }),
            Some(Tok::LParen) => {
                let inner = self.nested(Self::parse_or)?;
                match self.bump() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err(ConditionError::UnbalancedParens),
                }
            }
            Some(tok) => Err(ConditionError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Value {
    Num(f64),
    Bool(bool),
}

impl Value {
    fn as_num(self) -> f64 {
        match self {
            Self::Num(n) => n,
            Self::Bool(b) => f64::from(u8::from(b)),
        }
    }

    pub(super) fn truthy(self) -> bool {
        match self {
            Self::Num(n) => n != 0.0 && !n.is_nan(),
            Self::Bool(b) => b,
        }
    }

    fn same_type(self, other: Value) -> bool {
        matches!(
            (self, other),
            (Self::Num(_), Self::Num(_)) | (Self::Bool(_), Self::Bool(_))
        )
    }
}

pub(super) fn eval(
    expr: &Expr,
    lookup: &dyn Fn(&str) -> Option<f64>,
) -> Result<Value, ConditionError> {
    Ok(match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Var(name) => Value::Num(
            lookup(name).ok_or_else(|| ConditionError::UnknownVariable(name.clone()))?,
        ),
        Expr::Neg(inner) => Value::Num(-eval(inner, lookup)?.as_num()),
        Expr::Not(inner) => Value::Bool(!eval(inner, lookup)?.truthy()),
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let l = eval(lhs, lookup)?;
            if !l.truthy() { l } else { eval(rhs, lookup)? }
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let l = eval(lhs, lookup)?;
            if l.truthy() { l } else { eval(rhs, lookup)? }
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval(lhs, lookup)?;
            let r = eval(rhs, lookup)?;
            let (a, b) = (l.as_num(), r.as_num());
            match op {
                BinOp::Add => Value::Num(a + b),
                BinOp::Sub => Value::Num(a - b),
                BinOp::Mul => Value::Num(a * b),
                BinOp::Div | BinOp::Rem if b == 0.0 => return Err(ConditionError::DivisionByZero),
                BinOp::Div => Value::Num(a / b),
                BinOp::Rem => Value::Num(a % b),
                BinOp::Lt => Value::Bool(a < b),
                BinOp::Le => Value::Bool(a <= b),
                BinOp::Gt => Value::Bool(a > b),
                BinOp::Ge => Value::Bool(a >= b),
                BinOp::Eq => Value::Bool(a == b),
                BinOp::NotEq => Value::Bool(a != b),
                BinOp::StrictEq => Value::Bool(l.same_type(r) && a == b),
                BinOp::StrictNotEq => Value::Bool(!(l.same_type(r) && a == b)),
                BinOp::And | BinOp::Or => unreachable!("short-circuit operators handled above"),
            }
        }
    })
}
