//! Script language for the reference evaluator.
//!
//! Scripts are line-oriented; each non-empty line (lines starting with
//! `#` are comments) publishes one result:
//!
//! ```text
//! num "Engine RPM", "rpm", 0, 16383.75, (BYTE(0)*256 + BYTE(1))/4
//! lit "Closed Loop", BYTE(0) == 2, "yes", "no"
//! ```
//!
//! Expressions support `+ - * /`, unary minus, parentheses, comparisons
//! (`< > <= >= == !=`, yielding 1 or 0), decimal/`0x`/`0b` literals, and
//! the byte accessors:
//!
//! - `BYTE(b)`: byte `b` of the reply staged for separate-mode parsing
//! - `REQ(n).DATA(k).BYTE(b)`: combined mode, byte `b` of reply `k` of
//!   message `n`
//! - `DATA(k).BYTE(b)`: shorthand for `REQ(0).DATA(k).BYTE(b)`
//! - `DATA_COUNT(n)`: number of replies staged for message `n`
//!
//! A literal's boolean is its expression compared against zero.

use obdframe_core::eval::{EvalError, LiteralValue, NumericalValue};

/// Reply bytes staged by the parse driver for the current invocation.
#[derive(Debug, Clone, Default)]
pub struct Staged {
    /// Separate-mode data: one list of byte arrays per
    /// `add_list_databytes` call (the driver stages exactly one reply).
    pub separate: Vec<Vec<u8>>,
    /// Combined-mode data: one entry per `add_msg_data` call.
    pub combined: Vec<StagedMessage>,
}

/// One message's cleaned replies as staged for combined-mode parsing.
#[derive(Debug, Clone, Default)]
pub struct StagedMessage {
    /// Header bytes, parallel to `data`.
    pub headers: Vec<Vec<u8>>,
    /// Reply payload bytes, parallel to `headers`.
    pub data: Vec<Vec<u8>>,
}

/// A compiled script: an ordered list of publish statements.
#[derive(Debug, Clone)]
pub struct Script {
    statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
enum Statement {
    Num {
        property: String,
        units: String,
        min: Expr,
        max: Expr,
        value: Expr,
    },
    Lit {
        property: String,
        value: Expr,
        if_true: String,
        if_false: String,
    },
}

#[derive(Debug, Clone)]
enum Expr {
    Const(f64),
    Byte(Box<Expr>),
    MsgByte {
        req: Box<Expr>,
        data: Box<Expr>,
        byte: Box<Expr>,
    },
    DataCount(Box<Expr>),
    Neg(Box<Expr>),
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl Script {
    /// Compile a script body.
    ///
    /// # Errors
    ///
    /// `EvalError` describing the first malformed line.
    pub fn parse(source: &str) -> Result<Self, EvalError> {
        let mut statements = Vec::new();
        for (number, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let statement = parse_statement(line)
                .map_err(|err| EvalError::new(format!("line {}: {err}", number + 1)))?;
            statements.push(statement);
        }
        Ok(Self { statements })
    }

    /// Run the script against staged reply data, producing its results in
    /// statement order.
    ///
    /// # Errors
    ///
    /// `EvalError` on out-of-range byte access or arithmetic failure.
    pub fn run(
        &self,
        staged: &Staged,
    ) -> Result<(Vec<NumericalValue>, Vec<LiteralValue>), EvalError> {
        let mut numerical = Vec::new();
        let mut literal = Vec::new();

        for statement in &self.statements {
            match statement {
                Statement::Num {
                    property,
                    units,
                    min,
                    max,
                    value,
                } => numerical.push(NumericalValue {
                    property: property.clone(),
                    units: units.clone(),
                    min: min.eval(staged)?,
                    max: max.eval(staged)?,
                    value: value.eval(staged)?,
                }),
                Statement::Lit {
                    property,
                    value,
                    if_true,
                    if_false,
                } => literal.push(LiteralValue {
                    property: property.clone(),
                    value: value.eval(staged)? != 0.0,
                    value_if_true: if_true.clone(),
                    value_if_false: if_false.clone(),
                }),
            }
        }
        Ok((numerical, literal))
    }
}

impl Expr {
    fn eval(&self, staged: &Staged) -> Result<f64, EvalError> {
        match self {
            Self::Const(value) => Ok(*value),
            Self::Byte(index) => {
                let index = index.index(staged)?;
                let reply = staged
                    .separate
                    .first()
                    .ok_or_else(|| EvalError::new("BYTE: no reply data staged"))?;
                reply
                    .get(index)
                    .copied()
                    .map(f64::from)
                    .ok_or_else(|| EvalError::new(format!("BYTE({index}): out of range")))
            }
            Self::MsgByte { req, data, byte } => {
                let req = req.index(staged)?;
                let data = data.index(staged)?;
                let byte = byte.index(staged)?;
                let message = staged
                    .combined
                    .get(req)
                    .ok_or_else(|| EvalError::new(format!("REQ({req}): out of range")))?;
                let reply = message
                    .data
                    .get(data)
                    .ok_or_else(|| EvalError::new(format!("DATA({data}): out of range")))?;
                reply
                    .get(byte)
                    .copied()
                    .map(f64::from)
                    .ok_or_else(|| EvalError::new(format!("BYTE({byte}): out of range")))
            }
            Self::DataCount(req) => {
                let req = req.index(staged)?;
                let message = staged
                    .combined
                    .get(req)
                    .ok_or_else(|| EvalError::new(format!("DATA_COUNT({req}): out of range")))?;
                Ok(message.data.len() as f64)
            }
            Self::Neg(inner) => Ok(-inner.eval(staged)?),
            Self::Bin { op, lhs, rhs } => {
                let lhs = lhs.eval(staged)?;
                let rhs = rhs.eval(staged)?;
                match op {
                    BinOp::Add => Ok(lhs + rhs),
                    BinOp::Sub => Ok(lhs - rhs),
                    BinOp::Mul => Ok(lhs * rhs),
                    BinOp::Div => {
                        if rhs == 0.0 {
                            Err(EvalError::new("division by zero"))
                        } else {
                            Ok(lhs / rhs)
                        }
                    }
                    BinOp::Lt => Ok(truth(lhs < rhs)),
                    BinOp::Gt => Ok(truth(lhs > rhs)),
                    BinOp::Le => Ok(truth(lhs <= rhs)),
                    BinOp::Ge => Ok(truth(lhs >= rhs)),
                    BinOp::Eq => Ok(truth(lhs == rhs)),
                    BinOp::Ne => Ok(truth(lhs != rhs)),
                }
            }
        }
    }

    fn index(&self, staged: &Staged) -> Result<usize, EvalError> {
        let value = self.eval(staged)?;
        if !value.is_finite() || value < 0.0 {
            return Err(EvalError::new(format!("bad index {value}")));
        }
        Ok(value as usize)
    }
}

fn truth(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
}

fn tokenize(line: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '<' | '>' | '=' | '!' => {
                chars.next();
                let eq = chars.peek() == Some(&'=');
                if eq {
                    chars.next();
                }
                tokens.push(match (c, eq) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::Le,
                    ('>', false) => Token::Gt,
                    ('>', true) => Token::Ge,
                    ('=', true) => Token::EqEq,
                    ('!', true) => Token::Ne,
                    _ => return Err(EvalError::new(format!("stray {c:?}"))),
                });
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => text.push(c),
                        None => return Err(EvalError::new("unterminated string")),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '0'..='9' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_ascii_alphanumeric() {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                // Decimal fractions: consume ".digits" when present.
                if chars.peek() == Some(&'.') {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek().is_some_and(char::is_ascii_digit) {
                        text.push('.');
                        chars.next();
                        while let Some(&c) = chars.peek() {
                            if c.is_ascii_digit() {
                                text.push(c);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
                tokens.push(Token::Num(parse_number(&text)?));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => return Err(EvalError::new(format!("unexpected character {other:?}"))),
        }
    }
    Ok(tokens)
}

fn parse_number(text: &str) -> Result<f64, EvalError> {
    let bad = || EvalError::new(format!("bad number {text:?}"));
    if let Some(hex) = text.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).map(f64::from).map_err(|_| bad());
    }
    if let Some(bin) = text.strip_prefix("0b") {
        return u32::from_str_radix(bin, 2).map(f64::from).map_err(|_| bad());
    }
    text.parse::<f64>().map_err(|_| bad())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn parse_statement(line: &str) -> Result<Statement, EvalError> {
    let mut parser = Parser {
        tokens: tokenize(line)?,
        pos: 0,
    };

    let keyword = match parser.next() {
        Some(Token::Ident(name)) => name,
        _ => return Err(EvalError::new("expected `num` or `lit`")),
    };

    let statement = match keyword.as_str() {
        "num" => {
            let property = parser.string()?;
            parser.comma()?;
            let units = parser.string()?;
            parser.comma()?;
            let min = parser.expr()?;
            parser.comma()?;
            let max = parser.expr()?;
            parser.comma()?;
            let value = parser.expr()?;
            Statement::Num {
                property,
                units,
                min,
                max,
                value,
            }
        }
        "lit" => {
            let property = parser.string()?;
            parser.comma()?;
            let value = parser.expr()?;
            parser.comma()?;
            let if_true = parser.string()?;
            parser.comma()?;
            let if_false = parser.string()?;
            Statement::Lit {
                property,
                value,
                if_true,
                if_false,
            }
        }
        other => return Err(EvalError::new(format!("unknown statement {other:?}"))),
    };

    if parser.pos != parser.tokens.len() {
        return Err(EvalError::new("trailing tokens"));
    }
    Ok(statement)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token: &Token) -> Result<(), EvalError> {
        if self.peek() == Some(token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(EvalError::new(format!("expected {token:?}")))
        }
    }

    fn comma(&mut self) -> Result<(), EvalError> {
        self.expect(&Token::Comma)
    }

    fn string(&mut self) -> Result<String, EvalError> {
        match self.next() {
            Some(Token::Str(text)) => Ok(text),
            _ => Err(EvalError::new("expected a string literal")),
        }
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.additive()?;
        while let Some(op) = match self.peek() {
            Some(Token::Lt) => Some(BinOp::Lt),
            Some(Token::Gt) => Some(BinOp::Gt),
            Some(Token::Le) => Some(BinOp::Le),
            Some(Token::Ge) => Some(BinOp::Ge),
            Some(Token::EqEq) => Some(BinOp::Eq),
            Some(Token::Ne) => Some(BinOp::Ne),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.multiplicative()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(Expr::Const(value)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.accessor(&name),
            other => Err(EvalError::new(format!("unexpected token {other:?}"))),
        }
    }

    fn call_argument(&mut self) -> Result<Expr, EvalError> {
        self.expect(&Token::LParen)?;
        let argument = self.expr()?;
        self.expect(&Token::RParen)?;
        Ok(argument)
    }

    fn accessor(&mut self, name: &str) -> Result<Expr, EvalError> {
        match name {
            "BYTE" => Ok(Expr::Byte(Box::new(self.call_argument()?))),
            "DATA_COUNT" => Ok(Expr::DataCount(Box::new(self.call_argument()?))),
            "REQ" => {
                let req = self.call_argument()?;
                self.expect(&Token::Dot)?;
                self.keyword("DATA")?;
                let data = self.call_argument()?;
                self.expect(&Token::Dot)?;
                self.keyword("BYTE")?;
                let byte = self.call_argument()?;
                Ok(Expr::MsgByte {
                    req: Box::new(req),
                    data: Box::new(data),
                    byte: Box::new(byte),
                })
            }
            "DATA" => {
                let data = self.call_argument()?;
                self.expect(&Token::Dot)?;
                self.keyword("BYTE")?;
                let byte = self.call_argument()?;
                Ok(Expr::MsgByte {
                    req: Box::new(Expr::Const(0.0)),
                    data: Box::new(data),
                    byte: Box::new(byte),
                })
            }
            other => Err(EvalError::new(format!("unknown accessor {other:?}"))),
        }
    }

    fn keyword(&mut self, name: &str) -> Result<(), EvalError> {
        match self.next() {
            Some(Token::Ident(ident)) if ident == name => Ok(()),
            _ => Err(EvalError::new(format!("expected {name}"))),
        }
    }
}
