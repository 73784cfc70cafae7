//! Condition grammar for `if` steps
//!
//! A deliberately tiny, side-effect-free expression language:
//!
//! ```text
//! expr   := atom ( ('&&' | '||') atom )*
//! atom   := '!'? primary
//! primary:= '(' expr ')' | compare | varref
//! compare:= varref OP ( varref | literal )
//! OP     := '==' | '!=' | '<' | '<=' | '>' | '>='
//! literal:= INT | STRING | 'true' | 'false'
//! ```
//!
//! Variables are strings resolved through the environment; unknown names
//! evaluate to the empty string. Ordered comparisons require both sides to
//! parse as numbers, otherwise the comparison is false and a warning is
//! recorded. Equality is textual. Logical operators short-circuit, and
//! mixed `&&`/`||` chains evaluate left to right.

use crate::env::Environment;
use thiserror::Error;

/// A condition that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid condition at offset {position}: {message}")]
pub struct ConditionError {
    /// Byte offset into the source where parsing failed.
    pub position: usize,
    /// What the parser expected.
    pub message: String,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Var(String),
    Int(i64),
    Str(String),
    Bool(bool),
}

/// A possibly-negated primary.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub negated: bool,
    pub primary: Primary,
}

/// Primary expression forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    Group(Box<Expr>),
    Compare {
        var: String,
        op: CmpOp,
        rhs: Operand,
    },
    Var(String),
}

/// Parsed condition expression: a left-associative atom chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub first: Atom,
    pub rest: Vec<(LogicOp, Atom)>,
}

impl Expr {
    /// Parse a condition source string.
    pub fn parse(source: &str) -> Result<Expr, ConditionError> {
        let tokens = lex(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ConditionError {
                position: tok.position,
                message: format!("unexpected trailing '{}'", tok.kind.describe()),
            }),
        }
    }

    /// Evaluate against the environment.
    ///
    /// Returns the truth value and any warnings (non-numeric ordered
    /// comparisons) collected during evaluation. Short-circuits, so a
    /// skipped operand produces no warnings.
    pub fn eval(&self, env: &Environment) -> (bool, Vec<String>) {
        let mut warnings = Vec::new();
        let mut value = self.first.eval(env, &mut warnings);
        for (op, atom) in &self.rest {
            match op {
                LogicOp::And => {
                    if value {
                        value = atom.eval(env, &mut warnings);
                    }
                }
                LogicOp::Or => {
                    if !value {
                        value = atom.eval(env, &mut warnings);
                    }
                }
            }
        }
        (value, warnings)
    }
}

impl Atom {
    fn eval(&self, env: &Environment, warnings: &mut Vec<String>) -> bool {
        let value = self.primary.eval(env, warnings);
        if self.negated {
            !value
        } else {
            value
        }
    }
}

impl Primary {
    fn eval(&self, env: &Environment, warnings: &mut Vec<String>) -> bool {
        match self {
            Primary::Group(expr) => {
                let (value, mut inner) = expr.eval(env);
                warnings.append(&mut inner);
                value
            }
            Primary::Var(name) => truthy(env.lookup(name).unwrap_or("")),
            Primary::Compare { var, op, rhs } => {
                let lhs = env.lookup(var).unwrap_or("").to_string();
                let rhs = match rhs {
                    Operand::Var(name) => env.lookup(name).unwrap_or("").to_string(),
                    Operand::Int(n) => n.to_string(),
                    Operand::Str(s) => s.clone(),
                    Operand::Bool(b) => b.to_string(),
                };
                match op {
                    CmpOp::Eq => lhs == rhs,
                    CmpOp::Ne => lhs != rhs,
                    CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                        match (lhs.trim().parse::<f64>(), rhs.trim().parse::<f64>()) {
                            (Ok(l), Ok(r)) => match op {
                                CmpOp::Lt => l < r,
                                CmpOp::Le => l <= r,
                                CmpOp::Gt => l > r,
                                CmpOp::Ge => l >= r,
                                _ => unreachable!(),
                            },
                            _ => {
                                warnings.push(format!(
                                    "ordered comparison on non-numeric operands: '{}' vs '{}'",
                                    lhs, rhs
                                ));
                                false
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Truthiness of a bare variable reference: non-empty and not a literal
/// `false`/`0`.
fn truthy(value: &str) -> bool {
    !value.is_empty() && value != "false" && value != "0"
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),
    AndAnd,
    OrOr,
    Not,
    LParen,
    RParen,
    Cmp(CmpOp),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Int(n) => n.to_string(),
            TokenKind::Str(s) => format!("\"{}\"", s),
            TokenKind::AndAnd => "&&".to_string(),
            TokenKind::OrOr => "||".to_string(),
            TokenKind::Not => "!".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Cmp(op) => match op {
                CmpOp::Eq => "==",
                CmpOp::Ne => "!=",
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
            }
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn lex(source: &str) -> Result<Vec<Token>, ConditionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                tokens.push(Token { kind: TokenKind::LParen, position: start });
                i += 1;
            }
            b')' => {
                tokens.push(Token { kind: TokenKind::RParen, position: start });
                i += 1;
            }
            b'&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Token { kind: TokenKind::AndAnd, position: start });
                    i += 2;
                } else {
                    return Err(ConditionError {
                        position: start,
                        message: "expected '&&'".to_string(),
                    });
                }
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Token { kind: TokenKind::OrOr, position: start });
                    i += 2;
                } else {
                    return Err(ConditionError {
                        position: start,
                        message: "expected '||'".to_string(),
                    });
                }
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Cmp(CmpOp::Eq), position: start });
                    i += 2;
                } else {
                    return Err(ConditionError {
                        position: start,
                        message: "expected '=='".to_string(),
                    });
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Cmp(CmpOp::Ne), position: start });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Not, position: start });
                    i += 1;
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Cmp(CmpOp::Le), position: start });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Cmp(CmpOp::Lt), position: start });
                    i += 1;
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Cmp(CmpOp::Ge), position: start });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Cmp(CmpOp::Gt), position: start });
                    i += 1;
                }
            }
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                let content_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(ConditionError {
                        position: start,
                        message: "unterminated string literal".to_string(),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Str(source[content_start..i].to_string()),
                    position: start,
                });
                i += 1;
            }
            b'0'..=b'9' | b'-' => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let text = &source[start..i];
                let value = text.parse::<i64>().map_err(|_| ConditionError {
                    position: start,
                    message: format!("invalid integer literal '{}'", text),
                })?;
                tokens.push(Token { kind: TokenKind::Int(value), position: start });
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(source[start..i].to_string()),
                    position: start,
                });
            }
            other => {
                return Err(ConditionError {
                    position: start,
                    message: format!("unexpected character '{}'", other as char),
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn end_position(&self) -> usize {
        self.tokens.last().map(|t| t.position + 1).unwrap_or(0)
    }

    fn expr(&mut self) -> Result<Expr, ConditionError> {
        let first = self.atom()?;
        let mut rest = Vec::new();
        while let Some(tok) = self.peek() {
            let op = match tok.kind {
                TokenKind::AndAnd => LogicOp::And,
                TokenKind::OrOr => LogicOp::Or,
                _ => break,
            };
            self.advance();
            rest.push((op, self.atom()?));
        }
        Ok(Expr { first, rest })
    }

    fn atom(&mut self) -> Result<Atom, ConditionError> {
        let mut negated = false;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Not)) {
            self.advance();
            negated = !negated;
        }
        let primary = self.primary()?;
        Ok(Atom { negated, primary })
    }

    fn primary(&mut self) -> Result<Primary, ConditionError> {
        match self.advance() {
            Some(Token { kind: TokenKind::LParen, .. }) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token { kind: TokenKind::RParen, .. }) => {
                        Ok(Primary::Group(Box::new(inner)))
                    }
                    Some(tok) => Err(ConditionError {
                        position: tok.position,
                        message: format!("expected ')', found '{}'", tok.kind.describe()),
                    }),
                    None => Err(ConditionError {
                        position: self.end_position(),
                        message: "expected ')'".to_string(),
                    }),
                }
            }
            Some(Token { kind: TokenKind::Ident(name), .. }) => {
                if let Some(Token { kind: TokenKind::Cmp(op), .. }) = self.peek() {
                    let op = *op;
                    self.advance();
                    let rhs = self.operand()?;
                    Ok(Primary::Compare { var: name, op, rhs })
                } else {
                    Ok(Primary::Var(name))
                }
            }
            Some(tok) => Err(ConditionError {
                position: tok.position,
                message: format!(
                    "expected variable, comparison or group, found '{}'",
                    tok.kind.describe()
                ),
            }),
            None => Err(ConditionError {
                position: self.end_position(),
                message: "unexpected end of condition".to_string(),
            }),
        }
    }

    fn operand(&mut self) -> Result<Operand, ConditionError> {
        match self.advance() {
            Some(Token { kind: TokenKind::Ident(name), .. }) => match name.as_str() {
                "true" => Ok(Operand::Bool(true)),
                "false" => Ok(Operand::Bool(false)),
                _ => Ok(Operand::Var(name)),
            },
            Some(Token { kind: TokenKind::Int(value), .. }) => Ok(Operand::Int(value)),
            Some(Token { kind: TokenKind::Str(value), .. }) => Ok(Operand::Str(value)),
            Some(tok) => Err(ConditionError {
                position: tok.position,
                message: format!(
                    "expected variable or literal after comparison, found '{}'",
                    tok.kind.describe()
                ),
            }),
            None => Err(ConditionError {
                position: self.end_position(),
                message: "expected variable or literal after comparison".to_string(),
            }),
        }
    }
}
