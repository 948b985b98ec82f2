//! Lexical analysis: turns the raw expression into a flat vector of tokens.
//!
//! Every token is classified exactly once here; later stages branch on the
//! `TokenKind` tag and never look at the source text again. Register names
//! are matched before identifiers since both may contain alphanumerics, and
//! only names present in the register file are accepted.

use std::fmt;

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::register::Register;

/// The four arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinOp {
  pub fn symbol(self) -> char {
    match self {
      BinOp::Add => '+',
      BinOp::Sub => '-',
      BinOp::Mul => '*',
      BinOp::Div => '/',
    }
  }

  fn from_byte(c: u8) -> Option<Self> {
    match c {
      b'+' => Some(BinOp::Add),
      b'-' => Some(BinOp::Sub),
      b'*' => Some(BinOp::Mul),
      b'/' => Some(BinOp::Div),
      _ => None,
    }
  }
}

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  Ident(String),
  Int(i64),
  Register(Register),
  Op(BinOp),
  LParen,
  RParen,
  Assign,
}

impl TokenKind {
  /// Identifiers, literals and registers; everything the generator pushes as-is.
  pub fn is_operand(&self) -> bool {
    matches!(
      self,
      TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Register(_)
    )
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TokenKind::Ident(name) => f.write_str(name),
      TokenKind::Int(value) => write!(f, "{value}"),
      TokenKind::Register(reg) => write!(f, "{reg}"),
      TokenKind::Op(op) => write!(f, "{}", op.symbol()),
      TokenKind::LParen => f.write_str("("),
      TokenKind::RParen => f.write_str(")"),
      TokenKind::Assign => f.write_str("="),
    }
  }
}

/// A classified token plus the byte span it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self { kind, loc, len }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.kind.fmt(f)
  }
}

/// Lex the input into a flat vector of tokens. Whitespace and commas are dropped.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() || c == b',' {
      i += 1;
      continue;
    }

    if c == b'$' {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
      }
      let text = &input[start..i];
      if text.len() == 1 {
        return Err(CompileError::at(input, start, "expected a register name after '$'"));
      }
      let reg = Register::from_name(text)
        .ok_or_else(|| CompileError::at(input, start, format!("unknown register '{text}'")))?;
      tokens.push(Token::new(TokenKind::Register(reg), start, i - start));
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      i += 1;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let name = input[start..i].to_string();
      tokens.push(Token::new(TokenKind::Ident(name), start, i - start));
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let value = input[start..i]
        .parse::<i64>()
        .map_err(|err| CompileError::at(input, start, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Int(value), start, i - start));
      continue;
    }

    let kind = match c {
      b'(' => Some(TokenKind::LParen),
      b')' => Some(TokenKind::RParen),
      b'=' => Some(TokenKind::Assign),
      _ => BinOp::from_byte(c).map(TokenKind::Op),
    };
    if let Some(kind) = kind {
      tokens.push(Token::new(kind, i, 1));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  debug!(count = tokens.len(), "tokenized expression");
  Ok(tokens)
}

/// Serialise tokens back to text, one space between each.
pub fn render_tokens(tokens: &[Token]) -> String {
  tokens
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" ")
}
