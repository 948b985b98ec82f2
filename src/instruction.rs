//! Instruction records: the generator's output and the renderer's input.

use std::fmt;

use serde::Serialize;

use crate::register::Register;
use crate::tokenizer::BinOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mnemonic {
  #[serde(rename = "lw")]
  Load,
  #[serde(rename = "sw")]
  Store,
  #[serde(rename = "move")]
  Move,
  #[serde(rename = "add")]
  Add,
  #[serde(rename = "sub")]
  Sub,
  #[serde(rename = "mul")]
  Mul,
  #[serde(rename = "div")]
  Div,
  // Listing-only; the generator never emits these.
  #[serde(rename = "addi")]
  Addi,
  #[serde(rename = "beq")]
  Beq,
  #[serde(rename = "bne")]
  Bne,
  #[serde(rename = "j")]
  Jump,
}

impl Mnemonic {
  pub const ALL: [Mnemonic; 11] = [
    Mnemonic::Load,
    Mnemonic::Store,
    Mnemonic::Move,
    Mnemonic::Add,
    Mnemonic::Sub,
    Mnemonic::Mul,
    Mnemonic::Div,
    Mnemonic::Addi,
    Mnemonic::Beq,
    Mnemonic::Bne,
    Mnemonic::Jump,
  ];

  /// Assembler spelling, also the key into the opcode table.
  pub fn as_str(self) -> &'static str {
    match self {
      Mnemonic::Load => "lw",
      Mnemonic::Store => "sw",
      Mnemonic::Move => "move",
      Mnemonic::Add => "add",
      Mnemonic::Sub => "sub",
      Mnemonic::Mul => "mul",
      Mnemonic::Div => "div",
      Mnemonic::Addi => "addi",
      Mnemonic::Beq => "beq",
      Mnemonic::Bne => "bne",
      Mnemonic::Jump => "j",
    }
  }

  /// Case-insensitive lookup by assembler spelling.
  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|mn| mn.as_str().eq_ignore_ascii_case(name))
  }

  pub fn for_op(op: BinOp) -> Self {
    match op {
      BinOp::Add => Mnemonic::Add,
      BinOp::Sub => Mnemonic::Sub,
      BinOp::Mul => Mnemonic::Mul,
      BinOp::Div => Mnemonic::Div,
    }
  }
}

impl fmt::Display for Mnemonic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Operand {
  Register(Register),
  Immediate(i64),
  /// A memory-backed variable, or a `offset($base)` address in a hand-written listing.
  Memory(String),
}

impl Operand {
  pub fn as_register(&self) -> Option<Register> {
    match self {
      Operand::Register(reg) => Some(*reg),
      _ => None,
    }
  }
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operand::Register(reg) => write!(f, "{reg}"),
      Operand::Immediate(value) => write!(f, "{value}"),
      Operand::Memory(name) => f.write_str(name),
    }
  }
}

/// One emitted instruction. The order of a `Vec<Instruction>` is execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
  pub mnemonic: Mnemonic,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub destination: Option<Operand>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_a: Option<Operand>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_b: Option<Operand>,
  pub comment: String,
}

impl Instruction {
  pub fn load(dest: Register, name: &str) -> Self {
    Self {
      mnemonic: Mnemonic::Load,
      destination: Some(Operand::Register(dest)),
      source_a: Some(Operand::Memory(name.to_string())),
      source_b: None,
      comment: format!("load {name}"),
    }
  }

  pub fn store(value: Operand, name: &str) -> Self {
    Self {
      mnemonic: Mnemonic::Store,
      destination: Some(Operand::Memory(name.to_string())),
      source_a: Some(value),
      source_b: None,
      comment: format!("store {name}"),
    }
  }

  pub fn mov(dest: Register, value: Operand) -> Self {
    Self {
      mnemonic: Mnemonic::Move,
      destination: Some(Operand::Register(dest)),
      source_a: Some(value),
      source_b: None,
      comment: format!("move to {dest}"),
    }
  }

  pub fn arith(op: BinOp, dest: Register, lhs: Operand, rhs: Operand, comment: String) -> Self {
    Self {
      mnemonic: Mnemonic::for_op(op),
      destination: Some(Operand::Register(dest)),
      source_a: Some(lhs),
      source_b: Some(rhs),
      comment,
    }
  }

  /// Operands in the order an assembler writes them. Stores put the value
  /// first and branches put the target last.
  pub fn assembler_operands(&self) -> Vec<&Operand> {
    let order = match self.mnemonic {
      Mnemonic::Store => [&self.source_a, &self.destination, &self.source_b],
      Mnemonic::Beq | Mnemonic::Bne => [&self.source_a, &self.source_b, &self.destination],
      _ => [&self.destination, &self.source_a, &self.source_b],
    };
    order.into_iter().flatten().collect()
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.mnemonic.as_str().to_uppercase())?;
    for (i, operand) in self.assembler_operands().into_iter().enumerate() {
      let sep = if i == 0 { " " } else { ", " };
      write!(f, "{sep}{operand}")?;
    }
    if !self.comment.is_empty() {
      write!(f, " # {}", self.comment)?;
    }
    Ok(())
  }
}

/// Render a whole program, one instruction per line.
pub fn render(program: &[Instruction]) -> String {
  program
    .iter()
    .map(|instr| format!("{instr}\n"))
    .collect()
}
