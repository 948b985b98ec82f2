//! Code generation: walk the postfix sequence with an operand stack and emit
//! three-operand instruction records.
//!
//! Operands stay symbolic on the stack until an operator needs them; only
//! then are they loaded into registers. Temporaries come from a ten-slot
//! pool and are never released within one compilation, so every destination
//! register is distinct. All state lives in a `Generator` that is consumed by
//! a single run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{
  CompileResult, InvalidAssignmentTargetSnafu, InvalidBindingSnafu, MissingOperandSnafu,
  RegisterPoolExhaustedSnafu,
};
use crate::instruction::{Instruction, Operand};
use crate::register::Register;
use crate::tokenizer::{BinOp, Token, TokenKind};

/// Caller-supplied variable to register assignments, honoured before allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(BTreeMap<String, Register>);

impl Bindings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, reg: Register) {
    self.0.insert(name.into(), reg);
  }

  /// Bind `name` to the register spelled `register`, rejecting empty names
  /// and unknown registers.
  pub fn bind(&mut self, name: &str, register: &str) -> CompileResult<()> {
    let name = name.trim();
    let register = register.trim();
    match Register::from_name(register) {
      Some(reg) if !name.is_empty() => {
        self.insert(name, reg);
        Ok(())
      }
      _ => InvalidBindingSnafu { name, register }.fail(),
    }
  }

  /// Parse a `name=$reg` pair.
  pub fn parse_pair(pair: &str) -> CompileResult<(String, Register)> {
    let (name, register) = pair.split_once('=').unwrap_or((pair, ""));
    let name = name.trim();
    let register = register.trim();
    match Register::from_name(register) {
      Some(reg) if !name.is_empty() => Ok((name.to_string(), reg)),
      _ => InvalidBindingSnafu { name, register }.fail(),
    }
  }

  pub fn get(&self, name: &str) -> Option<Register> {
    self.0.get(name).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Register)> {
    self.0.iter().map(|(name, reg)| (name.as_str(), *reg))
  }
}

impl FromIterator<(String, Register)> for Bindings {
  fn from_iter<I: IntoIterator<Item = (String, Register)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl Extend<(String, Register)> for Bindings {
  fn extend<I: IntoIterator<Item = (String, Register)>>(&mut self, iter: I) {
    self.0.extend(iter);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
  /// Keep registers the expression names explicitly out of the temporary pool.
  pub reserve_source_registers: bool,
}

impl Default for GeneratorOptions {
  fn default() -> Self {
    Self {
      reserve_source_registers: true,
    }
  }
}

/// First-fit allocator over `$t0`-`$t9`. Nothing is ever freed.
#[derive(Debug, Default)]
pub struct TempPool {
  in_use: HashSet<Register>,
}

impl TempPool {
  /// Mark `reg` as taken. Registers outside the pool are accepted and ignored by `allocate`.
  pub fn reserve(&mut self, reg: Register) {
    self.in_use.insert(reg);
  }

  pub fn allocate(&mut self) -> CompileResult<Register> {
    let reg = Register::TEMPORARIES
      .into_iter()
      .find(|reg| !self.in_use.contains(reg))
      .ok_or_else(|| RegisterPoolExhaustedSnafu.build())?;
    self.in_use.insert(reg);
    trace!(%reg, "allocated temporary");
    Ok(reg)
  }

  pub fn free_count(&self) -> usize {
    Register::TEMPORARIES
      .iter()
      .filter(|reg| !self.in_use.contains(reg))
      .count()
  }
}

/// An entry on the operand stack.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
  Name(String),
  Int(i64),
  /// A register the source wrote explicitly.
  Register(Register),
  /// The destination of an earlier arithmetic instruction.
  Temp(Register),
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Name(name) => f.write_str(name),
      Value::Int(value) => write!(f, "{value}"),
      Value::Register(reg) | Value::Temp(reg) => write!(f, "{reg}"),
    }
  }
}

/// Per-compilation state: variable bindings, the temporary pool and the output.
#[derive(Debug)]
pub struct Generator {
  bindings: HashMap<String, Register>,
  pool: TempPool,
  options: GeneratorOptions,
  stack: Vec<Value>,
  code: Vec<Instruction>,
}

impl Generator {
  pub fn new(bindings: &Bindings, options: GeneratorOptions) -> Self {
    let mut pool = TempPool::default();
    for (_, reg) in bindings.iter() {
      pool.reserve(reg);
    }
    Self {
      bindings: bindings
        .iter()
        .map(|(name, reg)| (name.to_string(), reg))
        .collect(),
      pool,
      options,
      stack: Vec::new(),
      code: Vec::new(),
    }
  }

  /// Consume the postfix sequence and return the emitted program.
  pub fn run(mut self, postfix: &[Token]) -> CompileResult<Vec<Instruction>> {
    if self.options.reserve_source_registers {
      for token in postfix {
        if let TokenKind::Register(reg) = token.kind {
          self.pool.reserve(reg);
        }
      }
    }

    for token in postfix {
      match &token.kind {
        TokenKind::Ident(name) => self.stack.push(Value::Name(name.clone())),
        TokenKind::Int(value) => self.stack.push(Value::Int(*value)),
        TokenKind::Register(reg) => self.stack.push(Value::Register(*reg)),
        TokenKind::Op(op) => self.emit_binary(*op)?,
        TokenKind::Assign => self.emit_assign()?,
        TokenKind::LParen | TokenKind::RParen => {}
      }
    }

    debug!(
      count = self.code.len(),
      free = self.pool.free_count(),
      "generated instructions"
    );
    Ok(self.code)
  }

  fn pop(&mut self, op: char) -> CompileResult<Value> {
    self
      .stack
      .pop()
      .ok_or_else(|| MissingOperandSnafu { op }.build())
  }

  fn emit_binary(&mut self, op: BinOp) -> CompileResult<()> {
    let rhs = self.pop(op.symbol())?;
    let lhs = self.pop(op.symbol())?;
    let a = self.ensure_loaded(&lhs)?;
    let b = self.ensure_loaded(&rhs)?;
    let dest = self.pool.allocate()?;
    let comment = format!("{lhs} {} {rhs}", op.symbol());
    self.code.push(Instruction::arith(op, dest, a, b, comment));
    self.stack.push(Value::Temp(dest));
    Ok(())
  }

  fn emit_assign(&mut self) -> CompileResult<()> {
    let value = self.pop('=')?;
    let target = self.pop('=')?;
    let source = self.ensure_loaded(&value)?;

    match target {
      Value::Register(reg) => {
        self.code.push(Instruction::mov(reg, source));
        self.stack.push(Value::Register(reg));
      }
      Value::Name(name) => {
        self.code.push(Instruction::store(source.clone(), &name));
        if let Some(reg) = source.as_register() {
          trace!(%name, %reg, "rebound variable after store");
          self.bindings.insert(name.clone(), reg);
        }
        self.stack.push(Value::Name(name));
      }
      other => {
        return InvalidAssignmentTargetSnafu {
          target: other.to_string(),
        }
        .fail();
      }
    }
    Ok(())
  }

  /// Put `value` somewhere an instruction can read it, loading variables on first use.
  fn ensure_loaded(&mut self, value: &Value) -> CompileResult<Operand> {
    let name = match value {
      Value::Int(v) => return Ok(Operand::Immediate(*v)),
      Value::Register(reg) | Value::Temp(reg) => return Ok(Operand::Register(*reg)),
      Value::Name(name) => name,
    };

    if let Some(reg) = self.bindings.get(name) {
      return Ok(Operand::Register(*reg));
    }

    let reg = self.pool.allocate()?;
    self.code.push(Instruction::load(reg, name));
    self.bindings.insert(name.clone(), reg);
    trace!(%name, %reg, "bound variable");
    Ok(Operand::Register(reg))
  }
}

/// Generate code for one postfix sequence with a fresh generator.
pub fn generate(
  postfix: &[Token],
  bindings: &Bindings,
  options: GeneratorOptions,
) -> CompileResult<Vec<Instruction>> {
  Generator::new(bindings, options).run(postfix)
}
