//! Hand-written assembly pass-through.
//!
//! Input whose first word is a known mnemonic is not compiled; each line is
//! read back into an `Instruction` so it can be rendered and broken down
//! like generated code.

use tracing::debug;

use crate::encode::{fits_address, fits_immediate, parse_base_offset, split_base_offset};
use crate::error::{CompileError, CompileResult};
use crate::instruction::{Instruction, Mnemonic, Operand};
use crate::register::Register;

/// True when the first word of `text` names a mnemonic and is not itself
/// the left operand of an expression such as `j = i + 1`.
pub fn looks_like_listing(text: &str) -> bool {
  let text = text.trim_start();
  let Some(name) = text.split_whitespace().next() else {
    return false;
  };
  Mnemonic::from_name(name).is_some()
    && !text[name.len()..]
      .trim_start()
      .starts_with(['=', '+', '-', '*', '/', ')'])
}

/// Parse one instruction per non-empty line.
pub fn parse_listing(text: &str) -> CompileResult<Vec<Instruction>> {
  let program = text
    .lines()
    .filter(|line| !line.trim().is_empty())
    .map(parse_line)
    .collect::<CompileResult<Vec<_>>>()?;
  debug!(count = program.len(), "parsed listing");
  Ok(program)
}

fn parse_line(line: &str) -> CompileResult<Instruction> {
  let (code, comment) = match line.split_once('#') {
    Some((code, comment)) => (code, comment.trim()),
    None => (line, ""),
  };

  let mut words = code
    .split(|c: char| c.is_whitespace() || c == ',')
    .filter(|word| !word.is_empty());
  let Some(name) = words.next() else {
    return Err(CompileError::at(line, 0, "expected a mnemonic"));
  };
  let mnemonic = Mnemonic::from_name(name).ok_or_else(|| {
    CompileError::at(line, offset_of(line, name), format!("unknown mnemonic '{name}'"))
  })?;

  let words: Vec<&str> = words.collect();
  let arity = match mnemonic {
    Mnemonic::Jump => 1,
    Mnemonic::Load | Mnemonic::Store | Mnemonic::Move => 2,
    _ => 3,
  };
  if words.len() != arity {
    return Err(CompileError::at(
      line,
      line.trim_end().len(),
      format!("'{name}' takes {arity} operands, found {}", words.len()),
    ));
  }

  let mut operands = Vec::with_capacity(arity);
  for (i, word) in words.iter().enumerate() {
    let operand = parse_operand(line, word)?;
    let is_target = match mnemonic {
      Mnemonic::Jump => true,
      Mnemonic::Beq | Mnemonic::Bne => i == 2,
      _ => false,
    };
    check_range(line, word, &operand, mnemonic, is_target)?;
    operands.push(operand);
  }

  let mut operands = operands.into_iter();
  let first = operands.next();
  let second = operands.next();
  let third = operands.next();
  let (destination, source_a, source_b) = match mnemonic {
    Mnemonic::Store => (second, first, third),
    Mnemonic::Beq | Mnemonic::Bne => (third, first, second),
    _ => (first, second, third),
  };

  Ok(Instruction {
    mnemonic,
    destination,
    source_a,
    source_b,
    comment: comment.to_string(),
  })
}

/// Branch and jump targets must be numbers; every immediate must fit its field.
fn check_range(
  line: &str,
  word: &str,
  operand: &Operand,
  mnemonic: Mnemonic,
  is_target: bool,
) -> CompileResult<()> {
  let at = offset_of(line, word);
  match operand {
    Operand::Immediate(value) if mnemonic == Mnemonic::Jump => {
      if !fits_address(*value) {
        return Err(CompileError::at(line, at, "jump target out of 26-bit range"));
      }
    }
    Operand::Immediate(value) => {
      if !fits_immediate(*value) {
        return Err(CompileError::at(line, at, "immediate out of 16-bit range"));
      }
    }
    _ if is_target => {
      return Err(CompileError::at(
        line,
        at,
        format!("'{}' needs a numeric target", mnemonic.as_str()),
      ));
    }
    _ => {}
  }
  Ok(())
}

fn parse_operand(line: &str, word: &str) -> CompileResult<Operand> {
  if word.starts_with('$') {
    return Register::from_name(word).map(Operand::Register).ok_or_else(|| {
      CompileError::at(line, offset_of(line, word), format!("unknown register '{word}'"))
    });
  }
  if let Ok(value) = word.parse::<i64>() {
    return Ok(Operand::Immediate(value));
  }
  let is_name = word
    .chars()
    .next()
    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
  if is_name {
    return Ok(Operand::Memory(word.to_string()));
  }
  if split_base_offset(word).is_some() {
    if parse_base_offset(word).is_none() {
      return Err(CompileError::at(
        line,
        offset_of(line, word),
        "offset out of 16-bit range",
      ));
    }
    return Ok(Operand::Memory(word.to_string()));
  }
  Err(CompileError::at(
    line,
    offset_of(line, word),
    format!("invalid operand '{word}'"),
  ))
}

fn offset_of(line: &str, word: &str) -> usize {
  line.find(word).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reg(name: &str) -> Register {
    Register::from_name(name).unwrap()
  }

  #[test]
  fn detects_listing_by_first_word() {
    assert!(looks_like_listing("  ADD $t0, $t1, $t2"));
    assert!(looks_like_listing("lw $t0, x"));
    assert!(!looks_like_listing("x = a + b"));
    assert!(!looks_like_listing("address + 1"));
    assert!(!looks_like_listing(""));
    assert!(looks_like_listing("j 1024"));
    assert!(!looks_like_listing("j = i + 1"));
    assert!(!looks_like_listing("add * 2"));
  }

  #[test]
  fn parses_each_line_in_order() {
    let program = parse_listing("lw $t0, a\n\nADD $t2, $t0, 4 # bump\nsw $t2, 8($sp)\n").unwrap();
    assert_eq!(program.len(), 3);
    assert_eq!(program[0].to_string(), "LW $t0, a");
    assert_eq!(program[1].to_string(), "ADD $t2, $t0, 4 # bump");
    assert_eq!(program[2].source_a, Some(Operand::Register(reg("$t2"))));
    assert_eq!(
      program[2].destination,
      Some(Operand::Memory("8($sp)".to_string()))
    );
  }

  #[test]
  fn listing_round_trips_generated_text() {
    let generated = vec![
      Instruction::load(reg("$t0"), "a"),
      Instruction::store(Operand::Register(reg("$t0")), "x"),
      Instruction::mov(reg("$s1"), Operand::Register(reg("$t0"))),
    ];
    let text = crate::instruction::render(&generated);
    assert_eq!(parse_listing(&text).unwrap(), generated);
  }

  #[test]
  fn rejects_unknown_mnemonic_on_later_line() {
    let err = parse_listing("add $t0, $t1, $t2\njal $t0, $t1, done").unwrap_err();
    assert!(err.to_string().contains("unknown mnemonic 'jal'"));
  }

  #[test]
  fn rejects_wrong_arity() {
    let err = parse_listing("sub $t0, $t1").unwrap_err();
    assert!(err.to_string().contains("'sub' takes 3 operands, found 2"));
  }

  #[test]
  fn rejects_bad_operands() {
    let err = parse_listing("move $t0, $q1").unwrap_err();
    assert!(err.to_string().contains("unknown register '$q1'"));
    let err = parse_listing("lw $t0, 4(x)").unwrap_err();
    assert!(err.to_string().contains("invalid operand '4(x)'"));
  }

  #[test]
  fn rejects_immediates_that_do_not_fit() {
    let err = parse_listing("lw $t0, 70000").unwrap_err();
    assert!(err.to_string().contains("immediate out of 16-bit range"));
    let err = parse_listing("lw $t1, 70000($sp)").unwrap_err();
    assert!(err.to_string().contains("offset out of 16-bit range"));
    let err = parse_listing("add $t0, $t1, -40000").unwrap_err();
    assert!(err.to_string().contains("immediate out of 16-bit range"));
    assert!(parse_listing("lw $t0, -32768($sp)\nadd $t0, $t1, 65535").is_ok());
  }

  #[test]
  fn parses_addi_with_immediate_last() {
    let program = parse_listing("addi $t0, $t1, -4").unwrap();
    assert_eq!(program[0].mnemonic, Mnemonic::Addi);
    assert_eq!(program[0].destination, Some(Operand::Register(reg("$t0"))));
    assert_eq!(program[0].source_b, Some(Operand::Immediate(-4)));
    assert_eq!(program[0].to_string(), "ADDI $t0, $t1, -4");
  }

  #[test]
  fn branches_keep_target_last() {
    let program = parse_listing("beq $t0, $t1, 3 # loop\nbne $s0, $zero, 12").unwrap();
    assert_eq!(program[0].source_a, Some(Operand::Register(reg("$t0"))));
    assert_eq!(program[0].source_b, Some(Operand::Register(reg("$t1"))));
    assert_eq!(program[0].destination, Some(Operand::Immediate(3)));
    assert_eq!(program[0].to_string(), "BEQ $t0, $t1, 3 # loop");
    assert_eq!(program[1].to_string(), "BNE $s0, $zero, 12");

    let err = parse_listing("beq $t0, $t1, done").unwrap_err();
    assert!(err.to_string().contains("'beq' needs a numeric target"));
  }

  #[test]
  fn jump_takes_one_numeric_target() {
    let program = parse_listing("j 1024").unwrap();
    assert_eq!(program[0].destination, Some(Operand::Immediate(1024)));
    assert_eq!(program[0].to_string(), "J 1024");

    let err = parse_listing("j $t0, 4").unwrap_err();
    assert!(err.to_string().contains("'j' takes 1 operands, found 2"));
    let err = parse_listing("j done").unwrap_err();
    assert!(err.to_string().contains("'j' needs a numeric target"));
    let err = parse_listing("j 67108864").unwrap_err();
    assert!(err.to_string().contains("jump target out of 26-bit range"));
  }
}
