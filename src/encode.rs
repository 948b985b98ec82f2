//! Machine-word breakdown of an instruction record, for display.
//!
//! Symbolic operands have no address yet, so a variable name encodes as
//! base register 0 with a zero offset, and an immediate in a register slot
//! encodes as `$zero`. Immediates that do not fit their field are errors.

use std::fmt;

use serde::Serialize;

use crate::error::{CompileResult, ImmediateOutOfRangeSnafu};
use crate::instruction::{Instruction, Mnemonic, Operand};
use crate::register::Register;

/// Largest value the 26-bit jump target field holds.
pub const ADDRESS_MAX: i64 = (1 << 26) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Format {
  R,
  I,
  J,
}

/// Format, opcode and funct for each mnemonic.
pub fn opcode_table(mnemonic: Mnemonic) -> (Format, u8, u8) {
  match mnemonic {
    Mnemonic::Add => (Format::R, 0b000000, 0b100000),
    Mnemonic::Sub => (Format::R, 0b000000, 0b100010),
    Mnemonic::Mul => (Format::R, 0b000000, 0b011000),
    Mnemonic::Div => (Format::R, 0b000000, 0b011010),
    Mnemonic::Move => (Format::R, 0b000000, 0b100000),
    Mnemonic::Load => (Format::I, 0b100011, 0),
    Mnemonic::Store => (Format::I, 0b101011, 0),
    Mnemonic::Addi => (Format::I, 0b001000, 0),
    Mnemonic::Beq => (Format::I, 0b000100, 0),
    Mnemonic::Bne => (Format::I, 0b000101, 0),
    Mnemonic::Jump => (Format::J, 0b000010, 0),
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Encoding {
  pub format: Format,
  pub opcode: u8,
  pub rs: u8,
  pub rt: u8,
  pub rd: u8,
  pub shamt: u8,
  pub funct: u8,
  pub immediate: u16,
  pub address: u32,
}

impl Encoding {
  pub fn word(&self) -> u32 {
    let opcode = u32::from(self.opcode) << 26;
    let head = opcode | u32::from(self.rs) << 21 | u32::from(self.rt) << 16;
    match self.format {
      Format::R => {
        head
          | u32::from(self.rd) << 11
          | u32::from(self.shamt) << 6
          | u32::from(self.funct)
      }
      Format::I => head | u32::from(self.immediate),
      Format::J => opcode | self.address,
    }
  }

  /// Named fields with their widths, most significant first.
  pub fn fields(&self) -> Vec<(&'static str, usize, u32)> {
    let opcode = ("opcode", 6, u32::from(self.opcode));
    let registers = [
      ("rs", 5, u32::from(self.rs)),
      ("rt", 5, u32::from(self.rt)),
    ];
    match self.format {
      Format::R => {
        let mut fields = vec![opcode];
        fields.extend(registers);
        fields.extend([
          ("rd", 5, u32::from(self.rd)),
          ("shamt", 5, u32::from(self.shamt)),
          ("funct", 6, u32::from(self.funct)),
        ]);
        fields
      }
      Format::I => {
        let mut fields = vec![opcode];
        fields.extend(registers);
        fields.push(("immediate", 16, u32::from(self.immediate)));
        fields
      }
      Format::J => vec![opcode, ("address", 26, self.address)],
    }
  }
}

impl fmt::Display for Encoding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{:<10} {:>4}  binary", "field", "bits")?;
    for (name, width, value) in self.fields() {
      writeln!(f, "{name:<10} {width:>4}  {value:0width$b}")?;
    }
    write!(f, "machine code: {:032b}", self.word())
  }
}

/// True when `value` fits the 16-bit immediate field, signed or unsigned.
pub fn fits_immediate(value: i64) -> bool {
  (i64::from(i16::MIN)..=i64::from(u16::MAX)).contains(&value)
}

pub fn fits_address(value: i64) -> bool {
  (0..=ADDRESS_MAX).contains(&value)
}

/// Split a `offset($base)` address into its parts without range checking.
pub(crate) fn split_base_offset(text: &str) -> Option<(i64, Register)> {
  let (offset, base) = text.strip_suffix(')')?.split_once('(')?;
  let offset = if offset.is_empty() { 0 } else { offset.parse().ok()? };
  Some((offset, Register::from_name(base)?))
}

/// Split a `offset($base)` address whose offset fits the immediate field.
pub fn parse_base_offset(text: &str) -> Option<(i64, Register)> {
  split_base_offset(text).filter(|(offset, _)| fits_immediate(*offset))
}

fn immediate_bits(value: i64) -> CompileResult<u16> {
  if let Ok(signed) = i16::try_from(value) {
    return Ok(signed as u16);
  }
  u16::try_from(value).map_err(|_| ImmediateOutOfRangeSnafu { value, bits: 16u8 }.build())
}

fn address_bits(value: i64) -> CompileResult<u32> {
  u32::try_from(value)
    .ok()
    .filter(|_| fits_address(value))
    .ok_or_else(|| ImmediateOutOfRangeSnafu { value, bits: 26u8 }.build())
}

fn register_number(operand: Option<&Operand>) -> u8 {
  operand
    .and_then(Operand::as_register)
    .unwrap_or(Register::ZERO)
    .number()
}

fn immediate_of(operand: Option<&Operand>) -> CompileResult<u16> {
  match operand {
    Some(Operand::Immediate(value)) => immediate_bits(*value),
    _ => Ok(0),
  }
}

/// Compute the breakdown for one record.
pub fn encode(instr: &Instruction) -> CompileResult<Encoding> {
  let (format, opcode, funct) = opcode_table(instr.mnemonic);
  let mut encoding = Encoding {
    format,
    opcode,
    rs: 0,
    rt: 0,
    rd: 0,
    shamt: 0,
    funct,
    immediate: 0,
    address: 0,
  };
  let destination = instr.destination.as_ref();
  let source_a = instr.source_a.as_ref();
  let source_b = instr.source_b.as_ref();

  match instr.mnemonic {
    Mnemonic::Add | Mnemonic::Sub | Mnemonic::Mul | Mnemonic::Div | Mnemonic::Move => {
      encoding.rd = register_number(destination);
      encoding.rs = register_number(source_a);
      encoding.rt = register_number(source_b);
    }
    Mnemonic::Load | Mnemonic::Store => {
      let (value, address) = match instr.mnemonic {
        Mnemonic::Store => (source_a, destination),
        _ => (destination, source_a),
      };
      encoding.rt = register_number(value);
      match address {
        Some(Operand::Memory(text)) => {
          if let Some((offset, base)) = split_base_offset(text) {
            encoding.immediate = immediate_bits(offset)?;
            encoding.rs = base.number();
          }
        }
        Some(Operand::Immediate(value)) => encoding.immediate = immediate_bits(*value)?,
        Some(Operand::Register(reg)) => encoding.rs = reg.number(),
        None => {}
      }
    }
    Mnemonic::Addi => {
      encoding.rt = register_number(destination);
      encoding.rs = register_number(source_a);
      encoding.immediate = immediate_of(source_b)?;
    }
    Mnemonic::Beq | Mnemonic::Bne => {
      encoding.rs = register_number(source_a);
      encoding.rt = register_number(source_b);
      encoding.immediate = immediate_of(destination)?;
    }
    Mnemonic::Jump => {
      if let Some(Operand::Immediate(target)) = destination {
        encoding.address = address_bits(*target)?;
      }
    }
  }

  Ok(encoding)
}
