//! The MIPS register file: 32 named registers addressed by a 5-bit index.

use std::fmt;

use serde::{Serialize, Serializer};

const NAMES: [&str; 32] = [
  "$zero", "$at", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4",
  "$t5", "$t6", "$t7", "$s0", "$s1", "$s2", "$s3", "$s4", "$s5", "$s6", "$s7", "$t8", "$t9",
  "$k0", "$k1", "$gp", "$sp", "$fp", "$ra",
];

/// One architectural register, stored as its numeric index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(u8);

impl Register {
  pub const ZERO: Register = Register(0);

  /// Scratch registers handed out by the allocator, in allocation order.
  pub const TEMPORARIES: [Register; 10] = [
    Register(8),
    Register(9),
    Register(10),
    Register(11),
    Register(12),
    Register(13),
    Register(14),
    Register(15),
    Register(24),
    Register(25),
  ];

  /// Look up a register by its assembler name, sigil included (`$t0`).
  pub fn from_name(name: &str) -> Option<Self> {
    NAMES
      .iter()
      .position(|candidate| *candidate == name)
      .map(|index| Register(index as u8))
  }

  pub fn name(self) -> &'static str {
    NAMES[usize::from(self.0)]
  }

  pub fn number(self) -> u8 {
    self.0
  }

  pub fn is_temporary(self) -> bool {
    Self::TEMPORARIES.contains(&self)
  }
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl Serialize for Register {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}
