//! Shared error type used across the compilation pipeline.
//!
//! Lexical and parenthesis errors are anchored at a byte offset in the
//! source and render the offending line with a caret underneath, the same
//! way a C compiler front end reports them. Generator errors carry no
//! location because the postfix form has already lost it.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{expr_line}\n{marker} {message}"))]
  Lexical {
    expr_line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("{expr_line}\n{marker} unbalanced parenthesis"))]
  UnbalancedParen { expr_line: String, marker: String },

  #[snafu(display("operator '{op}' is missing an operand"))]
  MissingOperand { op: char },

  #[snafu(display("cannot assign to '{target}'"))]
  InvalidAssignmentTarget { target: String },

  #[snafu(display("cannot bind '{name}' to '{register}': not a register"))]
  InvalidBinding { name: String, register: String },

  #[snafu(display("no free temporary registers ($t0-$t9)"))]
  RegisterPoolExhausted,

  #[snafu(display("immediate {value} out of {bits}-bit range"))]
  ImmediateOutOfRange { value: i64, bits: u8 },
}

impl CompileError {
  /// Construct a lexical error anchored at a specific byte offset in the source.
  pub fn at(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    let (expr_line, marker) = caret(expr, loc);
    Self::Lexical {
      expr_line,
      marker,
      message: message.into(),
    }
  }

  /// Parenthesis that has no partner, reported under strict translation.
  pub fn unbalanced_paren(expr: &str, loc: usize) -> Self {
    let (expr_line, marker) = caret(expr, loc);
    Self::UnbalancedParen { expr_line, marker }
  }
}

fn caret(expr: &str, loc: usize) -> (String, String) {
  let expr_line = format!("'{expr}'");
  let safe_loc = loc.min(expr.len());
  let char_offset = expr[..safe_loc].chars().count() + 1; // account for opening quote
  let marker = format!("{}^", " ".repeat(char_offset));
  (expr_line, marker)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lexical_error_points_at_offending_byte() {
    let err = CompileError::at("a # b", 2, "invalid token: '#'");
    assert_eq!(err.to_string(), "'a # b'\n   ^ invalid token: '#'");
  }

  #[test]
  fn caret_clamps_past_end_of_input() {
    let err = CompileError::unbalanced_paren("(a", 10);
    assert_eq!(err.to_string(), "'(a'\n   ^ unbalanced parenthesis");
  }

  #[test]
  fn pool_exhaustion_names_the_resource() {
    let err = CompileError::RegisterPoolExhausted;
    assert!(err.to_string().contains("no free temporary registers"));
  }
}
