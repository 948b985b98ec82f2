//! Infix to postfix translation (shunting-yard).
//!
//! `*` and `/` bind tighter than `+` and `-`; all four are left-associative.
//! `=` is the loosest operator and right-associative, so an assignment is
//! emitted as a trailing marker once both of its operands are in the output.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{BinOp, Token, TokenKind};

/// What to do with a parenthesis that has no partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParenPolicy {
  /// Drop the stray parenthesis and keep going.
  #[default]
  Lenient,
  /// Report `UnbalancedParen` at the stray parenthesis.
  Strict,
}

fn precedence(kind: &TokenKind) -> Option<u8> {
  match kind {
    TokenKind::Assign => Some(0),
    TokenKind::Op(BinOp::Add | BinOp::Sub) => Some(1),
    TokenKind::Op(BinOp::Mul | BinOp::Div) => Some(2),
    _ => None,
  }
}

/// Reorder `tokens` into postfix. The output never contains parentheses.
pub fn to_postfix(tokens: Vec<Token>, source: &str, policy: ParenPolicy) -> CompileResult<Vec<Token>> {
  let mut output = Vec::with_capacity(tokens.len());
  let mut ops: Vec<Token> = Vec::new();

  for token in tokens {
    if token.kind.is_operand() {
      output.push(token);
      continue;
    }

    match token.kind {
      TokenKind::Op(_) | TokenKind::Assign => {
        let incoming = precedence(&token.kind).unwrap_or_default();
        let right_assoc = token.kind == TokenKind::Assign;
        while let Some(top) = ops.last().and_then(|top| precedence(&top.kind)) {
          if top > incoming || (top == incoming && !right_assoc) {
            output.extend(ops.pop());
          } else {
            break;
          }
        }
        ops.push(token);
      }
      TokenKind::LParen => ops.push(token),
      TokenKind::RParen => {
        let mut matched = false;
        while let Some(top) = ops.pop() {
          if top.kind == TokenKind::LParen {
            matched = true;
            break;
          }
          output.push(top);
        }
        if !matched && policy == ParenPolicy::Strict {
          return Err(CompileError::unbalanced_paren(source, token.loc));
        }
      }
      TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Register(_) => {
        unreachable!("operands are pushed before the match")
      }
    }
  }

  while let Some(top) = ops.pop() {
    if top.kind == TokenKind::LParen {
      if policy == ParenPolicy::Strict {
        return Err(CompileError::unbalanced_paren(source, top.loc));
      }
      continue;
    }
    output.push(top);
  }

  debug!(len = output.len(), ?policy, "translated to postfix");
  Ok(output)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::{render_tokens, tokenize};

  fn rpn(source: &str, policy: ParenPolicy) -> CompileResult<String> {
    let tokens = tokenize(source)?;
    to_postfix(tokens, source, policy).map(|out| render_tokens(&out))
  }

  fn lenient(source: &str) -> String {
    rpn(source, ParenPolicy::Lenient).unwrap()
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    assert_eq!(lenient("a + b * c"), "a b c * +");
  }

  #[test]
  fn parentheses_override_precedence() {
    assert_eq!(lenient("(a + b) * c"), "a b + c *");
  }

  #[test]
  fn operators_are_left_associative() {
    assert_eq!(lenient("a - b - c"), "a b - c -");
    assert_eq!(lenient("a / b * c"), "a b / c *");
  }

  #[test]
  fn assignment_is_a_trailing_marker() {
    assert_eq!(lenient("x = a + b"), "x a b + =");
    assert_eq!(lenient("$t0 = a * (b - 2)"), "$t0 a b 2 - * =");
  }

  #[test]
  fn assignment_is_right_associative() {
    assert_eq!(lenient("a = b = c"), "a b c = =");
  }

  #[test]
  fn empty_input_is_not_an_error() {
    assert_eq!(lenient(""), "");
  }

  #[test]
  fn lenient_drops_unmatched_close_paren() {
    assert_eq!(lenient("a + b) * c"), "a b + c *");
  }

  #[test]
  fn lenient_drops_unmatched_open_paren() {
    assert_eq!(lenient("(a + b * c"), "a b c * +");
  }

  #[test]
  fn strict_rejects_unmatched_close_paren() {
    let err = rpn("a + b) * c", ParenPolicy::Strict).unwrap_err();
    assert!(matches!(err, CompileError::UnbalancedParen { .. }));
    assert_eq!(err.to_string(), "'a + b) * c'\n      ^ unbalanced parenthesis");
  }

  #[test]
  fn strict_rejects_unmatched_open_paren() {
    let err = rpn("((a + b)", ParenPolicy::Strict).unwrap_err();
    assert!(matches!(err, CompileError::UnbalancedParen { .. }));
  }

  #[test]
  fn strict_accepts_balanced_input() {
    assert_eq!(rpn("((a))", ParenPolicy::Strict).unwrap(), "a");
  }
}
