//! Crate root: wires together the expression compiler pipeline.
//!
//! The stages are small and run strictly forward:
//! - `tokenizer` classifies the raw text into a flat token stream.
//! - `postfix` reorders tokens into postfix with the shunting-yard algorithm.
//! - `codegen` walks the postfix form and emits instruction records,
//!   allocating temporaries from a ten-register pool.
//! - `instruction` and `encode` describe and display those records.
//! - `listing` reads hand-written assembly back into records.
//! - `config` loads compiler options and manual register bindings.
//! - `error` holds the error type shared by every stage.

pub mod codegen;
pub mod config;
pub mod encode;
pub mod error;
pub mod instruction;
pub mod listing;
pub mod postfix;
pub mod register;
pub mod tokenizer;

use tracing::debug;

pub use codegen::{Bindings, GeneratorOptions};
pub use config::{CompilerConfig, Config, ConfigError};
pub use error::{CompileError, CompileResult};
pub use instruction::{Instruction, Mnemonic, Operand};
pub use postfix::ParenPolicy;
pub use register::Register;

/// Compile one expression with default options and no manual bindings.
pub fn compile(expr: &str) -> CompileResult<Vec<Instruction>> {
  compile_with(expr, &Bindings::new(), &CompilerConfig::default())
}

/// Compile one expression, honouring `bindings` before any temporary is allocated.
pub fn compile_with(
  expr: &str,
  bindings: &Bindings,
  options: &CompilerConfig,
) -> CompileResult<Vec<Instruction>> {
  let tokens = tokenizer::tokenize(expr)?;
  let postfix = postfix::to_postfix(tokens, expr, options.paren_policy)?;
  codegen::generate(&postfix, bindings, options.generator_options())
}

/// Compile an expression, or read the text back as a listing when it already is one.
pub fn translate(
  text: &str,
  bindings: &Bindings,
  options: &CompilerConfig,
) -> CompileResult<Vec<Instruction>> {
  if listing::looks_like_listing(text) {
    debug!("input is an assembly listing");
    return listing::parse_listing(text);
  }
  compile_with(text, bindings, options)
}
