//! Project configuration loaded from `mips-expr.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::codegen::{Bindings, GeneratorOptions};
use crate::error::CompileError;
use crate::postfix::ParenPolicy;

pub const CONFIG_FILE_NAME: &str = "mips-expr.toml";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
  #[snafu(display("failed to read config file {}: {source}", path.display()))]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("failed to parse config file {}: {source}", path.display()))]
  Parse {
    path: PathBuf,
    source: toml::de::Error,
  },

  #[snafu(display("invalid [bindings] entry: {source}"))]
  Binding { source: CompileError },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root of `mips-expr.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub compiler: CompilerConfig,

  /// Manual variable to register assignments, e.g. `a = "$s0"`.
  #[serde(default)]
  pub bindings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
  #[serde(default)]
  pub paren_policy: ParenPolicy,

  #[serde(default = "default_true")]
  pub reserve_source_registers: bool,
}

fn default_true() -> bool {
  true
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self {
      paren_policy: ParenPolicy::default(),
      reserve_source_registers: true,
    }
  }
}

impl CompilerConfig {
  pub fn generator_options(&self) -> GeneratorOptions {
    GeneratorOptions {
      reserve_source_registers: self.reserve_source_registers,
    }
  }
}

impl Config {
  pub fn load(path: &Path) -> ConfigResult<Self> {
    let content = std::fs::read_to_string(path).context(ReadSnafu { path })?;
    let config = toml::from_str(&content).context(ParseSnafu { path })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
  }

  /// Search `start_dir` and its parents for a config file; defaults if none exists.
  pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
    for dir in start_dir.ancestors() {
      let candidate = dir.join(CONFIG_FILE_NAME);
      if candidate.is_file() {
        return Self::load(&candidate);
      }
    }
    Ok(Self::default())
  }

  /// Resolve `[bindings]` into registers.
  pub fn bindings(&self) -> ConfigResult<Bindings> {
    let mut bindings = Bindings::new();
    for (name, register) in &self.bindings {
      bindings.bind(name, register).context(BindingSnafu)?;
    }
    Ok(bindings)
  }
}
