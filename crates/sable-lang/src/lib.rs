pub mod syntax;
pub mod types;
pub mod runtime;
pub mod functions;
pub mod script;
pub mod config;
pub mod error;

pub use config::{ConfigError, EngineConfig, PreamblePolicy};
pub use error::{Error, ErrorCode, RuntimeError};
pub use functions::{CallError, FunctionRegistry, Library};
pub use runtime::context::Context;
pub use runtime::scope::{ContextScope, ScopeRef, Variable};
pub use runtime::value::{Array, Val, ValError};
pub use script::file::ScriptFile;
pub use script::{Registry, Script, ScriptError};
pub use syntax::parser::{Lint, LintKind, parse_expression, parse_header, parse_statement, parse_statements};
pub use syntax::token::{Token, TokenKind};
pub use types::val_type::{ScalarType, ValType};

use std::path::Path;

// ─── Public API ───────────────────────────────────────────────────────────────

/// Reads a script file into a registry. The path names the source in every
/// diagnostic.
pub fn load(path: impl AsRef<Path>, config: EngineConfig) -> Result<Registry, ScriptError> {
    let path = path.as_ref();
    let mut file = ScriptFile::new(Registry::with_config(config, &path.display().to_string()));
    file.read_file(path)?;
    Ok(file.into_registry())
}

/// Same as [`load`] for text already in memory.
pub fn load_str(source: &str, text: &str, config: EngineConfig) -> Result<Registry, ScriptError> {
    let mut file = ScriptFile::new(Registry::with_config(config, source));
    file.read_str(text)?;
    Ok(file.into_registry())
}

/// Parses and evaluates a standalone expression. Only host functions are
/// visible; there are no variables.
pub fn eval(text: &str, ctx: &mut Context) -> Result<Val, ScriptError> {
    let expr = parse_expression(&ContextScope::root(), "<eval>", text, None)?;
    Ok(expr.evaluate(ctx)?)
}
