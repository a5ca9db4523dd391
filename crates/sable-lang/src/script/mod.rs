//! Scripts and the registry that owns them.
//!
//! A file holds one global script plus any number of named sections. Every
//! section's scope is a child of the global scope, so top-of-file
//! declarations are visible everywhere while a section's own declarations
//! never leak back.

pub mod file;

use std::io;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::error::{self, ErrorCode, RuntimeError};
use crate::runtime::context::Context;
use crate::runtime::scope::{ContextScope, ScopeRef};
use crate::runtime::value::Val;
use crate::syntax::ast::{Header, Span, Stmt};
use crate::syntax::parser::{Lint, parse_header, parse_statements};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script `{0}` is already registered")]
    DuplicateScript(String),

    #[error("no script named `{0}`")]
    UnknownScript(String),

    #[error("line {line}: statements before the first section header are not allowed")]
    Preamble { line: usize },

    #[error("cannot read {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error(transparent)]
    Parse(#[from] error::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

// ─── Script ──────────────────────────────────────────────────────────────────

/// A named, independently parsed and runnable statement list.
pub struct Script {
    name: String,
    /// Opaque prefix written before the header name (`^Base:`).
    marker: String,
    source: String,
    scope: ScopeRef,
    header: Option<Header>,
    statements: Vec<Stmt>,
    lints: Vec<Lint>,
}

impl Script {
    pub fn new(name: &str, scope: ScopeRef, source: &str) -> Self {
        Self {
            name: name.to_string(),
            marker: String::new(),
            source: source.to_string(),
            scope,
            header: None,
            statements: Vec::new(),
            lints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn marker(&self) -> &str { &self.marker }
    pub fn source(&self) -> &str { &self.source }
    pub fn scope(&self) -> &ScopeRef { &self.scope }
    pub fn header(&self) -> Option<&Header> { self.header.as_ref() }
    pub fn statements(&self) -> &[Stmt] { &self.statements }
    pub fn lints(&self) -> &[Lint] { &self.lints }

    /// Parses every statement in `text` and appends them. When parsing fails
    /// nothing is appended and declarations made by `text` are dropped again.
    pub fn add_statements(&mut self, text: &str, line: &mut usize) -> Result<usize, error::Error> {
        let mut lints = Vec::new();
        let declared = self.scope.borrow().names();
        let stmts = parse_statements(&self.scope, &self.source, text, line, Some(&mut lints))
            .inspect_err(|_| self.scope.borrow_mut().retain_names(&declared))?;
        let added = stmts.len();
        self.statements.extend(stmts);
        self.lints.extend(lints);
        Ok(added)
    }

    /// Parses `name(params):` and declares the parameters in this script's
    /// scope. The script takes the header's name, keeping any leading marker.
    pub fn set_header(&mut self, text: &str, line: &mut usize) -> Result<&Header, error::Error> {
        let (marker, padded) = split_marker(text);
        let mut lints = Vec::new();
        let declared = self.scope.borrow().names();
        let header = parse_header(&self.scope, &self.source, &padded, line, Some(&mut lints))
            .inspect_err(|_| self.scope.borrow_mut().retain_names(&declared))?;
        self.name = format!("{marker}{}", header.name);
        self.marker = marker;
        self.lints.extend(lints);
        Ok(self.header.insert(header))
    }

    pub fn run(&self, ctx: &mut Context) -> Result<Val, RuntimeError> {
        tracing::trace!(script = %self.name, statements = self.statements.len(), "run");
        let mut ret = Val::NULL;
        for stmt in &self.statements {
            if stmt.evaluate(ctx, &mut ret)? {
                break;
            }
        }
        Ok(ret)
    }

    /// Binds header parameters to `args`, converted to their declared types,
    /// then runs.
    pub fn run_with(&self, ctx: &mut Context, args: &[Val]) -> Result<Val, RuntimeError> {
        let params = self.header.as_ref().map_or(&[][..], |h| h.params.as_slice());
        let span = self.header.as_ref()
            .map(|h| h.span.clone())
            .unwrap_or_else(|| Span::new(self.source.as_str().into(), 1, 1));
        if params.len() != args.len() {
            return Err(RuntimeError::new(ErrorCode::E005, span, format!(
                "`{}` takes {} argument(s), got {}", self.name, params.len(), args.len()
            )));
        }
        for (param, arg) in params.iter().zip(args) {
            ctx.assign(param, arg.clone()).map_err(|e| RuntimeError::new(
                e.code(),
                span.clone(),
                format!("argument `{}`: {e}", param.name),
            ))?;
        }
        self.run(ctx)
    }

    /// The body as source text, one statement per line.
    pub fn write(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            stmt.write(&mut out, 0);
            out.push('\n');
        }
        out
    }

    /// Drops statements, header and local declarations. Parent scopes are
    /// untouched.
    pub fn clear(&mut self) {
        self.statements.clear();
        self.header = None;
        self.lints.clear();
        self.scope.borrow_mut().clear();
    }
}

/// Splits an opaque prefix such as `^` or `@` off a header line. The prefix is
/// replaced by spaces so columns still line up with the file.
fn split_marker(text: &str) -> (String, String) {
    let body = text.trim_start();
    let indent = text.len() - body.len();
    let end = body
        .find(|c: char| c.is_alphanumeric() || c == '_' || c.is_whitespace())
        .unwrap_or(body.len());
    let marker = &body[..end];
    let padding = " ".repeat(text[..indent].chars().count() + marker.chars().count());
    (marker.to_string(), format!("{padding}{}", &body[end..]))
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Every script of one file, in the order they were added.
pub struct Registry {
    config: EngineConfig,
    source: String,
    global: Script,
    scripts: Vec<Script>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), "<memory>")
    }

    /// `source` names the file in diagnostics.
    pub fn with_config(config: EngineConfig, source: &str) -> Self {
        let global = Script::new(&config.global_name, ContextScope::root(), source);
        Self { config, source: source.to_string(), global, scripts: Vec::new() }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn source(&self) -> &str { &self.source }
    pub fn global(&self) -> &Script { &self.global }
    pub fn global_mut(&mut self) -> &mut Script { &mut self.global }

    /// A detached script whose scope extends the global scope.
    pub fn create(&self, name: &str) -> Script {
        Script::new(name, ContextScope::child(self.global.scope()), &self.source)
    }

    pub fn add(&mut self, script: Script) -> Result<&mut Script, ScriptError> {
        if script.name() == self.global.name() || self.get(script.name()).is_some() {
            return Err(ScriptError::DuplicateScript(script.name().to_string()));
        }
        tracing::debug!(script = %script.name(), statements = script.statements().len(), "registered script");
        let index = self.scripts.len();
        self.scripts.push(script);
        Ok(&mut self.scripts[index])
    }

    /// Named scripts only; the global script is reached through `global()`.
    pub fn get(&self, name: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Script> {
        self.scripts.iter_mut().find(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scripts.iter().map(|s| s.name()).collect()
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Runs the named section with `args` bound to its parameters.
    pub fn run(&self, name: &str, ctx: &mut Context, args: &[Val]) -> Result<Val, ScriptError> {
        let script = self.get(name).ok_or_else(|| ScriptError::UnknownScript(name.to_string()))?;
        Ok(script.run_with(ctx, args)?)
    }

    /// The whole file as text: global body, then each section's header and
    /// body.
    pub fn write(&self) -> String {
        let mut out = self.global.write();
        for script in &self.scripts {
            if !out.is_empty() {
                out.push('\n');
            }
            if let Some(header) = script.header() {
                out.push_str(script.marker());
                header.write(&mut out);
                out.push('\n');
            }
            out.push_str(&script.write());
        }
        out
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
