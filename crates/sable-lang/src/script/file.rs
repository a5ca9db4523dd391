//! Line-oriented script files.
//!
//! ```text
//! int limit = 10          // global preamble
//!
//! Clamp(int x):
//! x > limit ? limit : x
//! ```
//!
//! A right-trimmed line ending in `:` (and not a `//` comment) starts a new
//! section. Every other line is appended to the current section's text, which
//! is parsed as a whole when the next header or the end of input arrives.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::PreamblePolicy;
use crate::error::Error;

use super::{Registry, ScriptError};

/// Called with the header line and its 1-based line number.
pub type NewScriptHook = Box<dyn FnMut(&str, usize)>;

enum Target {
    Global,
    Named(String),
}

/// Reader state between lines.
enum Section {
    /// No script receives lines. `preamble` is set before the first header.
    Idle { preamble: bool },
    Collecting { target: Target, text: String, start_line: usize },
}

pub struct ScriptFile {
    registry: Registry,
    on_new_script: Option<NewScriptHook>,
}

impl ScriptFile {
    pub fn new(registry: Registry) -> Self {
        Self { registry, on_new_script: None }
    }

    pub fn on_new_script(mut self, hook: impl FnMut(&str, usize) + 'static) -> Self {
        self.on_new_script = Some(Box::new(hook));
        self
    }

    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn registry_mut(&mut self) -> &mut Registry { &mut self.registry }
    pub fn into_registry(self) -> Registry { self.registry }

    /// Reads `path`, stopping at the first error.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        let reader = self.open(path.as_ref())?;
        self.read(reader)
    }

    pub fn read(&mut self, reader: impl BufRead) -> Result<(), ScriptError> {
        self.read_lines(reader, &mut |e| Err(e.into()))
    }

    pub fn read_str(&mut self, text: &str) -> Result<(), ScriptError> {
        self.read(text.as_bytes())
    }

    /// Like `read_file`, but a parse error only loses the section it occurs
    /// in. Returns every parse error in file order.
    pub fn check_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<Error>, ScriptError> {
        let reader = self.open(path.as_ref())?;
        self.check(reader)
    }

    pub fn check(&mut self, reader: impl BufRead) -> Result<Vec<Error>, ScriptError> {
        let mut errors = Vec::new();
        self.read_lines(reader, &mut |e| {
            errors.push(e);
            Ok(())
        })?;
        Ok(errors)
    }

    fn open(&self, path: &Path) -> Result<BufReader<File>, ScriptError> {
        let file = File::open(path)
            .map_err(|e| ScriptError::Io { path: path.display().to_string(), source: e })?;
        tracing::debug!(path = %path.display(), "reading script file");
        Ok(BufReader::new(file))
    }

    // ─── Reader ──────────────────────────────────────────────────────────────

    fn read_lines(
        &mut self,
        reader: impl BufRead,
        sink: &mut dyn FnMut(Error) -> Result<(), ScriptError>,
    ) -> Result<(), ScriptError> {
        let mut state = match self.registry.config().preamble {
            PreamblePolicy::Global => Section::Collecting {
                target: Target::Global,
                text: String::new(),
                start_line: 1,
            },
            PreamblePolicy::Ignore | PreamblePolicy::Error => Section::Idle { preamble: true },
        };

        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|e| ScriptError::Io { path: self.registry.source().to_string(), source: e })?;
            let line = line.trim_end();

            if is_header(line) {
                let finished = std::mem::replace(&mut state, Section::Idle { preamble: false });
                self.flush(finished, sink)?;
                state = self.open_section(line, line_no, sink)?;
                continue;
            }

            match &mut state {
                Section::Collecting { text, .. } => {
                    text.push_str(line);
                    text.push('\n');
                }
                Section::Idle { preamble: true } => self.preamble_line(line, line_no)?,
                Section::Idle { preamble: false } => {}
            }
        }

        self.flush(state, sink)
    }

    fn preamble_line(&self, line: &str, line_no: usize) -> Result<(), ScriptError> {
        let content = line.trim_start();
        if content.is_empty() || content.starts_with("//") {
            return Ok(());
        }
        match self.registry.config().preamble {
            PreamblePolicy::Error => Err(ScriptError::Preamble { line: line_no }),
            _ => {
                tracing::warn!(line = line_no, "ignoring text before the first section header");
                Ok(())
            }
        }
    }

    fn open_section(
        &mut self,
        line: &str,
        line_no: usize,
        sink: &mut dyn FnMut(Error) -> Result<(), ScriptError>,
    ) -> Result<Section, ScriptError> {
        if let Some(hook) = self.on_new_script.as_mut() {
            hook(line, line_no);
        }

        let mut script = self.registry.create("");
        let mut header_line = line_no;
        if let Err(e) = script.set_header(line, &mut header_line) {
            sink(e)?;
            return Ok(Section::Idle { preamble: false });
        }

        let name = script.name().to_string();
        self.registry.add(script)?;
        Ok(Section::Collecting { target: Target::Named(name), text: String::new(), start_line: line_no + 1 })
    }

    /// Parses the collected text into its script. Runs on every header and at
    /// end of input.
    fn flush(
        &mut self,
        section: Section,
        sink: &mut dyn FnMut(Error) -> Result<(), ScriptError>,
    ) -> Result<(), ScriptError> {
        let Section::Collecting { target, text, start_line } = section else {
            return Ok(());
        };
        if text.trim().is_empty() {
            return Ok(());
        }
        let script = match &target {
            Target::Global => Some(self.registry.global_mut()),
            Target::Named(name) => self.registry.get_mut(name),
        };
        let Some(script) = script else { return Ok(()) };

        let mut line = start_line;
        match script.add_statements(&text, &mut line) {
            Ok(n) => {
                tracing::trace!(script = %script.name(), statements = n, first_line = start_line, "parsed section");
                Ok(())
            }
            Err(e) => sink(e),
        }
    }
}

fn is_header(line: &str) -> bool {
    line.ends_with(':') && !line.trim_start().starts_with("//")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::error::ErrorCode;

    fn registry(policy: PreamblePolicy) -> Registry {
        Registry::with_config(EngineConfig { preamble: policy, ..EngineConfig::default() }, "test.sbl")
    }

    #[test]
    fn headers_split_sections() {
        let mut f = ScriptFile::new(registry(PreamblePolicy::Global));
        f.read_str("int g = 1\n\nFoo:\ng + 1\n\nBar(int x):\n// comment:\nx\n").unwrap();
        let r = f.registry();
        assert_eq!(r.names(), vec!["Foo", "Bar"]);
        assert_eq!(r.global().statements().len(), 1);
        assert_eq!(r.get("Bar").map(|s| s.statements().len()), Some(1));
    }

    #[test]
    fn last_section_is_flushed_without_trailing_newline() {
        let mut f = ScriptFile::new(Registry::new());
        f.read_str("A:\n1\nB:\n2").unwrap();
        assert_eq!(f.registry().get("B").map(|s| s.statements().len()), Some(1));
    }

    #[test]
    fn hook_sees_header_lines() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut f = ScriptFile::new(Registry::new())
            .on_new_script(move |line, n| log.borrow_mut().push((line.to_string(), n)));
        f.read_str("x:\n\n  y(int a):   \n").unwrap();
        assert_eq!(*seen.borrow(), vec![("x:".to_string(), 1), ("  y(int a):".to_string(), 3)]);
    }

    #[test]
    fn ignore_policy_drops_preamble() {
        let mut f = ScriptFile::new(registry(PreamblePolicy::Ignore));
        f.read_str("int g = 1\nMain:\n2\n").unwrap();
        assert!(f.registry().global().statements().is_empty());
    }

    #[test]
    fn error_policy_rejects_preamble() {
        let mut f = ScriptFile::new(registry(PreamblePolicy::Error));
        f.read_str("// fine\n\nMain:\n2\n").unwrap();

        let mut f = ScriptFile::new(registry(PreamblePolicy::Error));
        let err = f.read_str("// fine\nint g\nMain:\n").unwrap_err();
        assert!(matches!(err, ScriptError::Preamble { line: 2 }));
    }

    #[test]
    fn body_errors_use_file_lines() {
        let mut f = ScriptFile::new(Registry::new());
        let err = f.read_str("int g\n\nFoo:\ng = 1\ng = = 2\n").unwrap_err();
        let ScriptError::Parse(e) = err else { panic!("expected parse error, got {err:?}") };
        assert_eq!(e.line(), 5);
        assert_eq!(e.span.source.as_ref(), "<memory>");
    }

    #[test]
    fn check_keeps_going() {
        let mut f = ScriptFile::new(Registry::new());
        let errors = f.check("A:\n1 + )\nB(int:\nC:\nnope\nD:\n4\n".as_bytes()).unwrap();
        let codes: Vec<(ErrorCode, usize)> = errors.iter().map(|e| (e.code, e.line())).collect();
        assert_eq!(codes, vec![(ErrorCode::P001, 2), (ErrorCode::P002, 3), (ErrorCode::P005, 5)]);
        assert_eq!(f.registry().names(), vec!["A", "C", "D"]);
        assert_eq!(f.registry().get("D").map(|s| s.statements().len()), Some(1));
    }

    #[test]
    fn duplicate_sections_fail() {
        let mut f = ScriptFile::new(Registry::new());
        assert!(matches!(f.read_str("A:\nA:\n"), Err(ScriptError::DuplicateScript(_))));
    }
}
