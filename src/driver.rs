//! Batch compilation driver
//!
//! Parses every source unit with its own parser instance, runs the flow phase
//! and, when asked, binding resolution. Units are independent: a unit that
//! fails is reported on its own report and the batch carries on. An optional
//! [`CompilerAdapter`] observes each step.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::ast::CompilationUnit;
use crate::binding::{resolve_unit, Environment};
use crate::common::config::Config;
use crate::common::error::{Error, Result};
use crate::factory::Dialect;
use crate::flow::{Flow, FlowStats};
use crate::parser::diagnostics::{Diagnostic, ProblemReporter};
use crate::parser::span::LineMap;
use crate::parser::{Parser, RecoveryState};

/// File extensions the driver picks up when walking a directory.
pub const SOURCE_EXTENSIONS: &[&str] = &["java", "aj"];

/// Text of one compilation unit and the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub name: String,
    pub source: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), source))
    }
}

/// Observer of the compilation pipeline. Every hook defaults to doing nothing.
///
/// Hooks of different units may run on different threads.
pub trait CompilerAdapter: Send + Sync {
    fn before_compiling(&self, _sources: &[SourceUnit]) {}

    /// After parsing, before anything else looks at the unit.
    fn before_processing(&self, _unit: &CompilationUnit) {}

    fn before_analysing(&self, _unit: &CompilationUnit) {}

    fn before_resolving(&self, _unit: &CompilationUnit) {}

    fn after_resolving(&self, _unit: &CompilationUnit, _bindings: &Environment) {}

    fn after_processing(&self, _unit: &CompilationUnit, _index: usize) {}

    fn after_compiling(&self, _units: &[UnitReport]) {}
}

/// Everything the pipeline produced for one unit.
#[derive(Debug)]
pub struct CompiledUnit {
    pub unit: CompilationUnit,
    pub diagnostics: Vec<Diagnostic>,
    pub state: RecoveryState,
    pub flow: FlowStats,
    pub bindings: Option<Environment>,
    pub lines: LineMap,
}

impl CompiledUnit {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn is_abandoned(&self) -> bool {
        self.state == RecoveryState::Abandoned
    }
}

#[derive(Debug)]
pub struct UnitReport {
    pub name: String,
    pub result: Result<CompiledUnit>,
}

impl UnitReport {
    /// Failed outright or produced an error diagnostic.
    pub fn failed(&self) -> bool {
        match &self.result {
            Ok(compiled) => compiled.has_errors(),
            Err(_) => true,
        }
    }
}

/// Results of one batch, in input order.
#[derive(Debug, Default)]
pub struct Compilation {
    pub units: Vec<UnitReport>,
}

impl Compilation {
    pub fn failed(&self) -> bool {
        self.units.iter().any(UnitReport::failed)
    }

    pub fn error_count(&self) -> usize {
        self.units
            .iter()
            .map(|report| match &report.result {
                Ok(compiled) => compiled.diagnostics.iter().filter(|d| d.is_error()).count(),
                Err(_) => 1,
            })
            .sum()
    }
}

pub struct Compiler {
    config: Config,
    dialect: Dialect,
    adapter: Option<Arc<dyn CompilerAdapter>>,
    threads: usize,
    resolve: bool,
}

impl Compiler {
    pub fn new(config: Config, dialect: Dialect) -> Self {
        Self {
            config,
            dialect,
            adapter: None,
            threads: 1,
            resolve: false,
        }
    }

    /// Compiler whose dialect is resolved from the configuration.
    pub fn from_config(config: Config) -> Self {
        let dialect = Dialect::resolve(&config);
        Self::new(config, dialect)
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn CompilerAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Worker threads for parsing; each owns its parser.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Also build the bindings of every unit.
    pub fn with_bindings(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn compile(&self, sources: &[SourceUnit]) -> Compilation {
        info!(
            "compiling {} units with dialect {} on {} thread(s)",
            sources.len(),
            self.dialect.name(),
            self.threads
        );
        if let Some(adapter) = &self.adapter {
            adapter.before_compiling(sources);
        }

        let units = if self.threads == 1 || sources.len() < 2 {
            self.compile_chunk(sources, 0)
        } else {
            self.compile_parallel(sources)
        };

        let compilation = Compilation { units };
        if let Some(adapter) = &self.adapter {
            adapter.after_compiling(&compilation.units);
        }
        debug!(
            "compilation finished: {} units, {} errors",
            compilation.units.len(),
            compilation.error_count()
        );
        compilation
    }

    /// Read and compile files. Unreadable files become failed reports.
    pub fn compile_paths(&self, paths: &[PathBuf]) -> Compilation {
        let mut sources = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();
        for path in paths {
            match SourceUnit::from_path(path) {
                Ok(source) => sources.push(source),
                Err(err) => {
                    warn!("cannot read {}: {}", path.display(), err);
                    unreadable.push(UnitReport {
                        name: path.display().to_string(),
                        result: Err(err),
                    });
                }
            }
        }
        let mut compilation = self.compile(&sources);
        compilation.units.extend(unreadable);
        compilation
    }

    fn compile_parallel(&self, sources: &[SourceUnit]) -> Vec<UnitReport> {
        let chunk_size = (sources.len() + self.threads - 1) / self.threads;
        thread::scope(|scope| {
            let handles: Vec<_> = sources
                .chunks(chunk_size)
                .enumerate()
                .map(|(chunk, units)| {
                    let first = chunk * chunk_size;
                    (units, scope.spawn(move || self.compile_chunk(units, first)))
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|(units, handle)| match handle.join() {
                    Ok(reports) => reports,
                    Err(_) => units
                        .iter()
                        .map(|source| UnitReport {
                            name: source.name.clone(),
                            result: Err(Error::internal("worker thread panicked")),
                        })
                        .collect(),
                })
                .collect()
        })
    }

    /// Compile consecutive units with one parser; `first` is the batch
    /// index of `sources[0]`.
    fn compile_chunk(&self, sources: &[SourceUnit], first: usize) -> Vec<UnitReport> {
        let mut parser = match Parser::new(self.config.clone(), self.dialect.clone()) {
            Ok(parser) => parser,
            Err(err) => {
                let message = err.to_string();
                return sources
                    .iter()
                    .map(|source| UnitReport {
                        name: source.name.clone(),
                        result: Err(Error::grammar_error(message.clone())),
                    })
                    .collect();
            }
        };
        sources
            .iter()
            .enumerate()
            .map(|(offset, source)| UnitReport {
                name: source.name.clone(),
                result: self.compile_isolated(&mut parser, source, first + offset),
            })
            .collect()
    }

    /// A panic while compiling one unit fails that unit only.
    fn compile_isolated(&self, parser: &mut Parser, source: &SourceUnit, index: usize) -> Result<CompiledUnit> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.compile_unit(parser, source, index))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("compiling {} panicked: {}", source.name, message);
                parser.reset();
                Err(Error::internal(format!("panic while compiling {}: {}", source.name, message)))
            }
        }
    }

    fn compile_unit(&self, parser: &mut Parser, source: &SourceUnit, index: usize) -> Result<CompiledUnit> {
        debug!("parsing {}", source.name);
        let outcome = parser.parse_source(&source.source)?;
        let mut unit = outcome.unit;
        if let Some(adapter) = &self.adapter {
            adapter.before_processing(&unit);
        }

        let mut reporter = ProblemReporter::new(self.config.max_errors);
        for diagnostic in outcome.diagnostics {
            reporter.report(diagnostic);
        }

        let flow = if outcome.state == RecoveryState::Abandoned {
            debug!("{} abandoned, skipping flow analysis", source.name);
            FlowStats::default()
        } else {
            if let Some(adapter) = &self.adapter {
                adapter.before_analysing(&unit);
            }
            Flow::new(&mut reporter).process(&mut unit)
        };

        let bindings = if self.resolve {
            if let Some(adapter) = &self.adapter {
                adapter.before_resolving(&unit);
            }
            let bindings = resolve_unit(&unit);
            if let Some(adapter) = &self.adapter {
                adapter.after_resolving(&unit, &bindings);
            }
            Some(bindings)
        } else {
            None
        };

        if let Some(adapter) = &self.adapter {
            adapter.after_processing(&unit, index);
        }
        Ok(CompiledUnit {
            unit,
            diagnostics: reporter.into_diagnostics(),
            state: outcome.state,
            flow,
            bindings,
            lines: LineMap::new(&source.source),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Source files under `root`, sorted. A file path is returned as is.
pub fn collect_sources(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", root.display()),
        )));
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl CompilerAdapter for Recorder {
        fn before_compiling(&self, sources: &[SourceUnit]) {
            self.push(format!("before_compiling {}", sources.len()));
        }

        fn before_processing(&self, unit: &CompilationUnit) {
            self.push(format!("before_processing {}", unit.types.len()));
        }

        fn before_analysing(&self, _unit: &CompilationUnit) {
            self.push("before_analysing".to_string());
        }

        fn after_processing(&self, _unit: &CompilationUnit, index: usize) {
            self.push(format!("after_processing {}", index));
        }

        fn after_compiling(&self, units: &[UnitReport]) {
            self.push(format!("after_compiling {}", units.len()));
        }
    }

    #[test]
    fn test_hooks_run_in_order() {
        let recorder = Arc::new(Recorder::default());
        let compiler = Compiler::new(Config::default(), Dialect::Disabled).with_adapter(recorder.clone());
        let compilation = compiler.compile(&[SourceUnit::new("A.java", "class A { }")]);
        assert!(!compilation.failed());
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "before_compiling 1",
                "before_processing 1",
                "before_analysing",
                "after_processing 0",
                "after_compiling 1",
            ]
        );
    }

    #[test]
    fn test_failures_stay_with_their_unit() {
        let compiler = Compiler::new(Config::default(), Dialect::Disabled);
        let compilation = compiler.compile(&[
            SourceUnit::new("Good.java", "class Good { int x; }"),
            SourceUnit::new("Bad.java", "class Bad { int x }"),
            SourceUnit::new("AlsoGood.java", "class AlsoGood { }"),
        ]);
        let failed: Vec<bool> = compilation.units.iter().map(UnitReport::failed).collect();
        assert_eq!(failed, vec![false, true, false]);
        assert!(compilation.failed());
    }

    #[test]
    fn test_parallel_keeps_input_order() {
        let sources: Vec<SourceUnit> = (0..7)
            .map(|i| SourceUnit::new(format!("C{}.java", i), format!("class C{} {{ }}", i)))
            .collect();
        let compiler = Compiler::new(Config::default(), Dialect::Disabled).with_threads(3);
        let compilation = compiler.compile(&sources);
        let names: Vec<String> = compilation
            .units
            .iter()
            .map(|report| match &report.result {
                Ok(compiled) => compiled.unit.types[0].name.clone(),
                Err(err) => panic!("{}", err),
            })
            .collect();
        let expected: Vec<String> = (0..7).map(|i| format!("C{}", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_bindings_are_resolved_on_request() {
        let compiler = Compiler::new(Config::default(), Dialect::Disabled).with_bindings(true);
        let compilation = compiler.compile(&[SourceUnit::new("A.java", "package p; class A { int f; }")]);
        let compiled = compilation.units[0].result.as_ref().expect("compiled");
        let bindings = compiled.bindings.as_ref().expect("bindings");
        assert!(bindings.declared_type("p.A").is_some());
    }
}
