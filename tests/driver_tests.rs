mod common;

use std::fs;
use std::sync::{Arc, Mutex};

use ajfront::ast::CompilationUnit;
use ajfront::binding::Environment;
use ajfront::driver::{collect_sources, SOURCE_EXTENSIONS};
use ajfront::{Compiler, CompilerAdapter, Config, Dialect, Error, SourceUnit, UnitReport};
use tempfile::TempDir;

const GOOD_JAVA: &str = "package demo;\nclass Point { int x; int y; int sum() { return x + y; } }\n";
const GOOD_ASPECT: &str = "aspect Logging {\n  pointcut calls(): call(* demo.Point.*(..));\n  before(): calls() { }\n}\n";
const BROKEN: &str = "class Broken { void m() { int x = ; }\n";

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("Point.java"), GOOD_JAVA).expect("write");
    fs::create_dir(dir.path().join("aspects")).expect("mkdir");
    fs::write(dir.path().join("aspects").join("Logging.aj"), GOOD_ASPECT).expect("write");
    fs::write(dir.path().join("Broken.java"), BROKEN).expect("write");
    fs::write(dir.path().join("notes.txt"), "not a source").expect("write");
    dir
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().expect("events").push(event);
    }
}

impl CompilerAdapter for Recorder {
    fn before_compiling(&self, sources: &[SourceUnit]) {
        self.push(format!("start {}", sources.len()));
    }

    fn after_resolving(&self, unit: &CompilationUnit, bindings: &Environment) {
        let name = unit.types.first().map_or("?", |t| t.name.as_str());
        self.push(format!("resolved {} {}", name, bindings.type_count() > 0));
    }

    fn after_compiling(&self, units: &[UnitReport]) {
        self.push(format!("done {}", units.len()));
    }
}

#[test]
fn test_collect_sources_filters_extensions() {
    let dir = workspace();
    let paths = collect_sources(dir.path()).expect("collect");
    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Broken.java", "Point.java", "Logging.aj"]);
    assert!(paths.iter().all(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| SOURCE_EXTENSIONS.contains(&e))
    }));
}

#[test]
fn test_collect_sources_single_file_and_missing_root() {
    let dir = workspace();
    let file = dir.path().join("notes.txt");
    assert_eq!(collect_sources(&file).expect("file"), vec![file.clone()]);
    let missing = dir.path().join("missing");
    assert!(matches!(collect_sources(&missing), Err(Error::Io(_))));
}

#[test]
fn test_compile_directory() {
    common::init_logger();
    let dir = workspace();
    let paths = collect_sources(dir.path()).expect("collect");
    let compiler = Compiler::new(Config::default(), Dialect::by_name("aspectj"));
    let compilation = compiler.compile_paths(&paths);
    assert_eq!(compilation.units.len(), 3);
    assert!(compilation.failed());

    let failed: Vec<&str> = compilation
        .units
        .iter()
        .filter(|r| r.failed())
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].ends_with("Broken.java"));

    let aspect = compilation
        .units
        .iter()
        .find(|r| r.name.ends_with("Logging.aj"))
        .and_then(|r| r.result.as_ref().ok())
        .expect("aspect unit");
    assert_eq!(aspect.unit.types[0].dialect_kind(), Some("aspect"));
    assert!(aspect.diagnostics.is_empty(), "{:?}", aspect.diagnostics);
}

#[test]
fn test_unreadable_path_is_reported_per_unit() {
    let dir = workspace();
    let mut paths = vec![dir.path().join("Point.java")];
    paths.push(dir.path().join("gone.java"));
    let compilation = Compiler::from_config(Config::default()).compile_paths(&paths);
    assert_eq!(compilation.units.len(), 2);
    let gone = compilation
        .units
        .iter()
        .find(|r| r.name.ends_with("gone.java"))
        .expect("gone report");
    assert!(matches!(gone.result, Err(Error::Io(_))));
    let point = compilation
        .units
        .iter()
        .find(|r| r.name.ends_with("Point.java"))
        .expect("point report");
    assert!(!point.failed());
    assert_eq!(compilation.error_count(), 1);
}

#[test]
fn test_adapter_sees_resolved_units() {
    let recorder = Arc::new(Recorder::default());
    let compiler = Compiler::from_config(Config::default())
        .with_adapter(recorder.clone())
        .with_bindings(true);
    let sources = vec![
        SourceUnit::new("Point.java", GOOD_JAVA),
        SourceUnit::new("Logging.aj", GOOD_ASPECT),
    ];
    let compilation = compiler.compile(&sources);
    assert!(!compilation.failed());
    assert!(compilation.units.iter().all(|r| r
        .result
        .as_ref()
        .map_or(false, |c| c.bindings.is_some())));

    let events = recorder.events.lock().expect("events").clone();
    assert_eq!(
        events,
        vec![
            "start 2".to_string(),
            "resolved Point true".to_string(),
            "resolved Logging true".to_string(),
            "done 2".to_string(),
        ]
    );
}

#[test]
fn test_parallel_batch_matches_serial() {
    let sources: Vec<SourceUnit> = (0..12)
        .map(|i| {
            let text = if i % 4 == 3 { BROKEN.to_string() } else { format!("class C{} {{ int f{}; }}", i, i) };
            SourceUnit::new(format!("C{}.java", i), text)
        })
        .collect();
    let serial = Compiler::from_config(Config::default()).compile(&sources);
    let parallel = Compiler::from_config(Config::default()).with_threads(4).compile(&sources);

    let summary = |units: &[UnitReport]| -> Vec<(String, bool, usize)> {
        units
            .iter()
            .map(|r| {
                let count = r.result.as_ref().map_or(0, |c| c.diagnostics.len());
                (r.name.clone(), r.failed(), count)
            })
            .collect()
    };
    assert_eq!(summary(&serial.units), summary(&parallel.units));
    assert_eq!(parallel.units.iter().filter(|r| r.failed()).count(), 3);
}

struct Faulty {
    target: &'static str,
}

impl CompilerAdapter for Faulty {
    fn before_processing(&self, unit: &CompilationUnit) {
        if unit.types.first().map_or(false, |t| t.name == self.target) {
            panic!("adapter failure in {}", self.target);
        }
    }
}

fn faulty_batch() -> Vec<SourceUnit> {
    ["A", "B", "C", "D"]
        .iter()
        .map(|name| SourceUnit::new(format!("{}.java", name), format!("class {} {{ int v; }}", name)))
        .collect()
}

fn outcome(compilation: &ajfront::driver::Compilation) -> Vec<(String, bool)> {
    compilation.units.iter().map(|r| (r.name.clone(), r.failed())).collect()
}

#[test]
fn test_panic_fails_only_its_unit() {
    let expected = vec![
        ("A.java".to_string(), false),
        ("B.java".to_string(), true),
        ("C.java".to_string(), false),
        ("D.java".to_string(), false),
    ];
    for threads in [1, 2] {
        let compilation = Compiler::from_config(Config::default())
            .with_adapter(Arc::new(Faulty { target: "B" }))
            .with_threads(threads)
            .compile(&faulty_batch());
        assert_eq!(outcome(&compilation), expected, "threads = {}", threads);
        let failed = &compilation.units[1];
        match &failed.result {
            Err(Error::Internal { message }) => assert!(message.contains("adapter failure in B"), "{}", message),
            other => panic!("expected an internal error, got {:?}", other.as_ref().map(|_| ())),
        }
    }
}
