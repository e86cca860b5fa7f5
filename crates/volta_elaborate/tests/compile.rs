mod common;

use common::*;
use volta_diagnostics::{DiagnosticSink, Severity};
use volta_elaborate::{compile, errors, CompileOptions, Compiled};
use volta_core::{BuildResult, GeneratorValues, LibrarySource};
use volta_ir::{
    BlockLike, DesignPath, GeneratorInfo, HierarchyBlock, LibraryElement, LibraryPath, LocalPath,
    ParamType, Refinements, ValueExpr, ValueLit,
};

const TOP: &str = "power.ChainBoard";

fn run(chains: Vec<Option<i64>>, options: &CompileOptions) -> (Option<Compiled>, DiagnosticSink) {
    let sink = DiagnosticSink::new();
    let library = library(chains);
    let compiled = compile(&library, &LibraryPath::new(TOP), options, &sink).unwrap();
    (compiled, sink)
}

fn value(compiled: &Compiled, path: &DesignPath) -> Option<ValueLit> {
    compiled
        .values
        .iter()
        .find(|(p, _)| p == path)
        .map(|(_, v)| v.clone())
}

fn chain_link(chain: &str, param: &str) -> DesignPath {
    DesignPath::of_blocks(&[chain])
        .append_link("_pwr_link")
        .append_param(param)
}

fn codes(sink: &DiagnosticSink) -> Vec<String> {
    sink.codes().iter().map(ToString::to_string).collect()
}

#[test]
fn generator_runs_with_assigned_count() {
    let (compiled, sink) = run(vec![Some(2)], &CompileOptions::default());
    let compiled = compiled.unwrap();
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());

    let chain = compiled
        .design
        .block(&DesignPath::of_blocks(&["chain"]))
        .unwrap();
    assert!(!chain.generator_pending());
    assert!(chain.blocks.contains_key("l0"));
    assert!(chain.blocks.contains_key("l1"));
    assert!(matches!(chain.blocks.get("(bridge)pwr"), Some(BlockLike::Block(_))));
    assert_eq!(compiled.generator_runs, 1);
    assert_eq!(
        value(&compiled, &chain_link("chain", "current_drawn")),
        Some(ValueLit::Range(range(0.0, 2.0)))
    );
    assert_eq!(
        value(&compiled, &DesignPath::of_blocks(&["chain"]).append_param("count")),
        Some(ValueLit::Int(2))
    );
}

#[test]
fn equal_generators_run_once() {
    let (compiled, sink) = run(vec![Some(2), Some(2), Some(3)], &CompileOptions::default());
    let compiled = compiled.unwrap();
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assert_eq!(compiled.generator_runs, 2);
    let chain2 = compiled
        .design
        .block(&DesignPath::of_blocks(&["chain2"]))
        .unwrap();
    assert_eq!(chain2.blocks.keys().filter(|k| k.starts_with('l')).count(), 3);
}

#[test]
fn unknown_input_stops_compilation() {
    let (compiled, sink) = run(vec![None], &CompileOptions::default());
    assert!(compiled.is_none());
    let diagnostics = sink.diagnostics();
    let missing = diagnostics
        .iter()
        .find(|d| d.code == errors::E202)
        .expect("missing input diagnostic");
    assert!(missing.message.contains("count"), "{}", missing.message);
    assert_eq!(missing.path.as_deref(), Some("chain"));
}

#[test]
fn continue_on_error_leaves_a_stub() {
    let options = CompileOptions {
        continue_on_error: true,
        ..CompileOptions::default()
    };
    let (compiled, sink) = run(vec![None, Some(1)], &options);
    let compiled = compiled.unwrap();
    assert!(sink.has_errors());
    assert!(codes(&sink).contains(&errors::E202.to_string()));

    let stub = compiled
        .design
        .block(&DesignPath::of_blocks(&["chain"]))
        .unwrap();
    assert!(stub.meta.errors.contains_key("generator"));
    assert!(!stub.generator_pending());
    assert!(stub.blocks.is_empty());
    // the other generator still ran
    let other = compiled
        .design
        .block(&DesignPath::of_blocks(&["chain1"]))
        .unwrap();
    assert!(other.blocks.contains_key("l0"));
}

#[test]
fn failing_generator_body_is_reported() {
    let (compiled, sink) = run(vec![Some(-1)], &CompileOptions::default());
    assert!(compiled.is_none());
    assert!(codes(&sink).contains(&errors::E204.to_string()));
}

#[test]
fn refinement_values_feed_generators() {
    let options = CompileOptions {
        values: vec![("chain.count".to_string(), ValueLit::Int(3))],
        ..CompileOptions::default()
    };
    let (compiled, sink) = run(vec![None], &options);
    let compiled = compiled.unwrap();
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assert_eq!(
        value(&compiled, &chain_link("chain", "current_drawn")),
        Some(ValueLit::Range(range(0.0, 3.0)))
    );
}

#[test]
fn refinement_value_inside_generated_contents() {
    let options = CompileOptions {
        values: vec![("chain.l0.draw".to_string(), ValueLit::Range(range(0.0, 1.0)))],
        ..CompileOptions::default()
    };
    let (compiled, sink) = run(vec![Some(1)], &options);
    assert!(compiled.is_some());
    assert!(!codes(&sink).contains(&errors::E207.to_string()), "{:?}", sink.diagnostics());
}

#[test]
fn unknown_refinement_value_is_reported() {
    let options = CompileOptions {
        values: vec![("chain.nothing".to_string(), ValueLit::Int(1))],
        ..CompileOptions::default()
    };
    let (compiled, sink) = run(vec![Some(1)], &options);
    assert!(compiled.is_some());
    let diagnostics = sink.diagnostics();
    let unknown: Vec<_> = diagnostics.iter().filter(|d| d.code == errors::E207).collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].path.as_deref(), Some("chain.nothing"));
}

#[test]
fn class_refinement_records_the_original() {
    let mut options = CompileOptions::default();
    options.refinements.classes.insert(
        LibraryPath::new("power.Load"),
        LibraryPath::new("power.QuietLoad"),
    );
    let (compiled, sink) = run(vec![Some(1)], &options);
    let compiled = compiled.unwrap();
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assert!(!codes(&sink).contains(&errors::W201.to_string()));

    let l1 = compiled
        .design
        .block(&DesignPath::of_blocks(&["l1"]))
        .unwrap();
    assert_eq!(l1.self_class, LibraryPath::new("power.QuietLoad"));
    assert_eq!(l1.meta.refinement_original, Some(LibraryPath::new("power.Load")));
    // generated contents are refined too
    let inner = compiled
        .design
        .block(&DesignPath::of_blocks(&["chain", "l0"]))
        .unwrap();
    assert_eq!(inner.self_class, LibraryPath::new("power.QuietLoad"));
    assert_eq!(compiled.refinements.classes.len(), 1);
}

#[test]
fn refinement_outside_the_family_warns() {
    let mut options = CompileOptions::default();
    options.refinements.instances.insert(
        DesignPath::of_blocks(&["l1"]),
        LibraryPath::new("power.LookalikeLoad"),
    );
    let (compiled, sink) = run(vec![Some(1)], &options);
    let compiled = compiled.unwrap();
    let diagnostics = sink.diagnostics();
    let warnings: Vec<_> = diagnostics.iter().filter(|d| d.code == errors::W201).collect();
    assert_eq!(warnings.len(), 1, "{diagnostics:?}");
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(warnings[0].path.as_deref(), Some("l1"));
    assert_eq!(
        compiled
            .design
            .block(&DesignPath::of_blocks(&["l1"]))
            .unwrap()
            .self_class,
        LibraryPath::new("power.LookalikeLoad")
    );
}

#[test]
fn unused_instance_refinement_warns() {
    let mut options = CompileOptions::default();
    options.refinements.instances.insert(
        DesignPath::of_blocks(&["l9"]),
        LibraryPath::new("power.QuietLoad"),
    );
    let (compiled, sink) = run(vec![Some(1)], &options);
    assert!(compiled.is_some());
    assert!(!sink.has_errors());
    let unused: Vec<_> = codes(&sink)
        .into_iter()
        .filter(|code| *code == errors::W200.to_string())
        .collect();
    assert_eq!(unused.len(), 1);
}

#[test]
fn unknown_top_is_reported() {
    let sink = DiagnosticSink::new();
    let library = library(vec![]);
    let compiled = compile(
        &library,
        &LibraryPath::new("power.Nope"),
        &CompileOptions::default(),
        &sink,
    )
    .unwrap();
    assert!(compiled.is_none());
    assert_eq!(codes(&sink), vec![errors::E208.to_string()]);
}

#[test]
fn compiling_twice_gives_identical_designs() {
    let encode = |compiled: &Compiled| {
        bincode::serde::encode_to_vec(&compiled.design, bincode::config::standard()).unwrap()
    };
    let options = CompileOptions::default();
    let (first, _) = run(vec![Some(2), Some(1)], &options);
    let (second, _) = run(vec![Some(2), Some(1)], &options);
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(encode(&first), encode(&second));
    assert_eq!(first.values, second.values);
}

/// A compiled library whose one generator replaces a stub constraint.
struct RestatingLibrary {
    library: volta_ir::Library,
}

fn assign_int(dst: &[&str], value: i64) -> ValueExpr {
    ValueExpr::Assign {
        dst: LocalPath::names(dst),
        src: Box::new(ValueExpr::Literal(ValueLit::Int(value))),
    }
}

fn staged(mode: i64, pending: bool) -> HierarchyBlock {
    let mut block = HierarchyBlock::new(LibraryPath::new("t.Staged"));
    block.params.insert("count".into(), ParamType::Int);
    block.params.insert("mode".into(), ParamType::Int);
    block.constraints.insert("mode".into(), assign_int(&["mode"], mode));
    if pending {
        block.generator = Some(GeneratorInfo {
            required: vec![LocalPath::names(&["count"])],
            done: false,
        });
    }
    block
}

impl RestatingLibrary {
    fn new() -> Self {
        let mut top = HierarchyBlock::new(LibraryPath::new("t.Top"));
        top.blocks
            .insert("gen".into(), BlockLike::LibElem(LibraryPath::new("t.Staged")));
        top.constraints
            .insert("(init)gen.count".into(), assign_int(&["gen", "count"], 3));
        let mut library = volta_ir::Library::new();
        library.insert(LibraryPath::new("t.Top"), LibraryElement::Block(top));
        library.insert(LibraryPath::new("t.Staged"), LibraryElement::Block(staged(1, true)));
        Self { library }
    }
}

impl LibrarySource for RestatingLibrary {
    fn index_module(&self, module: &str) -> BuildResult<Vec<LibraryPath>> {
        self.library.index_module(module)
    }

    fn element(&self, path: &LibraryPath) -> BuildResult<LibraryElement> {
        self.library.element(path)
    }

    fn top(&self, path: &LibraryPath) -> BuildResult<(HierarchyBlock, Refinements)> {
        self.library.top(path)
    }

    fn generate(&self, _path: &LibraryPath, _values: &GeneratorValues) -> BuildResult<HierarchyBlock> {
        Ok(staged(2, false))
    }
}

#[test]
fn generated_constraints_replace_the_stub() {
    let sink = DiagnosticSink::new();
    let library = RestatingLibrary::new();
    let compiled = compile(
        &library,
        &LibraryPath::new("t.Top"),
        &CompileOptions::default(),
        &sink,
    )
    .unwrap()
    .unwrap();
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assert_eq!(compiled.generator_runs, 1);
    assert_eq!(
        value(&compiled, &DesignPath::of_blocks(&["gen"]).append_param("mode")),
        Some(ValueLit::Int(2))
    );
}
