mod common;

use common::*;
use std::rc::Rc;
use volta_core::{
    elaborate_block, Block, BlockBuilder, BlockLibrary, BuildError, BuildResult, ElabMode,
    GeneratorValues, LibrarySource, NodeId,
};
use volta_ir::{HierarchyBlock, LibraryElement, LibraryPath, LocalPath, ParamType, ValueLit};

struct ChainIo {
    count: NodeId,
    unused: NodeId,
}

/// Builds `count` loads once `count` is known.
struct LoadChain {
    read_unused: bool,
}

impl Block for LoadChain {
    type Io = ChainIo;

    fn class_name(&self) -> String {
        "power.LoadChain".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<ChainIo> {
        let count = b.declare_param("count", ParamType::Int)?;
        let unused = b.declare_param("unused", ParamType::Int)?;
        b.generator(&[count])?;
        Ok(ChainIo { count, unused })
    }

    fn generate(&self, io: &ChainIo, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        if self.read_unused {
            b.get_int(io.unused)?;
        }
        for i in 0..b.get_int(io.count)? {
            b.declare_block(&format!("l{i}"), Load::new(range(0.0, 1.0)))?;
        }
        Ok(())
    }
}

fn run(def: LoadChain, mode: ElabMode) -> BuildResult<HierarchyBlock> {
    match elaborate_block(Rc::new(def), mode)?.element {
        LibraryElement::Block(block) => Ok(block),
        other => panic!("expected a block, got {other:?}"),
    }
}

fn values(count: i64) -> GeneratorValues {
    [(LocalPath::names(&["count"]), ValueLit::Int(count))]
        .into_iter()
        .collect()
}

#[test]
fn stub_lists_required_inputs() {
    let stub = run(LoadChain { read_unused: false }, ElabMode::Library).unwrap();
    let info = stub.generator.as_ref().unwrap();
    assert_eq!(info.required, vec![LocalPath::names(&["count"])]);
    assert!(!info.done);
    assert!(stub.generator_pending());
    assert!(stub.blocks.is_empty());
}

#[test]
fn generate_builds_from_solved_values() {
    let stub = run(LoadChain { read_unused: false }, ElabMode::Library).unwrap();
    let done = run(
        LoadChain { read_unused: false },
        ElabMode::Generate(values(3)),
    )
    .unwrap();
    assert_eq!(done.blocks.keys().collect::<Vec<_>>(), vec!["l0", "l1", "l2"]);
    assert!(!done.generator_pending());
    // Interface is unchanged by generation.
    assert_eq!(stub.ports, done.ports);
    assert_eq!(stub.params, done.params);
}

#[test]
fn undeclared_inputs_are_rejected() {
    let err = run(
        LoadChain { read_unused: true },
        ElabMode::Generate(values(1)),
    )
    .unwrap_err();
    assert!(
        matches!(&err, BuildError::UndeclaredGeneratorInput { path, .. } if path.contains("unused")),
        "{err}"
    );
}

#[test]
fn missing_inputs_are_rejected() {
    let err = run(
        LoadChain { read_unused: false },
        ElabMode::Generate(GeneratorValues::new()),
    )
    .unwrap_err();
    assert_eq!(
        err,
        BuildError::MissingGeneratorInput {
            class: "power.LoadChain".into(),
            path: "count".into(),
        }
    );
}

/// Declares its generator twice.
struct Twice;

impl Block for Twice {
    type Io = ();

    fn class_name(&self) -> String {
        "test.Twice".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let p = b.declare_param("p", ParamType::Int)?;
        b.generator(&[p])?;
        b.generator(&[p])
    }
}

#[test]
fn one_generator_per_block() {
    let err = elaborate_block(Rc::new(Twice), ElabMode::Library).err().unwrap();
    assert!(matches!(err, BuildError::Structural { .. }), "{err}");
}

/// Reads a value outside `generate`.
struct EarlyGet;

impl Block for EarlyGet {
    type Io = ();

    fn class_name(&self) -> String {
        "test.EarlyGet".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let p = b.declare_param("p", ParamType::Int)?;
        b.generator(&[p])?;
        b.get_int(p)?;
        Ok(())
    }
}

#[test]
fn values_are_only_available_in_generate() {
    let err = elaborate_block(Rc::new(EarlyGet), ElabMode::Library).err().unwrap();
    assert!(matches!(err, BuildError::Lifecycle { call: "get", .. }), "{err}");
}

#[test]
fn library_runs_generators() {
    let mut library = BlockLibrary::new();
    library.register_block(LoadChain { read_unused: false });
    let path = LibraryPath::new("power.LoadChain");
    let generated = library.generate(&path, &values(2)).unwrap();
    assert_eq!(generated.blocks.len(), 2);
    // The loads were discovered while generating.
    assert!(library.element(&LibraryPath::new("power.Load")).is_ok());
}
