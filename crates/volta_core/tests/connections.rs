mod common;

use common::*;
use proptest::prelude::*;
use std::rc::Rc;
use volta_core::{
    elaborate_block, Block, BlockBuilder, BlockKind, BlockLibrary, BuildError, BuildResult,
    DynBlock, ElabMode, LibrarySource, NodeId, Port, PortId, Vector,
};
use volta_ir::{
    BlockLike, HierarchyBlock, LibraryElement, LibraryPath, LinkLike, LocalPath, LocalStep,
    ParamType, ReservedParam, ValueExpr, ValueLit,
};

fn elaborate(def: impl Block, mode: ElabMode) -> BuildResult<LibraryElement> {
    elaborate_block(Rc::new(def), mode).map(|e| e.element)
}

fn block(def: impl Block) -> HierarchyBlock {
    match elaborate(def, ElabMode::Library).unwrap() {
        LibraryElement::Block(block) => block,
        other => panic!("expected a block, got {other:?}"),
    }
}

fn path(names: &[&str]) -> LocalPath {
    LocalPath::names(names)
}

fn alloc(names: &[&str]) -> LocalPath {
    path(names).with(LocalStep::Allocate(None))
}

fn connected(block_port: LocalPath, link_port: LocalPath) -> ValueExpr {
    ValueExpr::Connected {
        block_port,
        link_port,
    }
}

fn constraint_names(block: &HierarchyBlock) -> Vec<&str> {
    block.constraints.keys().map(String::as_str).collect()
}

#[test]
fn supply_and_loads_share_one_link() {
    let board = block(Board { loads: 2 });
    let link = "_supply_out_link";

    assert_eq!(
        board.blocks.keys().collect::<Vec<_>>(),
        vec!["supply", "l1", "l2"]
    );
    assert_eq!(
        board.links.get(link),
        Some(&LinkLike::LibElem(LibraryPath::new("power.PowerLink")))
    );
    assert_eq!(
        constraint_names(&board),
        vec![
            "(init)l1.draw",
            "(init)l2.draw",
            "(conn)_supply_out_link_d0",
            "(conn)_supply_out_link_d1",
            "(conn)_supply_out_link_d2",
        ]
    );
    assert_eq!(
        board.constraints["(init)l2.draw"],
        ValueExpr::Assign {
            dst: path(&["l2", "draw"]),
            src: Box::new(ValueExpr::Literal(ValueLit::Range(range(0.0, 2.0)))),
        }
    );
    assert_eq!(
        board.constraints["(conn)_supply_out_link_d0"],
        connected(path(&["supply", "out"]), path(&[link, "source"]))
    );
    assert_eq!(
        board.constraints["(conn)_supply_out_link_d2"],
        connected(path(&["l2", "pwr"]), alloc(&[link, "sinks"]))
    );
}

#[test]
fn link_aggregates_its_sinks() {
    let link = match elaborate(PowerLink, ElabMode::Library).unwrap() {
        LibraryElement::Link(link) => link,
        other => panic!("expected a link, got {other:?}"),
    };
    assert_eq!(link.ports.keys().collect::<Vec<_>>(), vec!["source", "sinks"]);
    // Links have no required ports.
    assert!(!link.constraints.keys().any(|k| k.starts_with("(reqd)")));
    assert_eq!(
        link.constraints["(constr)1"],
        ValueExpr::Assign {
            dst: path(&["current_drawn"]),
            src: Box::new(ValueExpr::Reduce {
                op: volta_ir::ReductionOp::Sum,
                vals: Box::new(ValueExpr::MapExtract {
                    container: path(&["sinks"]),
                    path: path(&["current_draw"]),
                }),
            }),
        }
    );
}

struct WrapperIo {
    pwr: PortId,
    inner: PortId,
}

/// A load re-exported through a boundary port.
struct LoadWrapper;

impl Block for LoadWrapper {
    type Io = WrapperIo;

    fn class_name(&self) -> String {
        "power.LoadWrapper".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<WrapperIo> {
        let load = b.declare_block("load", Load::new(range(0.0, 1.0)))?;
        let pwr = b.export("pwr", load.io.pwr)?;
        Ok(WrapperIo {
            pwr,
            inner: load.io.pwr,
        })
    }
}

#[test]
fn boundary_to_interior_collapses_to_export() {
    let wrapper = block(LoadWrapper);
    assert!(wrapper.links.is_empty());
    assert_eq!(wrapper.blocks.keys().collect::<Vec<_>>(), vec!["load"]);
    assert_eq!(
        constraint_names(&wrapper),
        vec!["(reqd)pwr", "(init)load.draw", "(conn)_pwr_link"]
    );
    assert_eq!(
        wrapper.constraints["(reqd)pwr"],
        ValueExpr::Ref(path(&["pwr"]).with(LocalStep::Reserved(ReservedParam::IsConnected)))
    );
    assert_eq!(
        wrapper.constraints["(conn)_pwr_link"],
        ValueExpr::Exported {
            exterior_port: path(&["pwr"]),
            internal_block_port: path(&["load", "pwr"]),
        }
    );
}

struct HubIo {
    pwr: PortId,
}

/// A boundary sink feeding two loads, which needs a bridge.
struct SinkHub;

impl Block for SinkHub {
    type Io = HubIo;

    fn class_name(&self) -> String {
        "power.SinkHub".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<HubIo> {
        let pwr = b.declare_port("pwr", VoltageSink::empty())?;
        Ok(HubIo { pwr })
    }

    fn contents(&self, io: &HubIo, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let l1 = b.declare_block("l1", Load::new(range(0.0, 1.0)))?;
        let l2 = b.declare_block("l2", Load::new(range(0.0, 2.0)))?;
        b.connect(&[io.pwr, l1.io.pwr, l2.io.pwr])
    }
}

#[test]
fn boundary_port_on_a_link_goes_through_a_bridge() {
    let hub = block(SinkHub);
    let link = "_pwr_link";
    assert_eq!(
        hub.blocks.get("(bridge)pwr"),
        Some(&BlockLike::LibElem(LibraryPath::new(
            "power.VoltageSinkBridge"
        )))
    );
    assert_eq!(
        constraint_names(&hub),
        vec![
            "(reqd)pwr",
            "(init)l1.draw",
            "(init)l2.draw",
            "(bridge)_pwr_link_b0",
            "(conn)_pwr_link_b0",
            "(conn)_pwr_link_d1",
            "(conn)_pwr_link_d2",
        ]
    );
    assert_eq!(
        hub.constraints["(bridge)_pwr_link_b0"],
        ValueExpr::Exported {
            exterior_port: path(&["pwr"]),
            internal_block_port: path(&["(bridge)pwr", "outer_port"]),
        }
    );
    assert_eq!(
        hub.constraints["(conn)_pwr_link_b0"],
        connected(path(&["(bridge)pwr", "inner_link"]), path(&[link, "source"]))
    );
}

/// A boundary source feeding loads: sources have no bridge.
struct SourceHub;

impl Block for SourceHub {
    type Io = HubIo;

    fn class_name(&self) -> String {
        "power.SourceHub".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<HubIo> {
        let pwr = b.declare_port("pwr", VoltageSource::empty())?;
        Ok(HubIo { pwr })
    }

    fn contents(&self, io: &HubIo, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let l1 = b.declare_block("l1", Load::new(range(0.0, 1.0)))?;
        b.connect(&[io.pwr, l1.io.pwr])
    }
}

#[test]
fn missing_bridge() {
    let err = elaborate(SourceHub, ElabMode::Library).unwrap_err();
    assert!(
        matches!(&err, BuildError::MissingBridge { port_class, .. } if port_class == "power.VoltageSource"),
        "{err}"
    );
}

/// Connects a boundary port with an initializer to an interior port.
struct InitializedBoundary;

impl Block for InitializedBoundary {
    type Io = (PortId, PortId);

    fn class_name(&self) -> String {
        "power.InitializedBoundary".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<(PortId, PortId)> {
        let pwr = b.declare_port("pwr", VoltageSink::new(range(0.0, 1.0)))?;
        let load = b.declare_block("load", Load::new(range(0.0, 1.0)))?;
        Ok((pwr, load.io.pwr))
    }

    fn contents(&self, io: &(PortId, PortId), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        b.connect(&[io.0, io.1])
    }
}

#[test]
fn boundary_initializer_blocks_export() {
    let err = elaborate(InitializedBoundary, ElabMode::Library).unwrap_err();
    assert!(matches!(err, BuildError::BoundaryInitializer { .. }), "{err}");
}

/// Two supplies on one net.
struct TwoSupplies;

impl Block for TwoSupplies {
    type Io = ();

    fn class_name(&self) -> String {
        "power.TwoSupplies".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let a = b.declare_block("a", Supply)?;
        let c = b.declare_block("c", Supply)?;
        let l = b.declare_block("l", Load::new(range(0.0, 1.0)))?;
        b.connect(&[a.io.out, l.io.pwr, c.io.out])
    }
}

#[test]
fn single_slots_are_consumed_once() {
    let err = elaborate(TwoSupplies, ElabMode::Library).unwrap_err();
    assert!(
        matches!(&err, BuildError::Unconnectable { port, .. } if port == "c.out"),
        "{err}"
    );
}

/// Merges three connect calls into one connection.
struct Merged;

impl Block for Merged {
    type Io = ();

    fn class_name(&self) -> String {
        "power.Merged".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let l1 = b.declare_block("l1", Load::new(range(0.0, 1.0)))?;
        let l2 = b.declare_block("l2", Load::new(range(0.0, 1.0)))?;
        let l3 = b.declare_block("l3", Load::new(range(0.0, 1.0)))?;
        let s = b.declare_block("s", Supply)?;
        b.connect(&[l1.io.pwr, l2.io.pwr])?;
        b.connect(&[s.io.out, l3.io.pwr])?;
        b.connect(&[l2.io.pwr, s.io.out])
    }
}

#[test]
fn merged_connections_keep_registration_order() {
    let merged = block(Merged);
    let link = "_l1_pwr_link";
    assert_eq!(merged.links.keys().collect::<Vec<_>>(), vec![link]);
    let joins: Vec<&ValueExpr> = merged
        .constraints
        .iter()
        .filter(|(name, _)| name.starts_with("(conn)"))
        .map(|(_, expr)| expr)
        .collect();
    assert_eq!(
        joins,
        vec![
            &connected(path(&["l1", "pwr"]), alloc(&[link, "sinks"])),
            &connected(path(&["l2", "pwr"]), alloc(&[link, "sinks"])),
            &connected(path(&["s", "out"]), path(&[link, "source"])),
            &connected(path(&["l3", "pwr"]), alloc(&[link, "sinks"])),
        ]
    );
}

struct SignalLink;

impl Block for SignalLink {
    type Io = ();

    fn class_name(&self) -> String {
        "signal.SignalLink".into()
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Link
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }
}

struct SignalPin;

impl Port for SignalPin {
    fn class_name(&self) -> String {
        "signal.SignalPin".into()
    }

    fn link_type(&self) -> Option<Rc<dyn DynBlock>> {
        Some(Rc::new(SignalLink))
    }
}

/// Two interior ports of different link types.
struct Crossed;

struct PinHolder;

impl Block for PinHolder {
    type Io = PortId;

    fn class_name(&self) -> String {
        "signal.PinHolder".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<PortId> {
        b.declare_port("pin", SignalPin)
    }
}

impl Block for Crossed {
    type Io = ();

    fn class_name(&self) -> String {
        "test.Crossed".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let load = b.declare_block("load", Load::new(range(0.0, 1.0)))?;
        let holder = b.declare_block("holder", PinHolder)?;
        b.connect(&[load.io.pwr, holder.io])
    }
}

#[test]
fn different_link_types_are_ambiguous() {
    let err = elaborate(Crossed, ElabMode::Library).unwrap_err();
    assert!(
        matches!(&err, BuildError::AmbiguousLink { classes, .. }
            if classes == "power.PowerLink, signal.SignalLink"),
        "{err}"
    );
}

struct PadHolder;

impl Block for PadHolder {
    type Io = PortId;

    fn class_name(&self) -> String {
        "test.PadHolder".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<PortId> {
        b.declare_port("pad", Pad)
    }
}

/// Two interior ports with no link type.
struct Pads;

impl Block for Pads {
    type Io = ();

    fn class_name(&self) -> String {
        "test.Pads".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let a = b.declare_block("a", PadHolder)?;
        let c = b.declare_block("c", PadHolder)?;
        b.connect(&[a.io, c.io])
    }
}

#[test]
fn ports_without_link_type_are_unconnectable() {
    let err = elaborate(Pads, ElabMode::Library).unwrap_err();
    assert!(
        matches!(&err, BuildError::Unconnectable { port, .. } if port == "a.pad"),
        "{err}"
    );
}

/// Reaches into a grandchild's port.
struct Reacher;

impl Block for Reacher {
    type Io = ();

    fn class_name(&self) -> String {
        "test.Reacher".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let wrapper = b.declare_block("w", LoadWrapper)?;
        let supply = b.declare_block("s", Supply)?;
        b.connect(&[supply.io.out, wrapper.io.pwr])?;
        b.connect(&[supply.io.out, wrapper.io.inner])
    }
}

#[test]
fn grandchild_ports_are_inaccessible() {
    let err = elaborate(Reacher, ElabMode::Library).unwrap_err();
    assert!(
        matches!(&err, BuildError::InaccessiblePort { class, .. } if class == "test.Reacher"),
        "{err}"
    );
}

/// Declares a port after `init`.
struct LatePort;

impl Block for LatePort {
    type Io = ();

    fn class_name(&self) -> String {
        "test.LatePort".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        b.declare_port("late", VoltageSink::empty())?;
        Ok(())
    }
}

#[test]
fn declarations_are_bound_to_their_phase() {
    let err = elaborate(LatePort, ElabMode::Library).unwrap_err();
    assert!(
        matches!(err, BuildError::Lifecycle { call: "declare_port", .. }),
        "{err}"
    );
}

#[test]
fn top_mode_records_constructor_literals() {
    let load = match elaborate(Load::new(range(0.0, 1.0)), ElabMode::Top).unwrap() {
        LibraryElement::Block(block) => block,
        other => panic!("expected a block, got {other:?}"),
    };
    assert_eq!(
        constraint_names(&load),
        vec!["(reqd)pwr", "(top_init)draw", "(init)pwr.current_draw"]
    );
    assert_eq!(
        load.constraints["(init)pwr.current_draw"],
        ValueExpr::Assign {
            dst: path(&["pwr", "current_draw"]),
            src: Box::new(ValueExpr::Ref(path(&["draw"]))),
        }
    );

    let library = block(Load::new(range(0.0, 1.0)));
    assert!(!library.constraints.contains_key("(top_init)draw"));
}

/// Sizes its load from a parameter of its own.
struct BudgetBoard;

impl Block for BudgetBoard {
    type Io = NodeId;

    fn class_name(&self) -> String {
        "power.BudgetBoard".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<NodeId> {
        b.declare_param("budget", ParamType::Range)
    }

    fn contents(&self, budget: &NodeId, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        b.declare_block("load", Load::new(*budget))?;
        Ok(())
    }
}

#[test]
fn top_mode_rejects_expression_arguments() {
    let mut library = BlockLibrary::new();
    library.register_block(BudgetBoard);
    library.element(&LibraryPath::new("power.BudgetBoard")).unwrap();

    // the load definition seen inside the board carries the board's node
    let err = library.top(&LibraryPath::new("power.Load")).unwrap_err();
    assert!(
        matches!(err, BuildError::Structural { ref message, .. } if message.contains("must be a literal")),
        "{err}"
    );
    let LibraryElement::Block(load) = library.element(&LibraryPath::new("power.Load")).unwrap()
    else {
        panic!("power.Load should be a block");
    };
    assert!(load.params.contains_key("draw"));
    assert!(!load.constraints.contains_key("(top_init)draw"));
}

#[test]
fn elaboration_is_deterministic() {
    let a = elaborate(Board { loads: 3 }, ElabMode::Library).unwrap();
    let b = elaborate(Board { loads: 3 }, ElabMode::Library).unwrap();
    assert_eq!(a, b);
}

struct VectorSupplyIo {
    outs: PortId,
}

/// A supply with one output per rail.
struct VectorSupply;

impl Block for VectorSupply {
    type Io = VectorSupplyIo;

    fn class_name(&self) -> String {
        "power.VectorSupply".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<VectorSupplyIo> {
        let outs = b.declare_port("outs", Vector::of(VoltageSource::empty()))?;
        Ok(VectorSupplyIo { outs })
    }
}

struct VectorLoadIo {
    pwrs: PortId,
}

/// A load with one input per rail.
struct VectorLoad;

impl Block for VectorLoad {
    type Io = VectorLoadIo;

    fn class_name(&self) -> String {
        "power.VectorLoad".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<VectorLoadIo> {
        let pwrs = b.declare_port("pwrs", Vector::of(VoltageSink::empty()))?;
        Ok(VectorLoadIo { pwrs })
    }
}

#[derive(Clone, Copy)]
enum Rails {
    /// Vector supply to vector load, one link per element.
    Array,
    /// Single supply into a vector load without flatten.
    Mixed,
    /// Single supply into a vector load, flattened into one link.
    Flattened,
    /// Vector supply flattened into a single load.
    FlattenedSources,
}

struct RailBoard(Rails);

impl Block for RailBoard {
    type Io = ();

    fn class_name(&self) -> String {
        "power.RailBoard".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let load = b.declare_block("load", VectorLoad)?;
        match self.0 {
            Rails::Array => {
                let supply = b.declare_block("supply", VectorSupply)?;
                b.connect(&[supply.io.outs, load.io.pwrs])
            }
            Rails::Mixed => {
                let supply = b.declare_block("supply", Supply)?;
                b.connect(&[supply.io.out, load.io.pwrs])
            }
            Rails::Flattened => {
                let supply = b.declare_block("supply", Supply)?;
                b.connect_flatten(&[supply.io.out, load.io.pwrs])
            }
            Rails::FlattenedSources => {
                let supply = b.declare_block("supply", VectorSupply)?;
                let single = b.declare_block("single", Load::new(range(0.0, 1.0)))?;
                b.connect_flatten(&[supply.io.outs, single.io.pwr])
            }
        }
    }
}

/// Passes its rails straight through to an inner vector load.
struct RailHub;

impl Block for RailHub {
    type Io = VectorLoadIo;

    fn class_name(&self) -> String {
        "power.RailHub".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<VectorLoadIo> {
        let pwrs = b.declare_port("pwrs", Vector::of(VoltageSink::empty()))?;
        Ok(VectorLoadIo { pwrs })
    }

    fn contents(&self, io: &VectorLoadIo, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let load = b.declare_block("load", VectorLoad)?;
        b.connect_flatten(&[io.pwrs, load.io.pwrs])
    }
}

#[test]
fn vectors_without_flatten_share_a_link_array() {
    let board = block(RailBoard(Rails::Array));
    let link = "_supply_outs_link";
    assert_eq!(
        board.links.get(link),
        Some(&LinkLike::Array(volta_ir::LinkArray {
            self_class: LibraryPath::new("power.PowerLink"),
            links: Default::default(),
        }))
    );
    assert_eq!(
        board.constraints[&format!("(conn){link}_d0")],
        ValueExpr::ConnectedArray {
            block_port: path(&["supply", "outs"]),
            link_port: path(&[link, "source"]),
        }
    );
    assert_eq!(
        board.constraints[&format!("(conn){link}_d1")],
        ValueExpr::ConnectedArray {
            block_port: path(&["load", "pwrs"]),
            link_port: alloc(&[link, "sinks"]),
        }
    );
}

#[test]
fn vector_and_single_need_flatten() {
    match elaborate(RailBoard(Rails::Mixed), ElabMode::Library) {
        Err(BuildError::Unconnectable { port, reason }) => {
            assert!(port.contains("out"), "{port}");
            assert!(reason.contains("flatten"), "{reason}");
        }
        other => panic!("expected an unconnectable port, got {other:?}"),
    }
}

#[test]
fn flattened_vector_joins_one_plain_link() {
    let board = block(RailBoard(Rails::Flattened));
    let link = "_supply_out_link";
    assert_eq!(
        board.links.get(link),
        Some(&LinkLike::LibElem(LibraryPath::new("power.PowerLink")))
    );
    assert_eq!(
        board.constraints[&format!("(conn){link}_d0")],
        connected(path(&["supply", "out"]), path(&[link, "source"]))
    );
    assert_eq!(
        board.constraints[&format!("(conn){link}_d1")],
        ValueExpr::ConnectedArray {
            block_port: path(&["load", "pwrs"]),
            link_port: alloc(&[link, "sinks"]),
        }
    );
}

#[test]
fn flattened_vector_cannot_take_a_single_link_port() {
    match elaborate(RailBoard(Rails::FlattenedSources), ElabMode::Library) {
        Err(BuildError::Unconnectable { port, reason }) => {
            assert!(port.contains("outs"), "{port}");
            assert!(reason.contains("single link port source"), "{reason}");
        }
        other => panic!("expected an unconnectable port, got {other:?}"),
    }
}

#[test]
fn flattened_boundary_vector_is_exported() {
    let hub = block(RailHub);
    assert!(hub.links.is_empty(), "{:?}", hub.links);
    let exports: Vec<&ValueExpr> = hub
        .constraints
        .iter()
        .filter(|(name, _)| name.starts_with("(conn)"))
        .map(|(_, expr)| expr)
        .collect();
    assert_eq!(
        exports,
        vec![&ValueExpr::ExportedArray {
            exterior_port: path(&["pwrs"]),
            internal_block_port: path(&["load", "pwrs"]),
        }]
    );
}

proptest! {
    #[test]
    fn one_slot_per_single_port(loads in 1usize..12) {
        let board = block(Board { loads });
        let link = "_supply_out_link";
        let joins: Vec<&ValueExpr> = board
            .constraints
            .iter()
            .filter(|(name, _)| name.starts_with("(conn)"))
            .map(|(_, expr)| expr)
            .collect();
        prop_assert_eq!(joins.len(), loads + 1);
        let to_source = joins
            .iter()
            .filter(|e| matches!(e, ValueExpr::Connected { link_port, .. } if *link_port == path(&[link, "source"])))
            .count();
        let to_sinks = joins
            .iter()
            .filter(|e| matches!(e, ValueExpr::Connected { link_port, .. } if *link_port == alloc(&[link, "sinks"])))
            .count();
        prop_assert_eq!(to_source, 1);
        prop_assert_eq!(to_sinks, loads);
        prop_assert_eq!(board.links.len(), 1);
    }
}
