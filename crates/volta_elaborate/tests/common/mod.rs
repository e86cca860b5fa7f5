//! A power-distribution library with generators, shared by the compile tests.

#![allow(dead_code)]

use std::rc::Rc;
use volta_common::Range;
use volta_core::{
    Block, BlockBuilder, BlockKind, BlockLibrary, BuildError, BuildResult, DynBlock, Expr,
    ExprArg, NodeId, Port, PortBuilder, PortId, Vector,
};
use volta_ir::{ParamType, ReductionOp};

pub fn range(lower: f64, upper: f64) -> Range {
    Range::new(lower, upper).unwrap()
}

pub struct VoltageSource {
    pub voltage_out: Option<ExprArg>,
}

impl Port for VoltageSource {
    fn class_name(&self) -> String {
        "power.VoltageSource".into()
    }

    fn declare(&self, p: &mut PortBuilder<'_>) -> BuildResult<()> {
        match &self.voltage_out {
            Some(v) => p.declare_param_init("voltage_out", ParamType::Range, v.clone())?,
            None => p.declare_param("voltage_out", ParamType::Range)?,
        };
        Ok(())
    }

    fn link_type(&self) -> Option<Rc<dyn DynBlock>> {
        Some(Rc::new(PowerLink))
    }
}

pub struct VoltageSink {
    pub current_draw: Option<ExprArg>,
}

impl Port for VoltageSink {
    fn class_name(&self) -> String {
        "power.VoltageSink".into()
    }

    fn declare(&self, p: &mut PortBuilder<'_>) -> BuildResult<()> {
        match &self.current_draw {
            Some(i) => p.declare_param_init("current_draw", ParamType::Range, i.clone())?,
            None => p.declare_param("current_draw", ParamType::Range)?,
        };
        Ok(())
    }

    fn link_type(&self) -> Option<Rc<dyn DynBlock>> {
        Some(Rc::new(PowerLink))
    }

    fn bridge_type(&self) -> Option<Rc<dyn DynBlock>> {
        Some(Rc::new(VoltageSinkBridge))
    }
}

pub struct PowerLinkIo {
    pub source: PortId,
    pub sinks: PortId,
    pub voltage: NodeId,
    pub current_drawn: NodeId,
}

pub struct PowerLink;

impl Block for PowerLink {
    type Io = PowerLinkIo;

    fn class_name(&self) -> String {
        "power.PowerLink".into()
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Link
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<PowerLinkIo> {
        let source = b.declare_port("source", VoltageSource { voltage_out: None })?;
        let sinks = b.declare_port("sinks", Vector::of(VoltageSink { current_draw: None }))?;
        let voltage = b.declare_param("voltage", ParamType::Range)?;
        let current_drawn = b.declare_param("current_drawn", ParamType::Range)?;
        Ok(PowerLinkIo {
            source,
            sinks,
            voltage,
            current_drawn,
        })
    }

    fn contents(&self, io: &PowerLinkIo, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let source_voltage = b.param(io.source, "voltage_out")?;
        b.assign(io.voltage, source_voltage)?;

        let draws = b.map_extract(io.sinks, &["current_draw"])?;
        let total = b.expr(Expr::Reduce(ReductionOp::Sum, draws.into()))?;
        b.assign(io.current_drawn, total)
    }
}

pub struct VoltageSinkBridge;

impl Block for VoltageSinkBridge {
    type Io = ();

    fn class_name(&self) -> String {
        "power.VoltageSinkBridge".into()
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Bridge
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let outer = b.declare_port("outer_port", VoltageSink { current_draw: None })?;
        let inner = b.declare_port("inner_link", VoltageSource { voltage_out: None })?;
        let drawn = b.link_param(inner, "current_drawn", ParamType::Range)?;
        let draw = b.param(outer, "current_draw")?;
        b.assign(draw, drawn)
    }
}

pub struct SupplyIo {
    pub out: PortId,
}

/// A fixed 5V supply.
pub struct Supply;

impl Block for Supply {
    type Io = SupplyIo;

    fn class_name(&self) -> String {
        "power.Supply".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<SupplyIo> {
        let out = b.declare_port(
            "out",
            VoltageSource {
                voltage_out: Some(range(4.5, 5.5).into()),
            },
        )?;
        Ok(SupplyIo { out })
    }
}

pub struct LoadIo {
    pub pwr: PortId,
}

fn load_init(b: &mut BlockBuilder<'_>, draw: ExprArg) -> BuildResult<LoadIo> {
    let draw = b.lift_to_parameter("draw", ParamType::Range, draw)?;
    let pwr = b.declare_port(
        "pwr",
        VoltageSink {
            current_draw: Some(draw.into()),
        },
    )?;
    Ok(LoadIo { pwr })
}

/// A sink drawing a current given by its constructor.
pub struct Load {
    pub draw: ExprArg,
}

impl Load {
    pub fn new(draw: impl Into<ExprArg>) -> Self {
        Self { draw: draw.into() }
    }
}

impl Block for Load {
    type Io = LoadIo;

    fn class_name(&self) -> String {
        "power.Load".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<LoadIo> {
        load_init(b, self.draw.clone())
    }
}

/// A drop-in replacement for [`Load`].
pub struct QuietLoad;

impl Block for QuietLoad {
    type Io = LoadIo;

    fn class_name(&self) -> String {
        "power.QuietLoad".into()
    }

    fn superclasses(&self) -> Vec<String> {
        vec!["power.Load".into()]
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<LoadIo> {
        load_init(b, range(0.0, 0.1).into())
    }
}

/// Shaped like [`Load`] without deriving from it.
pub struct LookalikeLoad;

impl Block for LookalikeLoad {
    type Io = LoadIo;

    fn class_name(&self) -> String {
        "power.LookalikeLoad".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<LoadIo> {
        load_init(b, range(0.0, 0.1).into())
    }
}

pub struct ChainIo {
    pub pwr: PortId,
    pub count: NodeId,
}

/// `count` loads drawing `[0, 1]` each behind one sink port.
pub struct LoadChain;

impl Block for LoadChain {
    type Io = ChainIo;

    fn class_name(&self) -> String {
        "power.LoadChain".into()
    }

    fn init(&self, b: &mut BlockBuilder<'_>) -> BuildResult<ChainIo> {
        let pwr = b.declare_port("pwr", VoltageSink { current_draw: None })?;
        let count = b.declare_param("count", ParamType::Int)?;
        b.generator(&[count])?;
        Ok(ChainIo { pwr, count })
    }

    fn generate(&self, io: &ChainIo, b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let count = b.get_int(io.count)?;
        if count < 0 {
            return Err(BuildError::generator(
                Block::class_name(self),
                format!("count must not be negative, got {count}"),
            ));
        }
        let mut ports = vec![io.pwr];
        for i in 0..count {
            let load = b.declare_block(&format!("l{i}"), Load::new(range(0.0, 1.0)))?;
            ports.push(load.io.pwr);
        }
        if ports.len() > 1 {
            b.connect(&ports)?;
        }
        Ok(())
    }
}

/// A supply feeding one load and one [`LoadChain`] per entry of `chains`,
/// each given its count when the entry is set.
pub struct ChainBoard {
    pub chains: Vec<Option<i64>>,
}

impl Block for ChainBoard {
    type Io = ();

    fn class_name(&self) -> String {
        "power.ChainBoard".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let supply = b.declare_block("supply", Supply)?;
        let load = b.declare_block("l1", Load::new(range(0.0, 1.0)))?;
        let mut ports = vec![supply.io.out, load.io.pwr];
        for (i, count) in self.chains.iter().enumerate() {
            let name = if i == 0 { "chain".to_string() } else { format!("chain{i}") };
            let chain = b.declare_block(&name, LoadChain)?;
            if let Some(count) = count {
                b.assign(chain.io.count, *count)?;
            }
            ports.push(chain.io.pwr);
        }
        b.connect(&ports)
    }
}

pub fn library(chains: Vec<Option<i64>>) -> BlockLibrary {
    let mut library = BlockLibrary::new();
    library.register_block(ChainBoard { chains });
    library.register_block(QuietLoad);
    library.register_block(LookalikeLoad);
    library
}
