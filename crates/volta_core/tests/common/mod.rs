//! A small power-distribution library shared by the scenario tests.

#![allow(dead_code)]

use std::rc::Rc;
use volta_common::Range;
use volta_core::{
    Block, BlockBuilder, BlockKind, BuildResult, DynBlock, Expr, ExprArg, NodeId, Port,
    PortBuilder, PortId, Vector,
};
use volta_ir::{ParamType, ReductionOp};

pub fn range(lower: f64, upper: f64) -> Range {
    Range::new(lower, upper).unwrap()
}

pub struct VoltageSource {
    pub voltage_out: Option<ExprArg>,
}

impl VoltageSource {
    pub fn new(voltage_out: impl Into<ExprArg>) -> Self {
        Self {
            voltage_out: Some(voltage_out.into()),
        }
    }

    pub fn empty() -> Self {
        Self { voltage_out: None }
    }
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

impl VoltageSink {
    pub fn new(current_draw: impl Into<ExprArg>) -> Self {
        Self {
            current_draw: Some(current_draw.into()),
        }
    }

    pub fn empty() -> Self {
        Self { current_draw: None }
    }
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

/// A port with no link at all.
pub struct Pad;

impl Port for Pad {
    fn class_name(&self) -> String {
        "power.Pad".into()
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
        let source = b.declare_port("source", VoltageSource::empty())?;
        let sinks = b.declare_port("sinks", Vector::of(VoltageSink::empty()))?;
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
        let outer = b.declare_port("outer_port", VoltageSink::empty())?;
        let inner = b.declare_port("inner_link", VoltageSource::empty())?;
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
        let out = b.declare_port("out", VoltageSource::new(range(4.5, 5.5)))?;
        Ok(SupplyIo { out })
    }
}

pub struct LoadIo {
    pub pwr: PortId,
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
        let draw = b.lift_to_parameter("draw", ParamType::Range, self.draw.clone())?;
        let pwr = b.declare_port("pwr", VoltageSink::new(draw))?;
        Ok(LoadIo { pwr })
    }
}

/// One supply feeding `loads` loads drawing `[0, i+1]` each.
pub struct Board {
    pub loads: usize,
}

impl Block for Board {
    type Io = ();

    fn class_name(&self) -> String {
        "power.Board".into()
    }

    fn init(&self, _b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        Ok(())
    }

    fn contents(&self, _io: &(), b: &mut BlockBuilder<'_>) -> BuildResult<()> {
        let supply = b.declare_block("supply", Supply)?;
        let mut ports = vec![supply.io.out];
        for i in 0..self.loads {
            let load = b.declare_block(&format!("l{}", i + 1), Load::new(range(0.0, i as f64 + 1.0)))?;
            ports.push(load.io.pwr);
        }
        b.connect(&ports)
    }
}
