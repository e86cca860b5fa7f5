//! Elaborating one class into its IR library element.

use crate::block::{BlockKind, DynBlock};
use crate::builder::{run_phase, CONTENTS_PHASE, GENERATE_PHASE, INIT_PHASE};
use crate::context::{BuildContext, PortParent};
use crate::emit;
use crate::error::{BuildError, BuildResult};
use crate::generator::GeneratorValues;
use crate::ids::BlockId;
use crate::port::{Port, PortTemplate};
use std::rc::Rc;
use volta_ir::LibraryElement;

/// How a block class is elaborated.
#[derive(Clone, Debug)]
pub enum ElabMode {
    /// The class as a library element; generators stop before `generate`.
    Library,
    /// The class as the top of a design, with its literal constructor arguments.
    Top,
    /// A generator run with solved inputs.
    Generate(GeneratorValues),
}

/// An elaborated element and the definitions it refers to.
pub struct Elaborated {
    /// The IR element.
    pub element: LibraryElement,
    /// Block, link, bridge, and adapter definitions referenced by the element.
    pub block_defs: Vec<Rc<dyn DynBlock>>,
    /// Port definitions referenced by the element.
    pub port_defs: Vec<Rc<dyn Port>>,
}

fn check_kind_ports(ctx: &BuildContext, def: &dyn DynBlock, root: BlockId) -> BuildResult<()> {
    let required: &[&str] = match def.kind() {
        BlockKind::Bridge => &["outer_port", "inner_link"],
        BlockKind::Adapter => &["src", "dst"],
        BlockKind::Hierarchy | BlockKind::Link => &[],
    };
    for name in required {
        if !ctx.blocks[root].ports.contains_key(*name) {
            return Err(BuildError::structural(
                def.class_name(),
                format!("{:?} blocks must declare port {name}", def.kind()),
            ));
        }
    }
    Ok(())
}

/// Runs the lifecycle of `def` and emits its library element.
pub fn elaborate_block(def: Rc<dyn DynBlock>, mode: ElabMode) -> BuildResult<Elaborated> {
    log::debug!("elaborating block {} ({mode:?})", def.class_name());
    let mut ctx = BuildContext::new();
    let generate = matches!(mode, ElabMode::Generate(_));
    if let ElabMode::Generate(values) = &mode {
        ctx.generator_values = Some(values.clone());
    }
    ctx.top = matches!(mode, ElabMode::Top);
    let root = ctx.alloc_block(def.clone(), None);
    let io = run_phase(&mut ctx, root, INIT_PHASE, |b| def.init_dyn(b))?;
    run_phase(&mut ctx, root, CONTENTS_PHASE, |b| def.contents_dyn(&*io, b))?;
    if generate {
        if ctx.blocks[root].generator.is_none() {
            return Err(BuildError::structural(
                def.class_name(),
                "generate requested for a block that is not a generator",
            ));
        }
        run_phase(&mut ctx, root, GENERATE_PHASE, |b| def.generate_dyn(&*io, b))?;
    }
    check_kind_ports(&ctx, def.as_ref(), root)?;
    let element = emit::emit(&mut ctx, root, matches!(mode, ElabMode::Top), generate)?;
    Ok(Elaborated {
        element,
        block_defs: ctx.block_defs,
        port_defs: ctx.port_defs,
    })
}

/// Emits the library element of a port or bundle class.
pub fn elaborate_port(def: Rc<dyn Port>) -> BuildResult<Elaborated> {
    log::debug!("elaborating port {}", def.class_name());
    let mut ctx = BuildContext::new();
    let port = ctx.instantiate_port(&PortTemplate::Single(def), PortParent::Template, false)?;
    let element = emit::port_element(&ctx, port);
    let mut port_defs = ctx.port_defs;
    port_defs.retain(|p| p.class_name() != element.self_class().name);
    Ok(Elaborated {
        element,
        block_defs: ctx.block_defs,
        port_defs,
    })
}
