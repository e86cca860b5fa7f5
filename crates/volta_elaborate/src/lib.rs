//! Instantiation, generator expansion, and the compile driver.
//!
//! Turns the top block of a library into a fully instantiated, solved design:
//! library references are replaced by instances (after refinements), vector
//! connections are expanded per element, generators run once the propagation
//! engine knows their inputs, and the solved values are checked and written
//! back. Design problems are reported to the [`DiagnosticSink`]; only bugs in
//! Volta return `Err`.
//!
//! # Usage
//!
//! ```ignore
//! let project = refinement::from_config(&config.refinements, &sink);
//! let options = CompileOptions::from_project(project, resolved.continue_on_error);
//! let compiled = compile(&library, &LibraryPath::new("boards.Blinky"), &options, &sink)?;
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod errors;
pub mod generate;
pub mod instantiate;
pub mod refinement;

pub use backend::{Backend, SolvedValues};
pub use error::{ElaborateError, ElaborateResult};
pub use generate::GeneratorTransform;
pub use instantiate::Instantiator;
pub use refinement::ProjectRefinements;

use volta_common::VoltaResult;
use volta_constprop::ConstProp;
use volta_core::LibrarySource;
use volta_diagnostics::DiagnosticSink;
use volta_ir::{Design, DesignPath, HierarchyBlock, LibraryPath, Refinements, ValueLit};

/// Options for one compile.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Substitutions and value overrides applied over the top block's own.
    pub refinements: Refinements,
    /// Value overrides keyed by dotted parameter path.
    pub values: Vec<(String, ValueLit)>,
    /// Leave failing generators as stubs instead of stopping.
    pub continue_on_error: bool,
}

impl CompileOptions {
    /// Options carrying a project's refinements.
    pub fn from_project(project: ProjectRefinements, continue_on_error: bool) -> Self {
        Self {
            refinements: project.refinements,
            values: project.values,
            continue_on_error,
        }
    }
}

/// A compiled design.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    /// The instantiated design with solved values written back and errors
    /// recorded in element metadata.
    pub design: Design,
    /// Every solved parameter, ordered by path.
    pub values: Vec<(DesignPath, ValueLit)>,
    /// The refinements in effect: the top block's defaults overridden by the
    /// compile options.
    pub refinements: Refinements,
    /// How many generator bodies ran.
    pub generator_runs: usize,
}

/// Compiles the block `top` of `library`.
///
/// Returns `Ok(None)` when an error stopped compilation before a design could
/// be produced; the reason has been emitted to `sink`. A returned design may
/// still carry reported errors, such as failed constraints.
pub fn compile(
    library: &dyn LibrarySource,
    top: &LibraryPath,
    options: &CompileOptions,
    sink: &DiagnosticSink,
) -> VoltaResult<Option<Compiled>> {
    let (contents, mut refinements) = match library.top(top) {
        Ok(found) => found,
        Err(err) => {
            sink.emit(errors::error_top(&top.name, &err));
            // Return no design; the diagnostic says why
            return Ok(None);
        }
    };
    refinements.merge(&options.refinements);
    log::debug!("compiling {top} with {} class and {} instance refinements",
        refinements.classes.len(),
        refinements.instances.len()
    );

    let (design, prop, generator_runs) =
        match elaborate(library, contents, &refinements, options, sink) {
            Ok(done) => done,
            Err(ElaborateError::Internal(err)) => return Err(err),
            Err(err) => {
                sink.emit(err.to_diagnostic());
                return Ok(None);
            }
        };

    let checked = prop.check(&design, sink);
    let solved = prop.write_solved(&checked);
    let values = prop.param_values();
    log::debug!(
        "compiled {top}: {} solved values, {generator_runs} generator runs",
        values.len()
    );
    Ok(Some(Compiled {
        design: solved,
        values,
        refinements,
        generator_runs,
    }))
}

fn elaborate(
    library: &dyn LibrarySource,
    contents: HierarchyBlock,
    refinements: &Refinements,
    options: &CompileOptions,
    sink: &DiagnosticSink,
) -> ElaborateResult<(Design, ConstProp, usize)> {
    let mut inst = Instantiator::new(library, refinements, sink);
    let mut design = inst.transform(&Design::new(contents))?;

    let mut prop = ConstProp::from_design(&design);
    for (path, value) in &refinements.values {
        prop.set_value(path.clone(), value);
    }

    let mut generators = GeneratorTransform::new(library, sink, options.continue_on_error)
        .with_values(options.values.clone());
    generators.run(&mut design, &mut inst, &mut prop)?;
    for (dotted, _) in generators.unresolved_values() {
        sink.emit(errors::error_unknown_refinement_value(dotted));
    }
    inst.finish();
    Ok((design, prop, generators.runs()))
}
