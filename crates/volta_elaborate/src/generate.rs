//! The generator transform: runs generators once their inputs are known.
//!
//! Generators appear in an instantiated design as stubs that list the values
//! they need. [`GeneratorTransform`] repeatedly picks a pending generator
//! whose inputs the propagation engine can supply, runs it through the
//! library, checks that the interface is unchanged, and splices the result
//! in. The new contents are instantiated and fed to the engine before the
//! next generator is picked, so generators whose inputs depend on other
//! generators run after them.
//!
//! Results are memoized by class and input values: two instances of the same
//! generator with equal inputs run the body once.

use crate::error::{ElaborateError, ElaborateResult};
use crate::instantiate::Instantiator;
use crate::refinement;
use std::collections::HashMap;
use volta_common::{ContentHash, InternalError};
use volta_constprop::ConstProp;
use volta_core::{GeneratorValues, LibrarySource};
use volta_diagnostics::DiagnosticSink;
use volta_ir::{sub_blocks, Design, DesignPath, HierarchyBlock, LibraryPath, LocalPath, ValueLit};

/// Runs the generators of a design.
pub struct GeneratorTransform<'a> {
    library: &'a dyn LibrarySource,
    sink: &'a DiagnosticSink,
    continue_on_error: bool,
    memo: HashMap<ContentHash, HierarchyBlock>,
    runs: usize,
    /// Refinement values naming parameters not instantiated yet.
    values: Vec<(String, ValueLit)>,
}

impl<'a> GeneratorTransform<'a> {
    /// Creates a transform. With `continue_on_error`, a generator whose
    /// inputs or body fail is left as a stub instead of stopping the run.
    pub fn new(
        library: &'a dyn LibrarySource,
        sink: &'a DiagnosticSink,
        continue_on_error: bool,
    ) -> Self {
        Self {
            library,
            sink,
            continue_on_error,
            memo: HashMap::new(),
            runs: 0,
            values: Vec::new(),
        }
    }

    /// Forces dotted parameter paths to literal values as soon as the
    /// parameters they name exist.
    pub fn with_values(mut self, values: Vec<(String, ValueLit)>) -> Self {
        self.values = values;
        self
    }

    /// Values whose parameter never appeared.
    pub fn unresolved_values(&self) -> &[(String, ValueLit)] {
        &self.values
    }

    /// How many generator bodies have run, memoized results excluded.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Runs every pending generator of `design`, including generators that
    /// only appear in generated contents.
    pub fn run(
        &mut self,
        design: &mut Design,
        inst: &mut Instantiator<'_>,
        prop: &mut ConstProp,
    ) -> ElaborateResult<()> {
        loop {
            self.apply_values(design, prop);
            let pending = pending_generators(design);
            let next = pending
                .iter()
                .find(|path| inputs_known(design, prop, path))
                .or(pending.first())
                .cloned();
            let Some(path) = next else {
                return Ok(());
            };
            self.expand(design, inst, prop, &path)?;
        }
    }

    fn apply_values(&mut self, design: &Design, prop: &mut ConstProp) {
        if self.values.is_empty() {
            return;
        }
        let (resolved, rest) = refinement::resolve_values(design, &self.values, self.sink);
        for (path, value) in resolved {
            log::debug!("refinement sets {path} = {value}");
            prop.set_value(path, &value);
        }
        self.values = rest;
    }

    fn expand(
        &mut self,
        design: &mut Design,
        inst: &mut Instantiator<'_>,
        prop: &mut ConstProp,
        path: &DesignPath,
    ) -> ElaborateResult<()> {
        let stub = design
            .block(path)
            .cloned()
            .ok_or_else(|| InternalError::new(format!("no generator at {path}")))?;
        let required = required_of(design, path);
        let generated = gather_inputs(design, prop, path, &required)
            .and_then(|values| self.generate(path, &stub.self_class, &values));
        let generated = match generated {
            Ok(generated) => generated,
            Err(err) => return self.give_up(design, path, err),
        };
        let block = splice(path, &stub, generated)?;

        let slot = design
            .block_mut(path)
            .ok_or_else(|| InternalError::new(format!("no generator at {path}")))?;
        *slot = block;
        inst.instantiate_at(design, path)?;
        match parent_block(path) {
            Some(parent) => {
                inst.expand_pending(design, &parent)?;
                prop.add_subtree(design, &parent);
            }
            None => prop.add_subtree(design, path),
        }
        Ok(())
    }

    fn generate(
        &mut self,
        path: &DesignPath,
        class: &LibraryPath,
        values: &GeneratorValues,
    ) -> ElaborateResult<HierarchyBlock> {
        let key = memo_key(class, values)?;
        if let Some(block) = self.memo.get(&key) {
            log::debug!("generator {path} ({class}): reusing result {key}");
            return Ok(block.clone());
        }
        log::debug!("generator {path} ({class}): running with {} inputs", values.len());
        let block = self
            .library
            .generate(class, values)
            .map_err(|source| ElaborateError::Generator {
                path: path.clone(),
                source,
            })?;
        self.runs += 1;
        self.memo.insert(key, block.clone());
        Ok(block)
    }

    /// Leaves the generator at `path` as a stub, or stops the run.
    fn give_up(&self, design: &mut Design, path: &DesignPath, err: ElaborateError) -> ElaborateResult<()> {
        if !self.continue_on_error || !err.is_generator_local() {
            return Err(err);
        }
        log::warn!("leaving generator {path} unexpanded: {err}");
        self.sink.emit(err.to_diagnostic());
        if let Some(block) = design.block_mut(path) {
            block.meta.errors.insert("generator".to_string(), err.to_string());
            if let Some(info) = &mut block.generator {
                info.done = true;
            }
        }
        Ok(())
    }
}

/// Pending generators, parents first.
fn pending_generators(design: &Design) -> Vec<DesignPath> {
    fn visit(path: DesignPath, block: &HierarchyBlock, out: &mut Vec<DesignPath>) {
        if block.generator_pending() {
            out.push(path.clone());
        }
        for (name, child) in sub_blocks(block) {
            visit(path.append_block(name), child, out);
        }
    }
    let mut out = Vec::new();
    visit(DesignPath::root(), &design.contents, &mut out);
    out
}

fn required_of(design: &Design, path: &DesignPath) -> Vec<LocalPath> {
    design
        .block(path)
        .and_then(|block| block.generator.as_ref())
        .map(|info| info.required.clone())
        .unwrap_or_default()
}

fn inputs_known(design: &Design, prop: &ConstProp, path: &DesignPath) -> bool {
    required_of(design, path).iter().all(|input| {
        prop.resolve_at(design, path, input)
            .is_some_and(|value| !value.is_error())
    })
}

fn gather_inputs(
    design: &Design,
    prop: &ConstProp,
    path: &DesignPath,
    required: &[LocalPath],
) -> ElaborateResult<GeneratorValues> {
    let mut values = GeneratorValues::new();
    for input in required {
        let value = prop
            .resolve_at(design, path, input)
            .ok_or_else(|| ElaborateError::MissingInput {
                path: path.clone(),
                input: input.clone(),
            })?;
        let lit = value
            .to_lit()
            .filter(|_| !value.is_error())
            .ok_or_else(|| ElaborateError::ErroneousInput {
                path: path.clone(),
                input: input.clone(),
                desc: value.to_string(),
            })?;
        values.insert(input.clone(), lit);
    }
    Ok(values)
}

/// The generated block, checked against its stub and carrying the stub's
/// bookkeeping.
fn splice(path: &DesignPath, stub: &HierarchyBlock, mut generated: HierarchyBlock) -> ElaborateResult<HierarchyBlock> {
    let stub_ports: Vec<&String> = stub.ports.keys().collect();
    let generated_ports: Vec<&String> = generated.ports.keys().collect();
    if stub_ports != generated_ports {
        return Err(ElaborateError::StructureMismatch {
            path: path.clone(),
            detail: format!("ports {stub_ports:?} became {generated_ports:?}"),
        });
    }
    if stub.params != generated.params {
        let stub_params: Vec<&String> = stub.params.keys().collect();
        let generated_params: Vec<&String> = generated.params.keys().collect();
        return Err(ElaborateError::StructureMismatch {
            path: path.clone(),
            detail: format!("parameters {stub_params:?} became {generated_params:?}"),
        });
    }
    generated.superclasses = stub.superclasses.clone();
    generated.meta.refinement_original = stub.meta.refinement_original.clone();
    match &mut generated.generator {
        Some(info) => info.done = true,
        None => generated.generator = stub.generator.clone().map(|mut info| {
            info.done = true;
            info
        }),
    }
    Ok(generated)
}

fn parent_block(path: &DesignPath) -> Option<DesignPath> {
    let (_, parent) = path.blocks.split_last()?;
    Some(DesignPath::of_blocks(parent))
}

fn memo_key(class: &LibraryPath, values: &GeneratorValues) -> ElaborateResult<ContentHash> {
    let encoded = bincode::serde::encode_to_vec(values, bincode::config::standard())
        .map_err(|err| InternalError::new(format!("cannot encode generator inputs: {err}")))?;
    Ok(ContentHash::from_bytes(class.name.as_bytes()).combine(ContentHash::from_bytes(&encoded)))
}
