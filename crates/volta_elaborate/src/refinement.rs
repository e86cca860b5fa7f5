//! Refinements from `volta.toml`.
//!
//! Class and instance substitutions convert directly. Value overrides are
//! kept as dotted paths until the design is instantiated, because the
//! elements they name only exist from then on.

use crate::errors;
use volta_common::Range;
use volta_config::{RefinementConfig, RefinementValue};
use volta_diagnostics::{Diagnostic, DiagnosticSink};
use volta_ir::{
    follow_partial, Design, DesignPath, EltRef, LibraryPath, LocalStep, Refinements, ValueLit,
};

/// Refinements read from a project, ready for [`compile`](crate::compile).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectRefinements {
    /// Class and instance substitutions.
    pub refinements: Refinements,
    /// Value overrides keyed by dotted parameter path.
    pub values: Vec<(String, ValueLit)>,
}

/// Converts the `[refinements]` section of a project.
///
/// Values that are not valid literals are reported and skipped.
pub fn from_config(config: &RefinementConfig, sink: &DiagnosticSink) -> ProjectRefinements {
    let mut out = ProjectRefinements::default();
    for (from, to) in &config.classes {
        out.refinements
            .classes
            .insert(LibraryPath::new(from.as_str()), LibraryPath::new(to.as_str()));
    }
    for (path, class) in &config.instances {
        let blocks: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        out.refinements
            .instances
            .insert(DesignPath::of_blocks(&blocks), LibraryPath::new(class.as_str()));
    }
    for (path, value) in &config.values {
        match literal(value) {
            Ok(lit) => out.values.push((path.clone(), lit)),
            Err(reason) => sink.emit(
                Diagnostic::error(errors::E209, format!("refinement value `{path}` is invalid"))
                    .at(path.as_str())
                    .with_note(reason),
            ),
        }
    }
    out
}

fn literal(value: &RefinementValue) -> Result<ValueLit, String> {
    Ok(match value {
        RefinementValue::Bool(b) => ValueLit::Bool(*b),
        RefinementValue::Int(i) => ValueLit::Int(*i),
        RefinementValue::Float(f) => ValueLit::Float(*f),
        RefinementValue::Text(s) => ValueLit::Text(s.clone()),
        RefinementValue::Range([lower, upper]) => {
            ValueLit::Range(Range::new(*lower, *upper).map_err(|err| err.to_string())?)
        }
    })
}

/// Resolves dotted value overrides against an instantiated design.
///
/// Returns the resolved overrides and, separately, those naming no parameter
/// yet: they may name the contents of a generator that has not run.
/// Overrides holding a literal of the wrong type are reported and dropped.
pub fn resolve_values(
    design: &Design,
    values: &[(String, ValueLit)],
    sink: &DiagnosticSink,
) -> (Vec<(DesignPath, ValueLit)>, Vec<(String, ValueLit)>) {
    let mut out = Vec::new();
    let mut unresolved = Vec::new();
    for (dotted, lit) in values {
        let steps: Vec<LocalStep> = dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| LocalStep::Name(s.to_string()))
            .collect();
        let Some((LocalStep::Name(param), element)) = steps.split_last() else {
            unresolved.push((dotted.clone(), lit.clone()));
            continue;
        };
        let followed = follow_partial(DesignPath::root(), EltRef::Block(&design.contents), element);
        let ty = followed
            .remaining
            .is_empty()
            .then(|| followed.elt.params().and_then(|params| params.get(param)))
            .flatten();
        match ty {
            None => unresolved.push((dotted.clone(), lit.clone())),
            Some(ty) if !lit.conforms_to(ty) => sink.emit(
                Diagnostic::error(
                    errors::E209,
                    format!("refinement value `{dotted}` is a {}, not a {ty}", lit.param_type()),
                )
                .at(dotted.as_str()),
            ),
            Some(_) => out.push((followed.path.append_param(param), lit.clone())),
        }
    }
    (out, unresolved)
}
