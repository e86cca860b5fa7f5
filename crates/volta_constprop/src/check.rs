//! Reporting propagation results: error checks and solved-value write-back.

use crate::errors;
use crate::graph::ConstProp;
use crate::value::{ErrorValue, Value};
use volta_diagnostics::{Diagnostic, DiagnosticSink};
use volta_ir::{
    instantiated_links, sub_blocks, Design, DesignPath, HierarchyBlock, Link, LinkLike, LocalPath,
    Metadata, ValueExpr, ValueLit,
};

/// Prefix of the constraints [`ConstProp::write_solved`] adds.
pub const SOLVED_PREFIX: &str = "(scp)";

impl ConstProp {
    /// Reports every parameter that resolved to an error and every constraint
    /// that does not hold.
    ///
    /// Returns a copy of `design` with the same findings recorded in the
    /// `errors` metadata of the owning blocks and links, keyed `params.<path>`
    /// and `constraints.<name>`.
    pub fn check(&self, design: &Design, sink: &DiagnosticSink) -> Design {
        let mut out = design.clone();
        for path in element_paths(design) {
            let mut found: Vec<(String, String)> = Vec::new();
            for (rel, value) in self.solved_params(design, &path, false) {
                let Value::Error(err) = value else {
                    continue;
                };
                let at = dotted(&path, &rel);
                let diag = match &err {
                    ErrorValue::Message(_) | ErrorValue::Cycle(_) => {
                        let mut diag = Diagnostic::error(
                            errors::E300,
                            format!("parameter `{rel}` has no consistent value"),
                        )
                        .at(at.as_str())
                        .with_note(err.to_string());
                        if let Some(param) = design.resolve_dotted(&at) {
                            for contributor in self.params.get(&param).into_iter().flatten() {
                                diag = diag.with_note(format!("constrained by {}", contributor.name));
                            }
                        }
                        diag
                    }
                    ErrorValue::Propagated => Diagnostic::warning(
                        errors::W300,
                        format!("parameter `{rel}` depends on an erroneous value"),
                    )
                    .at(at.as_str()),
                };
                sink.emit(diag);
                found.push((format!("params.{rel}"), err.to_string()));
            }

            for (name, exprs) in self.checks.get(&path).into_iter().flatten() {
                for expr in exprs {
                    let value = expr.eval(&mut |sub: &DesignPath| self.resolve(sub));
                    let diag = match &value {
                        None | Some(Value::Bool(true)) => continue,
                        Some(Value::Bool(false)) => Diagnostic::error(
                            errors::E301,
                            format!("constraint `{name}` does not hold"),
                        ),
                        Some(Value::Error(ErrorValue::Propagated)) => Diagnostic::warning(
                            errors::W300,
                            format!("constraint `{name}` depends on an erroneous value"),
                        ),
                        Some(other) => Diagnostic::error(
                            errors::E302,
                            format!("constraint `{name}` evaluated to {other}, not a boolean"),
                        ),
                    };
                    sink.emit(diag.at(path.to_string()));
                    if let Some(value) = value {
                        found.push((format!("constraints.{name}"), value.to_string()));
                    }
                }
            }

            if !found.is_empty() {
                if let Some(meta) = meta_mut(&mut out, &path) {
                    for (key, desc) in found {
                        meta.errors.insert(key, desc);
                    }
                }
            }
        }
        out
    }

    /// Every parameter with a known, error-free value, ordered by path.
    pub fn param_values(&self) -> Vec<(DesignPath, ValueLit)> {
        let mut paths: Vec<&DesignPath> = self.params.keys().collect();
        paths.sort();
        paths
            .into_iter()
            .filter_map(|path| {
                let value = self.resolve(path)?;
                let lit = value.to_lit().filter(|_| !value.is_error())?;
                Some((path.clone(), lit))
            })
            .collect()
    }

    /// Returns a copy of `design` where every block carries its solved values
    /// as `(scp)` assignments.
    ///
    /// Values that are errors or still unknown are not written.
    pub fn write_solved(&self, design: &Design) -> Design {
        let mut out = design.clone();
        for path in element_paths(design) {
            if path.in_link() {
                continue;
            }
            let solved = self.solved_params(design, &path, true);
            let Some(block) = out.block_mut(&path) else {
                continue;
            };
            for (rel, value) in solved {
                let Some(lit) = value.to_lit() else {
                    continue;
                };
                let name = format!("{SOLVED_PREFIX}{rel}");
                if block.constraints.contains_key(&name) {
                    log::warn!("{path} already has a constraint named {name}");
                    continue;
                }
                block.constraints.insert(
                    name,
                    ValueExpr::Assign {
                        dst: rel,
                        src: Box::new(ValueExpr::Literal(lit)),
                    },
                );
            }
        }
        out
    }
}

fn dotted(path: &DesignPath, rel: &LocalPath) -> String {
    if path.steps().next().is_none() {
        rel.to_string()
    } else {
        format!("{path}.{rel}")
    }
}

fn meta_mut<'d>(design: &'d mut Design, path: &DesignPath) -> Option<&'d mut Metadata> {
    if path.in_link() {
        design.link_mut(path).map(|link| &mut link.meta)
    } else {
        design.block_mut(path).map(|block| &mut block.meta)
    }
}

/// Every instantiated block and link, parents first.
pub(crate) fn element_paths(design: &Design) -> Vec<DesignPath> {
    let mut out = Vec::new();
    visit_block(DesignPath::root(), &design.contents, &mut out);
    out
}

fn visit_block(path: DesignPath, block: &HierarchyBlock, out: &mut Vec<DesignPath>) {
    out.push(path.clone());
    for (name, link) in instantiated_links(&block.links) {
        visit_link_like(path.append_link(name), link, out);
    }
    for (name, sub) in sub_blocks(block) {
        visit_block(path.append_block(name), sub, out);
    }
}

fn visit_link_like(path: DesignPath, link: &LinkLike, out: &mut Vec<DesignPath>) {
    match link {
        LinkLike::Link(link) => visit_link(path, link, out),
        LinkLike::Array(array) => {
            for (name, elt) in array.links.iter() {
                visit_link(path.append_link(name), elt, out);
            }
        }
        LinkLike::LibElem(_) => {}
    }
}

fn visit_link(path: DesignPath, link: &Link, out: &mut Vec<DesignPath>) {
    out.push(path.clone());
    for (name, inner) in instantiated_links(&link.links) {
        visit_link_like(path.append_link(name), inner, out);
    }
}
