//! Backends consume a solved design.
//!
//! A backend receives the design with its solved values written back, plus
//! the same values as a flat path-to-literal list, and produces one opaque
//! output string per design element it cares about. Netlisters and bill of
//! materials generators live outside this workspace; [`SolvedValues`] is the
//! reference backend that lists the values themselves.

use volta_common::VoltaResult;
use volta_ir::{Design, DesignPath, ValueLit};

/// A consumer of solved designs.
pub trait Backend {
    /// Short name used in logs and on the command line.
    fn name(&self) -> &str;

    /// Produces outputs keyed by design path.
    fn run(
        &self,
        design: &Design,
        values: &[(DesignPath, ValueLit)],
    ) -> VoltaResult<Vec<(DesignPath, String)>>;
}

/// Lists solved values, optionally only those under a dotted path prefix.
#[derive(Debug, Default)]
pub struct SolvedValues {
    filter: Option<String>,
}

impl SolvedValues {
    /// A backend listing every value.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend listing values whose dotted path starts with `prefix`.
    pub fn with_filter(prefix: impl Into<String>) -> Self {
        Self {
            filter: Some(prefix.into()),
        }
    }

    fn keeps(&self, dotted: &str) -> bool {
        match &self.filter {
            None => true,
            Some(prefix) => {
                dotted == prefix
                    || dotted
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            }
        }
    }
}

impl Backend for SolvedValues {
    fn name(&self) -> &str {
        "values"
    }

    fn run(
        &self,
        _design: &Design,
        values: &[(DesignPath, ValueLit)],
    ) -> VoltaResult<Vec<(DesignPath, String)>> {
        let out: Vec<_> = values
            .iter()
            .filter(|(path, _)| self.keeps(&path.to_string()))
            .map(|(path, value)| (path.clone(), value.to_string()))
            .collect();
        log::debug!("{} backend: {} of {} values", self.name(), out.len(), values.len());
        Ok(out)
    }
}
