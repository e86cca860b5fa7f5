//! Relative and absolute paths through a design.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-parameters every port or vector exposes without declaring them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ReservedParam {
    /// Whether a port is connected to anything.
    IsConnected,
    /// Number of elements of a vector port.
    Length,
    /// Names of the elements allocated on a vector port.
    Allocated,
    /// Name of a port within its parent.
    Name,
    /// The link a port is attached to; further steps address the link's contents.
    ConnectedLink,
}

impl ReservedParam {
    /// Lowercase name used in rendered paths.
    pub fn as_str(self) -> &'static str {
        match self {
            ReservedParam::IsConnected => "is_connected",
            ReservedParam::Length => "length",
            ReservedParam::Allocated => "allocated",
            ReservedParam::Name => "name",
            ReservedParam::ConnectedLink => "link",
        }
    }
}

/// One step of a [`LocalPath`].
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum LocalStep {
    /// A named child: block, link, port, or parameter.
    Name(String),
    /// A reserved pseudo-parameter.
    Reserved(ReservedParam),
    /// Allocation of a new element on a vector port, optionally with a requested name.
    ///
    /// Replaced by a concrete element name during instantiation.
    Allocate(Option<String>),
}

impl fmt::Display for LocalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalStep::Name(name) => write!(f, "{name}"),
            LocalStep::Reserved(param) => write!(f, "({})", param.as_str()),
            LocalStep::Allocate(None) => write!(f, "(alloc)"),
            LocalStep::Allocate(Some(name)) => write!(f, "(alloc:{name})"),
        }
    }
}

/// A path relative to the block or link that contains an expression.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LocalPath(pub Vec<LocalStep>);

impl LocalPath {
    /// A path of named steps.
    pub fn names<S: AsRef<str>>(names: &[S]) -> Self {
        Self(
            names
                .iter()
                .map(|n| LocalStep::Name(n.as_ref().to_string()))
                .collect(),
        )
    }

    /// Returns this path extended by one step.
    pub fn with(&self, step: LocalStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    /// Returns this path extended by a named step.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        self.with(LocalStep::Name(name.into()))
    }

    /// Returns this path extended by every step of `other`.
    pub fn join(&self, other: &LocalPath) -> Self {
        let mut steps = self.0.clone();
        steps.extend(other.0.iter().cloned());
        Self(steps)
    }

    /// The steps of the path.
    pub fn steps(&self) -> &[LocalStep] {
        &self.0
    }

    /// The last step, if any.
    pub fn last(&self) -> Option<&LocalStep> {
        self.0.last()
    }

    /// Whether the path ends in the given reserved step.
    pub fn ends_with_reserved(&self, param: ReservedParam) -> bool {
        matches!(self.0.last(), Some(LocalStep::Reserved(p)) if *p == param)
    }

    /// The path without its last step.
    pub fn parent(&self) -> LocalPath {
        let len = self.0.len().saturating_sub(1);
        LocalPath(self.0[..len].to_vec())
    }

    /// Whether any step is an unresolved allocation.
    pub fn has_allocate(&self) -> bool {
        self.0.iter().any(|s| matches!(s, LocalStep::Allocate(_)))
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// An absolute path from the design root, split by element kind.
///
/// Steps are grouped in containment order: blocks, then links (including link
/// array elements), then ports (including bundle members and vector elements),
/// then parameters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
pub struct DesignPath {
    /// Block names from the root.
    pub blocks: Vec<String>,
    /// Link names inside the innermost block.
    pub links: Vec<String>,
    /// Port names inside the innermost block or link.
    pub ports: Vec<String>,
    /// Parameter names inside the innermost element.
    pub params: Vec<String>,
}

impl DesignPath {
    /// The design root.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path made only of nested block names.
    pub fn of_blocks<S: AsRef<str>>(blocks: &[S]) -> Self {
        Self {
            blocks: blocks.iter().map(|b| b.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    /// Returns this path extended by a block.
    pub fn append_block(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.blocks.push(name.to_string());
        path
    }

    /// Returns this path extended by a link.
    pub fn append_link(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.links.push(name.to_string());
        path
    }

    /// Returns this path extended by a port.
    pub fn append_port(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.ports.push(name.to_string());
        path
    }

    /// Returns this path extended by a parameter.
    pub fn append_param(&self, name: &str) -> Self {
        let mut path = self.clone();
        path.params.push(name.to_string());
        path
    }

    /// The enclosing block path.
    pub fn block_component(&self) -> DesignPath {
        DesignPath {
            blocks: self.blocks.clone(),
            ..DesignPath::default()
        }
    }

    /// The enclosing link path (blocks and links only).
    pub fn link_component(&self) -> DesignPath {
        DesignPath {
            blocks: self.blocks.clone(),
            links: self.links.clone(),
            ..DesignPath::default()
        }
    }

    /// The path with parameters stripped.
    pub fn element_component(&self) -> DesignPath {
        DesignPath {
            params: Vec::new(),
            ..self.clone()
        }
    }

    /// Whether this path addresses a port (no parameter steps).
    pub fn is_port(&self) -> bool {
        !self.ports.is_empty() && self.params.is_empty()
    }

    /// Whether this path addresses a parameter.
    pub fn is_param(&self) -> bool {
        !self.params.is_empty()
    }

    /// Whether the innermost element is a link or something inside one.
    pub fn in_link(&self) -> bool {
        !self.links.is_empty()
    }

    /// The path with the last port step removed.
    pub fn parent_port(&self) -> Option<DesignPath> {
        if self.ports.is_empty() || !self.params.is_empty() {
            return None;
        }
        let mut path = self.clone();
        path.ports.pop();
        Some(path)
    }

    /// The last step of the path, if any.
    pub fn last_name(&self) -> Option<&str> {
        self.params
            .last()
            .or(self.ports.last())
            .or(self.links.last())
            .or(self.blocks.last())
            .map(String::as_str)
    }

    /// All steps in order, flattened.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .chain(&self.links)
            .chain(&self.ports)
            .chain(&self.params)
            .map(String::as_str)
    }

    /// The steps of this path after `prefix`, if `prefix` is an ancestor block.
    pub fn relative_to(&self, prefix: &DesignPath) -> Option<LocalPath> {
        if !prefix.links.is_empty() || !prefix.ports.is_empty() || !prefix.params.is_empty() {
            return None;
        }
        if !self.blocks.starts_with(&prefix.blocks) {
            return None;
        }
        let steps = self.steps().skip(prefix.blocks.len());
        Some(LocalPath(
            steps.map(|s| LocalStep::Name(s.to_string())).collect(),
        ))
    }
}

impl fmt::Display for DesignPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.steps().collect();
        if steps.is_empty() {
            write!(f, "(root)")
        } else {
            write!(f, "{}", steps.join("."))
        }
    }
}

/// The name of a library class, e.g. `parts.Resistor`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct LibraryPath {
    /// Fully qualified class name.
    pub name: String,
}

impl LibraryPath {
    /// Creates a library path.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for LibraryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
