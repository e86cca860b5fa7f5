//! Labels pointing at related design elements within a diagnostic.

use serde::{Deserialize, Serialize};

/// The role of a diagnostic label.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The element the diagnostic is about.
    Primary,
    /// An element providing context, such as the other side of a conflict.
    Secondary,
}

/// A design path annotated with an explanatory message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// Dotted design path of the annotated element.
    pub path: String,
    /// The message displayed next to the path.
    pub message: String,
    /// Whether this is a primary or secondary label.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label.
    pub fn secondary(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}
