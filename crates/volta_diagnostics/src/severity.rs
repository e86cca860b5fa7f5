//! How serious a diagnostic is.

use crate::code::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a diagnostic message, least severe first.
///
/// Only [`Severity::Error`] fails a compile. Notes and help are attached to
/// other diagnostics and never emitted on their own.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A suggested fix.
    Help,
    /// Extra context.
    Note,
    /// Suspicious, but the design still compiles.
    Warning,
    /// The design is wrong.
    Error,
}

impl Severity {
    /// The severity diagnostics of a code category are emitted with.
    pub fn of(category: Category) -> Self {
        match category {
            Category::Error => Severity::Error,
            Category::Warning => Severity::Warning,
        }
    }

    /// Returns `true` for [`Severity::Error`].
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Lowercase name, as rendered.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Help => "help",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_emitted_severities() {
        assert_eq!(Severity::of(Category::Error), Severity::Error);
        assert_eq!(Severity::of(Category::Warning), Severity::Warning);
        assert!(Severity::of(Category::Warning) < Severity::of(Category::Error));
    }

    #[test]
    fn renders_lowercase() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(
            serde_json::to_string(&Severity::Error).unwrap(),
            "\"error\""
        );
    }
}
