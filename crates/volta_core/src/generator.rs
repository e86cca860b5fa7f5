//! Solved inputs handed to a generator.

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use volta_ir::{LocalPath, ValueLit};

/// Values for a generator's required inputs, keyed by path relative to the generator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorValues {
    values: LinkedHashMap<LocalPath, ValueLit>,
}

impl GeneratorValues {
    /// Creates an empty set of values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of one input.
    pub fn insert(&mut self, path: LocalPath, value: ValueLit) {
        self.values.insert(path, value);
    }

    /// The value of one input.
    pub fn get(&self, path: &LocalPath) -> Option<&ValueLit> {
        self.values.get(path)
    }

    /// Iterates over inputs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&LocalPath, &ValueLit)> {
        self.values.iter()
    }

    /// Number of inputs with values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no input has a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(LocalPath, ValueLit)> for GeneratorValues {
    fn from_iter<T: IntoIterator<Item = (LocalPath, ValueLit)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
