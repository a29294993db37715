//! ParameterSet: the caller-supplied values bound against `%s`/`%(name)s`
//! markers (§3, §4.2).

use std::collections::BTreeMap;

pub use crate::value::Value;

/// Either an ordered sequence (positional `%s` markers) or a keyed mapping
/// (named `%(ident)s` markers). A statement must use exactly one style.
#[derive(Debug, Clone, Default)]
pub enum ParameterSet {
    #[default]
    Empty,
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

impl ParameterSet {
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        ParameterSet::Positional(values.into_iter().collect())
    }

    pub fn named(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        ParameterSet::Named(values.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        match self {
            ParameterSet::Empty => 0,
            ParameterSet::Positional(v) => v.len(),
            ParameterSet::Named(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
