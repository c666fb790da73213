use crate::model::ColumnId;
use std::{collections::HashMap, hash::Hash};

///
/// ColumnEquivalences
///
/// Planner-supplied oracle: are two columns known equal under the current
/// predicates. Read-only during enumeration.
///

pub trait ColumnEquivalences {
    fn are_equivalent(&self, a: ColumnId, b: ColumnId) -> bool;
}

///
/// EquivalenceFinder
///
/// Union-find over declared equal pairs. Every element is equivalent to
/// itself, and equivalence is symmetric and transitive.
///

#[derive(Clone, Debug)]
pub struct EquivalenceFinder<T> {
    parents: HashMap<T, T>,
}

impl<T> Default for EquivalenceFinder<T> {
    fn default() -> Self {
        Self {
            parents: HashMap::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> EquivalenceFinder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_equivalent(&mut self, a: T, b: T) {
        let (root_a, root_b) = (self.root(a), self.root(b));
        if root_a != root_b {
            self.parents.insert(root_a, root_b);
        }
    }

    #[must_use]
    pub fn are_equivalent(&self, a: T, b: T) -> bool {
        a == b || self.root(a) == self.root(b)
    }

    fn root(&self, mut element: T) -> T {
        while let Some(&parent) = self.parents.get(&element) {
            element = parent;
        }
        element
    }
}

impl ColumnEquivalences for EquivalenceFinder<ColumnId> {
    fn are_equivalent(&self, a: ColumnId, b: ColumnId) -> bool {
        Self::are_equivalent(self, a, b)
    }
}
