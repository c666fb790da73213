use crate::model::{ColumnId, IndexModel, TableId};
use std::collections::HashMap;

///
/// MultiIndexCandidate
///
/// One index plus the conditions bound to its leading columns.
/// Only a contiguous prefix starting at the first column is ever pegged.
///

#[derive(Clone, Debug)]
pub struct MultiIndexCandidate<'s, C> {
    index: &'s IndexModel,
    pegged: Vec<C>,
}

impl<'s, C> MultiIndexCandidate<'s, C> {
    #[must_use]
    pub const fn new(index: &'s IndexModel) -> Self {
        Self {
            index,
            pegged: Vec::new(),
        }
    }

    /// Peg columns in order until one has no condition.
    pub(crate) fn from_conditions(index: &'s IndexModel, conditions: &HashMap<ColumnId, C>) -> Self
    where
        C: Clone,
    {
        let mut candidate = Self::new(index);
        while let Some(condition) = candidate
            .next_free_column()
            .and_then(|column| conditions.get(&column))
        {
            candidate.peg(condition.clone());
        }

        candidate
    }

    /// First column not yet bound, or `None` once every column is pegged.
    #[must_use]
    pub fn next_free_column(&self) -> Option<ColumnId> {
        self.index.all_columns().get(self.pegged.len()).copied()
    }

    pub fn peg(&mut self, condition: C) {
        self.pegged.push(condition);
    }

    #[must_use]
    pub const fn any_pegged(&self) -> bool {
        !self.pegged.is_empty()
    }

    #[must_use]
    pub fn pegged(&self) -> &[C] {
        &self.pegged
    }

    #[must_use]
    pub const fn pegged_count(&self) -> usize {
        self.pegged.len()
    }

    #[must_use]
    pub fn all_columns(&self) -> &'s [ColumnId] {
        self.index.all_columns()
    }

    #[must_use]
    pub const fn index(&self) -> &'s IndexModel {
        self.index
    }

    #[must_use]
    pub const fn leaf_most_table(&self) -> TableId {
        self.index.leaf_most_table()
    }
}
