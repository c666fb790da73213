//! Module: query::plan::multi_index
//! Responsibility: enumerate index intersections across hierarchy branches.
//! Does not own: condition semantics, column equivalence, or costing.
//!
//! Invariants:
//! - Candidates peg only a leftmost contiguous prefix of index columns.
//! - An intersection is emitted only when its shared trailing columns cover
//!   every HKey column needed to realign both scans onto one hierarchy path.
//! - One `get_combinations` call never yields the same
//!   `(output, selector, comparison_count)` twice.

mod candidate;
mod enumerator;
mod equivalence;
mod node;

#[cfg(test)]
mod tests;

use crate::model::{ColumnId, IndexId, TableId};
use std::{collections::HashSet, hash::Hash, sync::Arc};

// re-exports
pub use candidate::MultiIndexCandidate;
pub use enumerator::MultiIndexEnumerator;
pub use equivalence::{ColumnEquivalences, EquivalenceFinder};
pub use node::{IndexIntersection, IndexIntersectionBuilder};

///
/// BranchInfo
///
/// One subtree's indexes and conditions, handed to the enumerator as a unit.
///

pub trait BranchInfo<C> {
    /// Column constrained by `condition`, if the planner can name one.
    fn column_from_condition(&self, condition: &C) -> Option<ColumnId>;

    fn indexes(&self) -> &[IndexId];

    fn conditions(&self) -> &[C];
}

///
/// IntersectionNode
///
/// What the enumerator needs to know about a scan or an intersection.
///

pub trait IntersectionNode<C> {
    fn leaf_most_table(&self) -> TableId;

    /// Row columns in scan order; the pegged prefix comes first.
    fn all_columns(&self) -> &[ColumnId];

    fn pegged_count(&self) -> usize;

    fn covered_conditions(&self) -> &[C];

    /// Move the conditions this node covers out of `pool` into `recycle`.
    ///
    /// Returns true when at least one condition moved.
    fn remove_covered_conditions(&self, pool: &mut HashSet<C>, recycle: &mut Vec<C>) -> bool
    where
        C: Eq + Hash,
    {
        let before = recycle.len();
        for condition in self.covered_conditions() {
            if let Some(taken) = pool.take(condition) {
                recycle.push(taken);
            }
        }

        recycle.len() > before
    }
}

impl<C, N: IntersectionNode<C> + ?Sized> IntersectionNode<C> for Arc<N> {
    fn leaf_most_table(&self) -> TableId {
        (**self).leaf_most_table()
    }

    fn all_columns(&self) -> &[ColumnId] {
        (**self).all_columns()
    }

    fn pegged_count(&self) -> usize {
        (**self).pegged_count()
    }

    fn covered_conditions(&self) -> &[C] {
        (**self).covered_conditions()
    }
}

///
/// NodeBuilder
///
/// Constructs leaf and intersection nodes for the enumerator. The default
/// pair is [`IndexIntersectionBuilder`] / [`IndexIntersection`].
///

pub trait NodeBuilder<'s, C, B: BranchInfo<C>> {
    type Node: IntersectionNode<C>;

    fn build_leaf(&mut self, candidate: MultiIndexCandidate<'s, C>, branch: &B) -> Self::Node;

    /// Node scanning `output` and filtering it by `selector`, aligned on
    /// `comparison_count` trailing columns.
    fn intersect(
        &mut self,
        output: &Self::Node,
        selector: &Self::Node,
        comparison_count: usize,
    ) -> Self::Node;

    /// Two conditions of one branch constrain the same column; `current` wins.
    fn handle_duplicate_condition(&mut self, column: ColumnId, previous: &C, current: &C) {
        let _ = (column, previous, current);
    }
}
