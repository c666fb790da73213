use crate::{
    db::query::plan::multi_index::{
        BranchInfo, IntersectionNode, MultiIndexCandidate, NodeBuilder,
    },
    model::{ColumnId, TableId},
};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

///
/// IndexIntersection
///
/// Default plan node: a single pegged index scan, or the intersection of
/// two prior nodes. An intersection reads columns, pegging, and leaf-most
/// table from its output side and covers the conditions of both sides.
///

#[derive(Debug)]
pub enum IndexIntersection<'s, C> {
    Scan(MultiIndexCandidate<'s, C>),
    Intersect {
        output: Arc<Self>,
        selector: Arc<Self>,
        comparison_count: usize,
        covered: Vec<C>,
    },
}

impl<'s, C: Clone + PartialEq> IndexIntersection<'s, C> {
    #[must_use]
    pub fn intersect(output: Arc<Self>, selector: Arc<Self>, comparison_count: usize) -> Self {
        let mut covered = IntersectionNode::<C>::covered_conditions(&*output).to_vec();
        for condition in IntersectionNode::<C>::covered_conditions(&*selector) {
            if !covered.contains(condition) {
                covered.push(condition.clone());
            }
        }

        Self::Intersect {
            output,
            selector,
            comparison_count,
            covered,
        }
    }
}

impl<C> IndexIntersection<'_, C> {
    /// Trailing columns compared when intersecting; zero for a scan.
    #[must_use]
    pub const fn comparison_count(&self) -> usize {
        match self {
            Self::Scan(_) => 0,
            Self::Intersect {
                comparison_count, ..
            } => *comparison_count,
        }
    }

    /// Number of index scans feeding this node.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        match self {
            Self::Scan(_) => 1,
            Self::Intersect {
                output, selector, ..
            } => output.scan_count() + selector.scan_count(),
        }
    }
}

impl<C> IntersectionNode<C> for IndexIntersection<'_, C> {
    fn leaf_most_table(&self) -> TableId {
        match self {
            Self::Scan(candidate) => candidate.leaf_most_table(),
            Self::Intersect { output, .. } => output.leaf_most_table(),
        }
    }

    fn all_columns(&self) -> &[ColumnId] {
        match self {
            Self::Scan(candidate) => candidate.all_columns(),
            Self::Intersect { output, .. } => output.all_columns(),
        }
    }

    fn pegged_count(&self) -> usize {
        match self {
            Self::Scan(candidate) => candidate.pegged_count(),
            Self::Intersect { output, .. } => output.pegged_count(),
        }
    }

    fn covered_conditions(&self) -> &[C] {
        match self {
            Self::Scan(candidate) => candidate.pegged(),
            Self::Intersect { covered, .. } => covered,
        }
    }
}

impl<C> Display for IndexIntersection<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(candidate) => write!(f, "{}", candidate.index().name()),
            Self::Intersect {
                output,
                selector,
                comparison_count,
                ..
            } => write!(f, "INTERSECT({output}, {selector}, compare {comparison_count})"),
        }
    }
}

///
/// IndexIntersectionBuilder
///

#[derive(Clone, Copy, Debug, Default)]
pub struct IndexIntersectionBuilder;

impl<'s, C, B> NodeBuilder<'s, C, B> for IndexIntersectionBuilder
where
    C: Clone + PartialEq,
    B: BranchInfo<C>,
{
    type Node = Arc<IndexIntersection<'s, C>>;

    fn build_leaf(&mut self, candidate: MultiIndexCandidate<'s, C>, _branch: &B) -> Self::Node {
        Arc::new(IndexIntersection::Scan(candidate))
    }

    fn intersect(
        &mut self,
        output: &Self::Node,
        selector: &Self::Node,
        comparison_count: usize,
    ) -> Self::Node {
        Arc::new(IndexIntersection::intersect(
            Arc::clone(output),
            Arc::clone(selector),
            comparison_count,
        ))
    }
}
