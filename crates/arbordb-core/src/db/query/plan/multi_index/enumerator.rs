use crate::{
    config::EnumeratorOptions,
    db::query::plan::multi_index::{
        BranchInfo, ColumnEquivalences, IntersectionNode, MultiIndexCandidate, NodeBuilder,
    },
    error::InternalError,
    model::{ColumnId, Schema, TableId, TableModel},
    obs::sink::{self, MetricsEvent},
};
use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    hash::Hash,
    marker::PhantomData,
};

// (output, selector, comparison_count) by result position.
type EmittedKey = (usize, usize, usize);

///
/// MultiIndexEnumerator
///
/// Builds every valid intersection of pegged index scans over the branches
/// added to it. Leaves are the single-index scans; `get_combinations` grows
/// intersections round by round until a round adds nothing.
///

pub struct MultiIndexEnumerator<'s, C, B, NB>
where
    B: BranchInfo<C>,
    NB: NodeBuilder<'s, C, B>,
{
    schema: &'s Schema,
    builder: NB,
    options: EnumeratorOptions,
    results: Vec<NB::Node>,
    leaf_count: usize,
    conditions: HashSet<C>,
    _branch: PhantomData<fn(&B)>,
}

impl<'s, C, B, NB> MultiIndexEnumerator<'s, C, B, NB>
where
    C: Clone + Debug + Eq + Hash,
    B: BranchInfo<C>,
    NB: NodeBuilder<'s, C, B>,
{
    #[must_use]
    pub fn new(schema: &'s Schema, builder: NB) -> Self {
        Self::with_options(schema, builder, EnumeratorOptions::default())
    }

    #[must_use]
    pub fn with_options(schema: &'s Schema, builder: NB, options: EnumeratorOptions) -> Self {
        Self {
            schema,
            builder,
            options,
            results: Vec::new(),
            leaf_count: 0,
            conditions: HashSet::new(),
            _branch: PhantomData,
        }
    }

    /// Seed single-index scans for every index of `branch` that pegs at
    /// least one condition.
    ///
    /// Every index is resolved before any state changes, so a failed branch
    /// leaves the enumerator as it was.
    pub fn add_branch(&mut self, branch: &B) -> Result<(), InternalError> {
        let indexes = branch
            .indexes()
            .iter()
            .map(|&index| self.schema.index(index))
            .collect::<Result<Vec<_>, _>>()?;
        self.results.truncate(self.leaf_count);

        let mut by_column: HashMap<ColumnId, C> = HashMap::with_capacity(branch.conditions().len());
        for condition in branch.conditions() {
            self.conditions.insert(condition.clone());

            let Some(column) = branch.column_from_condition(condition) else {
                tracing::warn!(?condition, "couldn't map condition to a column");
                sink::record(MetricsEvent::UnmappedCondition);
                continue;
            };
            if let Some(previous) = by_column.insert(column, condition.clone()) {
                sink::record(MetricsEvent::DuplicateCondition);
                self.builder
                    .handle_duplicate_condition(column, &previous, condition);
            }
        }

        for index in indexes {
            let candidate = MultiIndexCandidate::from_conditions(index, &by_column);
            if candidate.any_pegged() {
                let leaf = self.builder.build_leaf(candidate, branch);
                self.results.push(leaf);
            }
        }
        self.leaf_count = self.results.len();

        Ok(())
    }

    /// Every valid intersection over the seeded scans, scans excluded.
    ///
    /// Repeated calls recompute from the seeds and yield the same shapes.
    pub fn get_combinations<E>(&mut self, equivalences: &E) -> Result<&[NB::Node], InternalError>
    where
        E: ColumnEquivalences + ?Sized,
    {
        self.results.truncate(self.leaf_count);
        let leaves = self.leaf_count;
        if leaves == 0 || !self.options.enabled {
            return Ok(&self.results[leaves..]);
        }

        let mut pool = self.conditions.clone();
        let mut outer_recycle = Vec::with_capacity(pool.len());
        let mut inner_recycle = Vec::with_capacity(pool.len());
        let mut new_nodes = Vec::with_capacity(leaves);
        let mut emitted = HashSet::new();

        let mut old_end = leaves;
        let mut fresh = 0..leaves;
        let mut rounds = 0_u64;
        loop {
            rounds += 1;
            for outer in fresh.clone() {
                if self.results[outer].remove_covered_conditions(&mut pool, &mut outer_recycle)
                    && !pool.is_empty()
                {
                    for inner in 0..old_end {
                        if inner != outer
                            && self.results[inner]
                                .remove_covered_conditions(&mut pool, &mut inner_recycle)
                        {
                            self.emit(outer, inner, &mut new_nodes, &mut emitted, equivalences)?;
                            pool.extend(inner_recycle.drain(..));
                        }
                    }
                }
                pool.extend(outer_recycle.drain(..));
            }
            tracing::debug!(round = rounds, emitted = new_nodes.len(), "intersection round");

            if new_nodes.is_empty() {
                break;
            }
            old_end = self.results.len();
            self.results.append(&mut new_nodes);
            fresh = old_end..self.results.len();
        }

        sink::record(MetricsEvent::Enumeration {
            leaves: u64::try_from(leaves).unwrap_or(u64::MAX),
            rounds,
            emitted: u64::try_from(self.results.len() - leaves).unwrap_or(u64::MAX),
        });

        Ok(&self.results[leaves..])
    }

    /// Consume the enumerator, returning the intersections it produced.
    pub fn into_combinations<E>(mut self, equivalences: &E) -> Result<Vec<NB::Node>, InternalError>
    where
        E: ColumnEquivalences + ?Sized,
    {
        self.get_combinations(equivalences)?;
        let leaves = self.leaf_count;

        Ok(self.results.split_off(leaves))
    }

    /// Single-index scans seeded so far.
    #[must_use]
    pub fn leaves(&self) -> &[NB::Node] {
        &self.results[..self.leaf_count]
    }

    #[must_use]
    pub const fn builder(&self) -> &NB {
        &self.builder
    }

    // Validate one ordered pair and push the orderings that realign correctly.
    fn emit<E>(
        &mut self,
        first: usize,
        second: usize,
        output: &mut Vec<NB::Node>,
        emitted: &mut HashSet<EmittedKey>,
        equivalences: &E,
    ) -> Result<(), InternalError>
    where
        E: ColumnEquivalences + ?Sized,
    {
        let schema = self.schema;
        let first_node = &self.results[first];
        let second_node = &self.results[second];

        let common = common_trailing::<C, _, _>(first_node, second_node, equivalences);
        if common.is_empty() {
            return Ok(());
        }
        let comparisons = common.len();
        let first_table = first_node.leaf_most_table();
        let second_table = second_node.leaf_most_table();

        let mut accepted = Vec::with_capacity(2);
        let mut on_same_branch = false;
        if schema.is_descendant_of(first_table, second_table)
            && includes_hkey(schema.table(second_table)?, common, equivalences)
        {
            accepted.push((first, second));
            on_same_branch = true;
        }
        if schema.is_descendant_of(second_table, first_table)
            && includes_hkey(schema.table(first_table)?, common, equivalences)
        {
            accepted.push((second, first));
            on_same_branch = true;
        }
        if !on_same_branch {
            let required = ancestor_hkeys(schema, first_table, second_table)?;
            if !required
                .iter()
                .all(|column| contains_equivalent(common, *column, equivalences))
            {
                sink::record(MetricsEvent::IntersectionRejected);
                return Ok(());
            }
            accepted.push((first, second));
            accepted.push((second, first));
        }

        for (out, selector) in accepted {
            if emitted.insert((out, selector, comparisons)) {
                let node =
                    self.builder
                        .intersect(&self.results[out], &self.results[selector], comparisons);
                output.push(node);
            }
        }

        Ok(())
    }
}

// Longest run of equivalent unpegged columns, as columns of `first`.
fn common_trailing<'a, C, N, E>(first: &'a N, second: &N, equivalences: &E) -> &'a [ColumnId]
where
    N: IntersectionNode<C>,
    E: ColumnEquivalences + ?Sized,
{
    let first_trailing = ordering_columns::<C, N>(first);
    let second_trailing = ordering_columns::<C, N>(second);

    let common = first_trailing
        .iter()
        .zip(second_trailing)
        .take_while(|&(a, b)| equivalences.are_equivalent(*a, *b))
        .count();

    &first_trailing[..common]
}

fn ordering_columns<C, N: IntersectionNode<C>>(node: &N) -> &[ColumnId] {
    node.all_columns()
        .get(node.pegged_count()..)
        .unwrap_or_default()
}

fn includes_hkey<E>(table: &TableModel, columns: &[ColumnId], equivalences: &E) -> bool
where
    E: ColumnEquivalences + ?Sized,
{
    table
        .hkey_column_list()
        .all(|hkey_column| contains_equivalent(columns, hkey_column, equivalences))
}

fn contains_equivalent<E>(columns: &[ColumnId], target: ColumnId, equivalences: &E) -> bool
where
    E: ColumnEquivalences + ?Sized,
{
    columns
        .iter()
        .any(|column| equivalences.are_equivalent(*column, target))
}

// Primary-key columns of every table shared by both ancestor chains.
fn ancestor_hkeys(
    schema: &Schema,
    first: TableId,
    second: TableId,
) -> Result<Vec<ColumnId>, InternalError> {
    let first_chain = schema.table(first)?.ancestors();
    let second_chain = schema.table(second)?.ancestors();

    let mut columns = Vec::with_capacity(first_chain.len().min(second_chain.len()));
    for (a, b) in first_chain.iter().zip(second_chain) {
        if a != b {
            break;
        }
        columns.extend_from_slice(schema.table(*a)?.primary_key());
    }

    Ok(columns)
}
