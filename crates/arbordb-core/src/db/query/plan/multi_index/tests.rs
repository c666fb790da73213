use crate::{
    config::EnumeratorOptions,
    db::query::plan::multi_index::{
        BranchInfo, EquivalenceFinder, IndexIntersection, IndexIntersectionBuilder,
        IntersectionNode, MultiIndexCandidate, MultiIndexEnumerator, NodeBuilder,
    },
    error::ErrorClass,
    model::{ColumnId, IndexDef, IndexId, IndexModel, SchemaBuilder, TableDef, TableId},
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    test_support::{Fixture, fixture},
};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    sync::Arc,
};

///
/// Cond
/// Opaque condition handle; the column is resolved through the branch.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct Cond(&'static str);

struct Branch {
    indexes: Vec<IndexId>,
    conditions: Vec<Cond>,
    columns: HashMap<Cond, ColumnId>,
}

impl Branch {
    fn new(indexes: &[IndexId]) -> Self {
        Self {
            indexes: indexes.to_vec(),
            conditions: Vec::new(),
            columns: HashMap::new(),
        }
    }

    fn with(mut self, condition: &'static str, column: Option<ColumnId>) -> Self {
        let condition = Cond(condition);
        self.conditions.push(condition);
        if let Some(column) = column {
            self.columns.insert(condition, column);
        }
        self
    }
}

impl BranchInfo<Cond> for Branch {
    fn column_from_condition(&self, condition: &Cond) -> Option<ColumnId> {
        self.columns.get(condition).copied()
    }

    fn indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    fn conditions(&self) -> &[Cond] {
        &self.conditions
    }
}

fn column(fx: &Fixture, table: TableId, name: &str) -> ColumnId {
    fx.schema.column(table, name).expect("fixture column")
}

fn shapes(nodes: &[Arc<IndexIntersection<'_, Cond>>]) -> Vec<String> {
    nodes.iter().map(ToString::to_string).collect()
}

fn cid_equivalences(fx: &Fixture) -> EquivalenceFinder<ColumnId> {
    let mut equivalences = EquivalenceFinder::new();
    let customer_cid = column(fx, fx.customer, "cid");
    equivalences.mark_equivalent(column(fx, fx.order, "cid"), customer_cid);
    equivalences.mark_equivalent(column(fx, fx.address, "cid"), customer_cid);
    equivalences
}

type DefaultEnumerator<'s> =
    MultiIndexEnumerator<'s, Cond, Branch, IndexIntersectionBuilder>;

///
/// CANDIDATES
///

#[test]
fn candidate_pegs_only_a_leading_prefix() {
    let fx = fixture();
    let index = fx.schema.index(fx.order_placed).expect("order_placed");
    let mut conditions = HashMap::new();
    conditions.insert(column(&fx, fx.order, "oid"), Cond("oid"));

    let candidate = MultiIndexCandidate::from_conditions(index, &conditions);
    assert!(!candidate.any_pegged());
    assert_eq!(candidate.next_free_column(), Some(column(&fx, fx.order, "placed")));

    conditions.insert(column(&fx, fx.order, "placed"), Cond("placed"));
    let candidate = MultiIndexCandidate::from_conditions(index, &conditions);
    assert_eq!(candidate.pegged(), &[Cond("placed")]);
    assert_eq!(candidate.next_free_column(), Some(column(&fx, fx.order, "cid")));

    conditions.insert(column(&fx, fx.order, "cid"), Cond("cid"));
    let candidate = MultiIndexCandidate::from_conditions(index, &conditions);
    assert_eq!(candidate.pegged_count(), 3);
    assert_eq!(candidate.next_free_column(), None);
}

#[test]
fn equivalence_finder_is_reflexive_symmetric_and_transitive() {
    let mut finder = EquivalenceFinder::new();
    finder.mark_equivalent(1, 2);
    finder.mark_equivalent(3, 2);

    assert!(finder.are_equivalent(7, 7));
    assert!(finder.are_equivalent(2, 1));
    assert!(finder.are_equivalent(1, 3));
    assert!(!finder.are_equivalent(1, 4));
}

///
/// ENUMERATION
///

#[test]
fn parent_and_child_scans_intersect_once_on_an_equivalent_key() {
    let fx = fixture();
    let branch = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("placed", Some(column(&fx, fx.order, "placed")))
        .with("name", Some(column(&fx, fx.customer, "name")));

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&branch).expect("branch");
    assert_eq!(enumerator.leaves().len(), 2);

    let combinations = enumerator
        .get_combinations(&cid_equivalences(&fx))
        .expect("enumerate");
    assert_eq!(
        shapes(combinations),
        vec!["INTERSECT(order_placed, customer_name, compare 1)"]
    );
    assert_eq!(combinations[0].leaf_most_table(), fx.order);
    assert_eq!(combinations[0].covered_conditions().len(), 2);

    let combinations = enumerator
        .get_combinations(&EquivalenceFinder::new())
        .expect("enumerate");
    assert!(combinations.is_empty(), "order.cid and customer.cid are unrelated");
}

#[test]
fn cross_branch_scans_intersect_in_both_orders() {
    let fx = fixture();
    let orders = Branch::new(&[fx.order_placed])
        .with("placed", Some(column(&fx, fx.order, "placed")));
    let addresses = Branch::new(&[fx.address_city])
        .with("city", Some(column(&fx, fx.address, "city")));

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&orders).expect("orders");
    enumerator.add_branch(&addresses).expect("addresses");

    let combinations = enumerator
        .get_combinations(&cid_equivalences(&fx))
        .expect("enumerate");
    assert_eq!(
        shapes(combinations),
        vec![
            "INTERSECT(order_placed, address_city, compare 1)",
            "INTERSECT(address_city, order_placed, compare 1)",
        ]
    );
}

#[test]
fn cross_branch_scans_need_the_common_ancestor_key() {
    let fx = fixture();
    let orders = Branch::new(&[fx.order_placed])
        .with("placed", Some(column(&fx, fx.order, "placed")));
    let addresses = Branch::new(&[fx.address_city])
        .with("city", Some(column(&fx, fx.address, "city")));

    // Child keys agree with each other but not with the customer key.
    let mut equivalences = EquivalenceFinder::new();
    equivalences.mark_equivalent(column(&fx, fx.order, "cid"), column(&fx, fx.address, "cid"));

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&orders).expect("orders");
    enumerator.add_branch(&addresses).expect("addresses");

    let sink = CaptureSink::default();
    let count = with_metrics_sink(&sink, || {
        enumerator
            .get_combinations(&equivalences)
            .expect("enumerate")
            .len()
    });

    assert_eq!(count, 0);
    assert!(sink.events().contains(&MetricsEvent::IntersectionRejected));
}

#[test]
fn later_rounds_extend_intersections_with_remaining_scans() {
    let fx = fixture();
    let orders = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("placed", Some(column(&fx, fx.order, "placed")))
        .with("name", Some(column(&fx, fx.customer, "name")));
    let addresses = Branch::new(&[fx.address_city])
        .with("city", Some(column(&fx, fx.address, "city")));

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&orders).expect("orders");
    enumerator.add_branch(&addresses).expect("addresses");

    let sink = CaptureSink::default();
    let combinations = with_metrics_sink(&sink, || {
        enumerator
            .into_combinations(&cid_equivalences(&fx))
            .expect("enumerate")
    });

    assert_eq!(combinations.len(), 10);
    let three_way = combinations
        .iter()
        .filter(|node| node.scan_count() == 3)
        .collect::<Vec<_>>();
    assert_eq!(three_way.len(), 6);
    assert!(three_way.iter().all(|node| node.covered_conditions().len() == 3));
    assert_eq!(
        sink.events(),
        vec![MetricsEvent::Enumeration {
            leaves: 3,
            rounds: 3,
            emitted: 10,
        }]
    );
}

#[test]
fn repeated_enumeration_is_deterministic_and_duplicate_free() {
    let fx = fixture();
    let orders = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("placed", Some(column(&fx, fx.order, "placed")))
        .with("name", Some(column(&fx, fx.customer, "name")));
    let addresses = Branch::new(&[fx.address_city])
        .with("city", Some(column(&fx, fx.address, "city")));
    let equivalences = cid_equivalences(&fx);

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&orders).expect("orders");
    enumerator.add_branch(&addresses).expect("addresses");

    let first = shapes(enumerator.get_combinations(&equivalences).expect("first"));
    let second = shapes(enumerator.get_combinations(&equivalences).expect("second"));

    assert_eq!(first, second);
    let unique = first.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), first.len());
}

#[test]
fn disabled_enumeration_yields_nothing() {
    let fx = fixture();
    let branch = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("placed", Some(column(&fx, fx.order, "placed")))
        .with("name", Some(column(&fx, fx.customer, "name")));

    let mut enumerator = DefaultEnumerator::with_options(
        &fx.schema,
        IndexIntersectionBuilder,
        EnumeratorOptions { enabled: false },
    );
    enumerator.add_branch(&branch).expect("branch");

    assert_eq!(enumerator.leaves().len(), 2);
    assert!(
        enumerator
            .get_combinations(&cid_equivalences(&fx))
            .expect("enumerate")
            .is_empty()
    );
}

#[test]
fn no_seeds_means_no_combinations() {
    let fx = fixture();
    let branch = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("oid", Some(column(&fx, fx.order, "oid")));

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&branch).expect("branch");

    assert!(enumerator.leaves().is_empty());
    assert!(
        enumerator
            .get_combinations(&EquivalenceFinder::new())
            .expect("enumerate")
            .is_empty()
    );
}

#[test]
fn unknown_index_is_reported() {
    let fx = fixture();
    let orders = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("placed", Some(column(&fx, fx.order, "placed")))
        .with("name", Some(column(&fx, fx.customer, "name")));
    let broken = Branch::new(&[fx.address_city, IndexId(99)])
        .with("opaque", None)
        .with("city", Some(column(&fx, fx.address, "city")));

    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    enumerator.add_branch(&orders).expect("orders");
    let before = shapes(enumerator.leaves());

    let sink = CaptureSink::default();
    let err = with_metrics_sink(&sink, || enumerator.add_branch(&broken))
        .expect_err("index 99 does not exist");
    assert_eq!(err.class, ErrorClass::NotFound);
    assert!(sink.events().is_empty(), "nothing of the broken branch was ingested");
    assert_eq!(shapes(enumerator.leaves()), before);

    let combinations = shapes(
        enumerator
            .get_combinations(&cid_equivalences(&fx))
            .expect("enumerate"),
    );
    assert_eq!(
        combinations,
        vec!["INTERSECT(order_placed, customer_name, compare 1)"]
    );
}

///
/// BRANCH INGESTION
///

#[test]
fn unmapped_conditions_are_skipped_and_reported() {
    let fx = fixture();
    let branch = Branch::new(&[fx.order_placed])
        .with("opaque", None)
        .with("placed", Some(column(&fx, fx.order, "placed")));

    let sink = CaptureSink::default();
    let mut enumerator = DefaultEnumerator::new(&fx.schema, IndexIntersectionBuilder);
    with_metrics_sink(&sink, || enumerator.add_branch(&branch).expect("branch"));

    assert_eq!(enumerator.leaves().len(), 1);
    assert_eq!(sink.events(), vec![MetricsEvent::UnmappedCondition]);
}

#[test]
fn duplicate_column_conditions_reach_the_hook_and_last_wins() {
    let fx = fixture();
    let placed = column(&fx, fx.order, "placed");
    let branch = Branch::new(&[fx.order_placed])
        .with("placed > 1", Some(placed))
        .with("placed < 9", Some(placed));

    let sink = CaptureSink::default();
    let mut enumerator = MultiIndexEnumerator::new(&fx.schema, DeclaredColumnBuilder::default());
    with_metrics_sink(&sink, || enumerator.add_branch(&branch).expect("branch"));

    assert_eq!(
        enumerator.builder().duplicates,
        vec![(placed, Cond("placed > 1"), Cond("placed < 9"))]
    );
    assert_eq!(sink.events(), vec![MetricsEvent::DuplicateCondition]);
    assert_eq!(
        enumerator.leaves()[0].covered_conditions(),
        &[Cond("placed < 9")]
    );
}

///
/// DECLARED-COLUMN NODES
///
/// Nodes that expose only the declared key columns, so shared trailing
/// columns come solely from what the indexes declare.
///

#[derive(Debug)]
struct DeclaredNode {
    label: String,
    table: TableId,
    columns: Vec<ColumnId>,
    pegged: usize,
    covered: Vec<Cond>,
}

impl IntersectionNode<Cond> for DeclaredNode {
    fn leaf_most_table(&self) -> TableId {
        self.table
    }

    fn all_columns(&self) -> &[ColumnId] {
        &self.columns
    }

    fn pegged_count(&self) -> usize {
        self.pegged
    }

    fn covered_conditions(&self) -> &[Cond] {
        &self.covered
    }
}

#[derive(Default)]
struct DeclaredColumnBuilder {
    duplicates: Vec<(ColumnId, Cond, Cond)>,
}

impl<'s> NodeBuilder<'s, Cond, Branch> for DeclaredColumnBuilder {
    type Node = DeclaredNode;

    fn build_leaf(&mut self, candidate: MultiIndexCandidate<'s, Cond>, _branch: &Branch) -> DeclaredNode {
        let index: &IndexModel = candidate.index();
        DeclaredNode {
            label: index.name().to_string(),
            table: candidate.leaf_most_table(),
            columns: index.key_columns().to_vec(),
            pegged: candidate.pegged_count(),
            covered: candidate.pegged().to_vec(),
        }
    }

    fn intersect(&mut self, output: &DeclaredNode, selector: &DeclaredNode, n: usize) -> DeclaredNode {
        let mut covered = output.covered.clone();
        for condition in &selector.covered {
            if !covered.contains(condition) {
                covered.push(*condition);
            }
        }

        DeclaredNode {
            label: format!("({} & {} / {n})", output.label, selector.label),
            table: output.table,
            columns: output.columns.clone(),
            pegged: output.pegged,
            covered,
        }
    }

    fn handle_duplicate_condition(&mut self, column: ColumnId, previous: &Cond, current: &Cond) {
        self.duplicates.push((column, *previous, *current));
    }
}

fn labels(nodes: &[DeclaredNode]) -> Vec<&str> {
    nodes.iter().map(|node| node.label.as_str()).collect()
}

#[test]
fn fully_pegged_declared_columns_leave_nothing_to_align() {
    let fx = fixture();
    let branch = Branch::new(&[fx.order_placed, fx.customer_name])
        .with("placed", Some(column(&fx, fx.order, "placed")))
        .with("name", Some(column(&fx, fx.customer, "name")));

    let mut enumerator = MultiIndexEnumerator::new(&fx.schema, DeclaredColumnBuilder::default());
    enumerator.add_branch(&branch).expect("branch");
    assert_eq!(enumerator.leaves().len(), 2);

    let combinations = enumerator
        .get_combinations(&cid_equivalences(&fx))
        .expect("enumerate");
    assert!(combinations.is_empty());
}

#[test]
fn same_table_scans_align_on_a_shared_declared_key() {
    let mut builder = SchemaBuilder::new();
    let place = builder
        .add_table(
            TableDef::new("place", 1)
                .column("id")
                .column("lat")
                .column("lon")
                .primary_key(["id"]),
        )
        .expect("place");
    let by_lat = builder
        .add_index(IndexDef::table("by_lat", place).column("lat").column("id"))
        .expect("by_lat");
    let by_lon = builder
        .add_index(IndexDef::table("by_lon", place).column("lon").column("id"))
        .expect("by_lon");
    let schema = builder.build();

    let branch = Branch::new(&[by_lat, by_lon])
        .with("lat", Some(schema.column(place, "lat").expect("lat")))
        .with("lon", Some(schema.column(place, "lon").expect("lon")));

    let mut enumerator = MultiIndexEnumerator::new(&schema, DeclaredColumnBuilder::default());
    enumerator.add_branch(&branch).expect("branch");
    let combinations = enumerator
        .get_combinations(&EquivalenceFinder::new())
        .expect("enumerate");

    assert_eq!(
        labels(combinations),
        vec!["(by_lat & by_lon / 1)", "(by_lon & by_lat / 1)"]
    );
}

///
/// CaptureSink
///

#[derive(Default)]
struct CaptureSink(RefCell<Vec<MetricsEvent>>);

impl CaptureSink {
    fn events(&self) -> Vec<MetricsEvent> {
        self.0.borrow().clone()
    }
}

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.0.borrow_mut().push(event);
    }
}
