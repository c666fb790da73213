//! Metrics sink boundary.
//!
//! Codec and planner logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    IndexRowRead,
    IndexRowWrite,
    AncestorHKey,
    Enumeration {
        leaves: u64,
        rounds: u64,
        emitted: u64,
    },
    IntersectionRejected,
    DuplicateCondition,
    UnmappedCondition,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into the global counter state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| {
            let ops = &mut m.ops;
            match event {
                MetricsEvent::IndexRowRead => {
                    ops.index_row_reads = ops.index_row_reads.saturating_add(1);
                }
                MetricsEvent::IndexRowWrite => {
                    ops.index_row_writes = ops.index_row_writes.saturating_add(1);
                }
                MetricsEvent::AncestorHKey => {
                    ops.ancestor_hkeys = ops.ancestor_hkeys.saturating_add(1);
                }
                MetricsEvent::Enumeration {
                    leaves: _,
                    rounds,
                    emitted,
                } => {
                    ops.enumerations = ops.enumerations.saturating_add(1);
                    ops.enumeration_rounds = ops.enumeration_rounds.saturating_add(rounds);
                    ops.intersections_emitted = ops.intersections_emitted.saturating_add(emitted);
                }
                MetricsEvent::IntersectionRejected => {
                    ops.intersections_rejected = ops.intersections_rejected.saturating_add(1);
                }
                MetricsEvent::DuplicateCondition => {
                    ops.duplicate_conditions = ops.duplicate_conditions.saturating_add(1);
                }
                MetricsEvent::UnmappedCondition => {
                    ops.unmapped_conditions = ops.unmapped_conditions.saturating_add(1);
                }
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the current thread's counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
