//! Metrics sink boundary.
//!
//! Protocol logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::{error::ErrorClass, obs::metrics};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    Fetch {
        entity: &'a str,
        bytes: u64,
    },
    FetchEmpty {
        entity: &'a str,
    },
    FetchSkipped {
        entity: &'a str,
    },
    Delete {
        entity: &'a str,
    },
    Upload {
        bytes: u64,
    },
    Commit {
        entity: &'a str,
        bytes: u64,
    },
    Rejected {
        entity: &'a str,
        class: ErrorClass,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
/// Default sink writing into the process-wide counter state.
/// Used whenever no scoped override is installed on the current thread.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::Fetch { entity, bytes } => {
                m.ops.fetch_calls = m.ops.fetch_calls.saturating_add(1);
                m.ops.bytes_streamed = m.ops.bytes_streamed.saturating_add(bytes);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.fetch_calls = entry.fetch_calls.saturating_add(1);
                entry.bytes_streamed = entry.bytes_streamed.saturating_add(bytes);
            }
            MetricsEvent::FetchEmpty { entity } => {
                m.ops.fetch_calls = m.ops.fetch_calls.saturating_add(1);
                m.ops.fetch_empty = m.ops.fetch_empty.saturating_add(1);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.fetch_calls = entry.fetch_calls.saturating_add(1);
            }
            MetricsEvent::FetchSkipped { entity } => {
                m.ops.fetch_calls = m.ops.fetch_calls.saturating_add(1);
                m.ops.fetch_skipped = m.ops.fetch_skipped.saturating_add(1);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.fetch_calls = entry.fetch_calls.saturating_add(1);
            }
            MetricsEvent::Delete { entity } => {
                m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.delete_calls = entry.delete_calls.saturating_add(1);
            }
            MetricsEvent::Upload { bytes } => {
                m.ops.upload_calls = m.ops.upload_calls.saturating_add(1);
                m.ops.bytes_uploaded = m.ops.bytes_uploaded.saturating_add(bytes);
            }
            MetricsEvent::Commit { entity, bytes } => {
                m.ops.commit_calls = m.ops.commit_calls.saturating_add(1);
                m.ops.bytes_committed = m.ops.bytes_committed.saturating_add(bytes);
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.commit_calls = entry.commit_calls.saturating_add(1);
                entry.bytes_committed = entry.bytes_committed.saturating_add(bytes);
            }
            MetricsEvent::Rejected { entity, class } => {
                match class {
                    ErrorClass::NotFound => m.ops.not_found = m.ops.not_found.saturating_add(1),
                    ErrorClass::MethodNotAllowed => {
                        m.ops.method_not_allowed = m.ops.method_not_allowed.saturating_add(1);
                    }
                    ErrorClass::PayloadTooLarge => {
                        m.ops.payload_too_large = m.ops.payload_too_large.saturating_add(1);
                    }
                    ErrorClass::Internal | ErrorClass::InvariantViolation => {}
                }
                let entry = m.entities.entry(entity.to_string()).or_default();
                entry.rejections = entry.rejections.saturating_add(1);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::since_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with `sink` receiving every event recorded on the current
/// thread. The previous sink is restored on exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| *cell.borrow_mut() = prev);
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}
