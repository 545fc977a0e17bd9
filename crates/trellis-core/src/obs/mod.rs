//! Observability: attachment traffic counters and the sink boundary.
//!
//! Protocol code records `MetricsEvent`s through `sink::record` and never
//! touches the counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
