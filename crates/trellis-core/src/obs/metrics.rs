use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for attachment traffic.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Fetch
    pub fetch_calls: u64,
    pub fetch_empty: u64,
    pub fetch_skipped: u64,
    pub bytes_streamed: u64,

    // Mutations
    pub delete_calls: u64,
    pub upload_calls: u64,
    pub bytes_uploaded: u64,
    pub commit_calls: u64,
    pub bytes_committed: u64,

    // Rejections
    pub not_found: u64,
    pub method_not_allowed: u64,
    pub payload_too_large: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub fetch_calls: u64,
    pub bytes_streamed: u64,
    pub delete_calls: u64,
    pub commit_calls: u64,
    pub bytes_committed: u64,
    pub rejections: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    f(&EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    f(&mut EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner))
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Counters since `since_ms`; absent when the window started later.
    pub counters: Option<EventState>,
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub fetch_calls: u64,
    pub delete_calls: u64,
    pub commit_calls: u64,
    pub rejections: u64,
    pub bytes_streamed: u64,
    pub bytes_committed: u64,
    pub avg_bytes_per_fetch: f64,
}

/// Build a report from the in-memory counters. With `window_start_ms`,
/// state collected before that instant is left out.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| snap.since_ms < start) {
        return EventReport::default();
    }

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(entity, c)| EntitySummary {
            entity: entity.clone(),
            fetch_calls: c.fetch_calls,
            delete_calls: c.delete_calls,
            commit_calls: c.commit_calls,
            rejections: c.rejections,
            bytes_streamed: c.bytes_streamed,
            bytes_committed: c.bytes_committed,
            avg_bytes_per_fetch: if c.fetch_calls > 0 {
                c.bytes_streamed as f64 / c.fetch_calls as f64
            } else {
                0.0
            },
        })
        .collect();

    // busiest first, name as tiebreak
    entity_counters.sort_by(|a, b| {
        let total = |s: &EntitySummary| s.fetch_calls + s.delete_calls + s.commit_calls;
        total(b)
            .cmp(&total(a))
            .then_with(|| a.entity.cmp(&b.entity))
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}
